// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! CLI command helpers for integration tests.

use assert_cmd::Command;
use std::path::Path;

/// Get a Command for the mems binary.
///
/// # Example
///
/// ```ignore
/// use mems_test_utils::mems;
///
/// mems().arg("version").assert().success();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn mems() -> Command {
    Command::cargo_bin("mems").expect("mems binary not found")
}

/// Fluent wrapper for common mems invocations.
pub struct MemsCommand {
    cmd: Command,
}

impl MemsCommand {
    /// Create a new MemsCommand with logging silenced.
    pub fn new() -> Self {
        let mut cmd = mems();
        cmd.env_remove("RUST_LOG").arg("--quiet");
        Self { cmd }
    }

    /// Set the working directory for the command.
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Add multiple arguments to the command.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Execute the command and assert success.
    pub fn run_success(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().success()
    }

    /// Execute the command and assert failure.
    pub fn run_failure(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().failure()
    }

    /// Get the underlying Command for custom assertions.
    pub fn into_inner(self) -> Command {
        self.cmd
    }
}

impl Default for MemsCommand {
    fn default() -> Self {
        Self::new()
    }
}
