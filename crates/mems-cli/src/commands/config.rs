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

use super::AppContext;
use crate::output;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use mems_config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

/// Inspect or create configuration
#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Print the effective configuration as TOML
    Show,

    /// Write a default configuration file
    Init {
        /// Destination
        #[arg(value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCmd {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ConfigCmd::Show => {
                print!("{}", ctx.config.to_toml_string()?);
                Ok(())
            }
            ConfigCmd::Init { path, force } => {
                if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
                    bail!("{} already exists (use --force to replace it)", path.display());
                }
                let contents = Config::default().to_toml_string()?;
                tokio::fs::write(path, contents)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                output::success(&format!("Wrote {}", path.display()));
                Ok(())
            }
        }
    }
}
