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

//! Logging configuration: output format, level filter and destination.

use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during logging configuration
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable output
    #[default]
    Pretty,

    /// Compact single-line format
    Compact,

    /// JSON format for machine-readable logs
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(format!(
                "{s}. Expected one of: pretty, compact, json"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        })
    }
}

/// Log output destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOutput {
    /// Write to standard error
    #[default]
    Stderr,

    /// Write to standard output
    Stdout,
}

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format for logs
    pub format: LogFormat,

    /// Filter directive such as `info` or `mems_media=debug`; falls back to
    /// `RUST_LOG`, then `info`
    pub level: Option<String>,

    /// ANSI colours (pretty and compact only)
    pub use_color: bool,

    /// Whether to include timestamps in output
    pub use_timestamps: bool,

    /// Whether to include target module names
    pub include_targets: bool,

    /// Output destination
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Pretty,
            level: None,
            use_color: true,
            use_timestamps: true,
            include_targets: true,
            output: LogOutput::Stderr,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable target module names
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }

    /// Set the output destination
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Level from config, then `RUST_LOG`, then `info`
    pub fn effective_level(&self) -> String {
        self.resolve_level(std::env::var("RUST_LOG").ok())
    }

    fn resolve_level(&self, rust_log: Option<String>) -> String {
        self.level
            .clone()
            .or(rust_log)
            .unwrap_or_else(|| "info".to_string())
    }
}
