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

//! Global subscriber setup.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize tracing with the specified format and optional log level.
///
/// ```ignore
/// use mems_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("debug"))?;
/// tracing::info!("compression started");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    config.level = level.map(str::to_string);
    init_tracing_with_config(config)
}

/// Initialize tracing with a detailed configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);
    let writer = get_writer(config.output);

    let installed = match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_ansi(config.use_color)
                .with_span_events(FmtSpan::CLOSE)
                .pretty();
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_ansi(config.use_color)
                .compact();
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_target(config.include_targets)
                .with_current_span(true)
                .with_span_events(FmtSpan::CLOSE);
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
    };

    installed.map_err(|e| LogError::ConfigError(e.to_string()))
}

fn get_writer(output: LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let level = config.effective_level();
    EnvFilter::try_new(&level)
        .map_err(|e| LogError::ConfigError(format!("Failed to parse log filter '{level}': {e}")))
}
