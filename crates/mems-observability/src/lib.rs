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

//! Structured logging for mems
//!
//! # Features
//!
//! - **Output formats**: pretty, compact and JSON
//! - **Filtering**: explicit directive, else `RUST_LOG`, else `info`
//! - **Spans**: pipeline entry points are instrumented, so span close events
//!   carry timings
//!
//! # Example
//!
//! ```ignore
//! use mems_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Json, Some("mems_media=debug,info"))?;
//! tracing::info!("ready");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
