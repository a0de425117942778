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

//! Configuration for mems
//!
//! One document configures the whole stack: the public site URL used in
//! join links, client-side compression budgets and tiers, the transcoder
//! binaries, server-side upload limits and logging.
//!
//! # Features
//!
//! - TOML, YAML and JSON, detected from the file extension
//! - Every section defaults, so an empty file is a valid configuration
//! - Environment variable overrides with the `MEMS_` prefix
//! - Validation of budgets, tier ordering and the server upload cap
//!
//! # Example
//!
//! ```no_run
//! use mems_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("mems.toml").await?;
//!
//!     println!("Join links point at: {}", config.app.site_url);
//!     println!("Image budget: {} bytes", config.compression.image.max_bytes);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::{Validator, LOG_FORMATS, LOG_LEVELS};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = Config::default();
        assert_eq!(config.compression.image.max_bytes, 1024 * 1024);
        assert_eq!(config.compression.video.max_bytes, 1024 * 1024);
        assert_eq!(config.uploads.max_file_bytes, 1024 * 1024);
        assert_eq!(config.uploads.quota, mems_session::MediaQuota::PerMem { max: 50 });
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("localhost:3000"));
        assert!(json.contains("per_mem"));
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
