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

use crate::error::ConfigResult;
use mems_media::{CompressionPolicy, FfmpegConfig, ImagePolicy, VideoPolicy};
use mems_session::{SessionConfig, UploadPolicy};
use serde::{Deserialize, Serialize};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mems.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// Client-side compression budgets, tiers and engine binaries
    pub compression: CompressionConfig,

    /// Server-side upload limits
    pub uploads: UploadPolicy,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Compression policy for the media pipeline
    pub fn compression_policy(&self) -> CompressionPolicy {
        CompressionPolicy {
            image: self.compression.image.clone(),
            video: self.compression.video.clone(),
        }
    }

    /// Settings for the session service
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            site_url: self.app.site_url.clone(),
            uploads: self.uploads.clone(),
        }
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Public base URL; join links are `{site_url}/join/{code}`
    pub site_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            site_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Compression settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressionConfig {
    /// Image budget and tiers
    pub image: ImagePolicy,

    /// Video budget, tiers and still-frame fallback
    pub video: VideoPolicy,

    /// Transcoder binaries
    pub ffmpeg: FfmpegConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[compression.image]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_session_config_carries_site_and_uploads() {
        let mut config = Config::default();
        config.app.site_url = "https://mems.example".to_string();
        config.uploads.max_file_bytes = 2048;

        let session = config.session_config();
        assert_eq!(session.site_url, "https://mems.example");
        assert_eq!(session.uploads.max_file_bytes, 2048);
        assert_eq!(config.compression_policy().image, config.compression.image);
    }
}
