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

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;
use mems_media::{ImagePolicy, VideoPolicy};
use mems_session::{MediaQuota, UploadPolicy};

/// Known log levels
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Known log formats
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.app.validate()?;
        self.compression.validate()?;
        self.uploads.validate()?;
        self.observability.validate()?;

        // Anything the client is allowed to produce must fit the server cap
        let cap = self.uploads.max_file_bytes;
        for (kind, budget) in [
            ("image", self.compression.image.max_bytes),
            ("video", self.compression.video.max_bytes),
        ] {
            if budget > cap {
                return Err(ConfigError::ConflictingValues(format!(
                    "compression.{kind}.max_bytes ({budget}) exceeds uploads.max_file_bytes ({cap})"
                )));
            }
        }

        Ok(())
    }
}

impl Validator for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.site_url.is_empty() {
            return Err(ConfigError::MissingRequired("app.site_url".to_string()));
        }

        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "app.site_url",
                format!("must start with http:// or https://, got {}", self.site_url),
            ));
        }

        Ok(())
    }
}

impl Validator for CompressionConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.image.validate()?;
        self.video.validate()?;

        if self.ffmpeg.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("compression.ffmpeg.ffmpeg_path".to_string()));
        }
        if self.ffmpeg.ffprobe_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("compression.ffmpeg.ffprobe_path".to_string()));
        }

        Ok(())
    }
}

impl Validator for ImagePolicy {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "compression.image.max_bytes",
                "must be greater than 0",
            ));
        }

        if self.tiers.is_empty() {
            return Err(ConfigError::MissingRequired("compression.image.tiers".to_string()));
        }

        for (i, tier) in self.tiers.iter().enumerate() {
            let field = format!("compression.image.tiers[{i}]");
            if tier.max_dimension == 0 {
                return Err(ConfigError::invalid_value(
                    format!("{field}.max_dimension"),
                    "must be greater than 0",
                ));
            }
            check_quality(&format!("{field}.quality"), tier.quality)?;
        }

        for (i, pair) in self.tiers.windows(2).enumerate() {
            if pair[1].max_dimension > pair[0].max_dimension || pair[1].quality > pair[0].quality {
                return Err(ConfigError::invalid_value(
                    format!("compression.image.tiers[{}]", i + 1),
                    "tiers must be ordered from least to most aggressive",
                ));
            }
        }

        Ok(())
    }
}

impl Validator for VideoPolicy {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "compression.video.max_bytes",
                "must be greater than 0",
            ));
        }

        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.max_dimension == 0 || tier.bitrate == 0 {
                return Err(ConfigError::invalid_value(
                    format!("compression.video.tiers[{i}]"),
                    "max_dimension and bitrate must be greater than 0",
                ));
            }
        }

        for (i, pair) in self.tiers.windows(2).enumerate() {
            if pair[1].max_dimension > pair[0].max_dimension || pair[1].bitrate > pair[0].bitrate {
                return Err(ConfigError::invalid_value(
                    format!("compression.video.tiers[{}]", i + 1),
                    "tiers must be ordered from least to most aggressive",
                ));
            }
        }

        if self.frame_rate == 0 {
            return Err(ConfigError::invalid_value(
                "compression.video.frame_rate",
                "must be greater than 0",
            ));
        }

        if self.frame_max_dimension == 0 {
            return Err(ConfigError::invalid_value(
                "compression.video.frame_max_dimension",
                "must be greater than 0",
            ));
        }

        check_quality("compression.video.frame_quality", self.frame_quality)
    }
}

impl Validator for UploadPolicy {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_file_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "uploads.max_file_bytes",
                "must be greater than 0",
            ));
        }

        if self.image_types.is_empty() && self.video_types.is_empty() {
            return Err(ConfigError::MissingRequired("uploads.image_types".to_string()));
        }

        for content_type in self.image_types.iter().chain(&self.video_types) {
            if !content_type.contains('/') {
                return Err(ConfigError::invalid_value(
                    "uploads",
                    format!("not a content type: {content_type}"),
                ));
            }
        }

        if !self.quota.is_positive() {
            let field = match self.quota {
                MediaQuota::PerMem { .. } => "uploads.quota.max",
                MediaQuota::PerParticipant { .. } => "uploads.quota.per_participant",
            };
            return Err(ConfigError::invalid_value(field, "must be greater than 0"));
        }

        if self.slot_ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "uploads.slot_ttl_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }
}

fn check_quality(field: &str, quality: f32) -> ConfigResult<()> {
    if quality > 0.0 && quality <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(
            field,
            format!("must be in (0, 1], got {quality}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mems_media::{ImageTier, VideoTier};

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_site_url() {
        let mut config = Config::default();
        config.app.site_url = "mems.example".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("app.site_url"));
    }

    #[test]
    fn test_zero_budget() {
        let mut config = Config::default();
        config.compression.video.max_bytes = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("compression.video.max_bytes"));
    }

    #[test]
    fn test_empty_image_tiers() {
        let mut config = Config::default();
        config.compression.image.tiers.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_quality_range() {
        let mut config = Config::default();
        config.compression.image.tiers[0].quality = 1.5;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("compression.image.tiers[0].quality"));

        config.compression.image.tiers[0].quality = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tier_order() {
        let mut config = Config::default();
        config.compression.image.tiers = vec![ImageTier::jpeg(800, 0.4), ImageTier::jpeg(1920, 0.8)];
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("compression.image.tiers[1]"));

        let mut config = Config::default();
        config.compression.video.tiers = vec![VideoTier::new(480, 500_000), VideoTier::new(480, 800_000)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_video_tiers_allowed() {
        let mut config = Config::default();
        config.compression.video.tiers.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_budget_over_server_cap() {
        let mut config = Config::default();
        config.uploads.max_file_bytes = 512 * 1024;
        assert!(matches!(config.validate(), Err(ConfigError::ConflictingValues(_))));
    }

    #[test]
    fn test_zero_quota() {
        let mut config = Config::default();
        config.uploads.quota = MediaQuota::PerParticipant { per_participant: 0 };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("uploads.quota.per_participant"));
    }

    #[test]
    fn test_zero_slot_ttl() {
        let mut config = Config::default();
        config.uploads.slot_ttl_secs = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("uploads.slot_ttl_secs"));
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();
        config.observability.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.observability.log_level = "DEBUG".to_string();
        config.observability.log_format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("observability.log_format"));
    }
}
