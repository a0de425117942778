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
use crate::schema::{Config, DEFAULT_CONFIG_FILE};
use crate::validation::Validator;
use mems_session::MediaQuota;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!("Loaded {} configuration file: {}", format.name(), path.display());

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml if content.trim().is_empty() => Config::default(),
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        if self.validate {
            config.validate()?;
        }

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Resolve the configuration used by the command line
    ///
    /// An explicit path must exist. Without one, `mems.toml` in `dir` is
    /// used when present and the defaults otherwise. Environment overrides
    /// are applied last.
    pub async fn discover(&self, explicit: Option<&Path>, dir: &Path) -> ConfigResult<Config> {
        let path: Option<PathBuf> = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(dir.join(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => self.load_file(path).await?,
            None => {
                debug!("No configuration file, using defaults");
                Config::default()
            }
        };
        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Merge multiple configuration files
    pub async fn load_and_merge<P: AsRef<Path>>(&self, paths: &[P]) -> ConfigResult<Config> {
        let Some((first, rest)) = paths.split_first() else {
            return Err(ConfigError::ValidationError(
                "at least one configuration file must be provided".to_string(),
            ));
        };

        let mut merged = self.load_file(first).await?;
        for path in rest {
            let config = self.load_file(path).await?;
            merge_configs(&mut merged, &config);
        }

        if self.validate {
            merged.validate()?;
        }

        Ok(merged)
    }

    /// Apply `MEMS_*` environment variable overrides
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, |name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from(
        &self,
        config: &mut Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(value) = lookup("MEMS_SITE_URL") {
            config.app.site_url = value;
        }

        // Observability settings
        if let Some(value) = lookup("MEMS_LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Some(value) = lookup("MEMS_LOG_FORMAT") {
            config.observability.log_format = value;
        }

        // Compression settings
        if let Some(value) = lookup("MEMS_IMAGE_MAX_BYTES") {
            config.compression.image.max_bytes = parse_var("MEMS_IMAGE_MAX_BYTES", &value)?;
        }
        if let Some(value) = lookup("MEMS_VIDEO_MAX_BYTES") {
            config.compression.video.max_bytes = parse_var("MEMS_VIDEO_MAX_BYTES", &value)?;
        }
        if let Some(value) = lookup("MEMS_FFMPEG_PATH") {
            config.compression.ffmpeg.ffmpeg_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("MEMS_FFPROBE_PATH") {
            config.compression.ffmpeg.ffprobe_path = PathBuf::from(value);
        }

        // Upload limits
        if let Some(value) = lookup("MEMS_MAX_UPLOAD_BYTES") {
            config.uploads.max_file_bytes = parse_var("MEMS_MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = lookup("MEMS_MAX_MEDIA_PER_MEM") {
            config.uploads.quota = MediaQuota::PerMem {
                max: parse_var("MEMS_MAX_MEDIA_PER_MEM", &value)?,
            };
        }

        if self.validate {
            config.validate()?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge second config into first; overlay sections that differ from the
/// defaults win
fn merge_configs(base: &mut Config, overlay: &Config) {
    let defaults = Config::default();

    if overlay.app.site_url != defaults.app.site_url {
        base.app.site_url.clone_from(&overlay.app.site_url);
    }

    if overlay.compression.image != defaults.compression.image {
        base.compression.image = overlay.compression.image.clone();
    }
    if overlay.compression.video != defaults.compression.video {
        base.compression.video = overlay.compression.video.clone();
    }
    if overlay.compression.ffmpeg != defaults.compression.ffmpeg {
        base.compression.ffmpeg = overlay.compression.ffmpeg.clone();
    }

    if overlay.uploads.max_file_bytes != defaults.uploads.max_file_bytes {
        base.uploads.max_file_bytes = overlay.uploads.max_file_bytes;
    }
    if overlay.uploads.image_types != defaults.uploads.image_types {
        base.uploads.image_types.clone_from(&overlay.uploads.image_types);
    }
    if overlay.uploads.video_types != defaults.uploads.video_types {
        base.uploads.video_types.clone_from(&overlay.uploads.video_types);
    }
    if overlay.uploads.quota != defaults.uploads.quota {
        base.uploads.quota = overlay.uploads.quota;
    }
    if overlay.uploads.slot_ttl_secs != defaults.uploads.slot_ttl_secs {
        base.uploads.slot_ttl_secs = overlay.uploads.slot_ttl_secs;
    }

    if overlay.observability.log_level != defaults.observability.log_level {
        base.observability.log_level.clone_from(&overlay.observability.log_level);
    }
    if overlay.observability.log_format != defaults.observability.log_format {
        base.observability.log_format.clone_from(&overlay.observability.log_format);
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_var_parsing_error(name, value, "expected a non-negative integer"))
}
