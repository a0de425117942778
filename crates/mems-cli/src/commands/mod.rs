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

// Command modules for the mems CLI
pub mod batch;
pub mod compress;
pub mod config;
pub mod estimate;
pub mod probe;

pub use batch::BatchCmd;
pub use compress::CompressCmd;
pub use config::ConfigCmd;
pub use estimate::EstimateCmd;
pub use probe::ProbeCmd;

use mems_config::Config;
use mems_media::MediaCompressor;

/// What every command gets from the global flags
pub struct AppContext {
    pub config: Config,
    pub quiet: bool,
}

impl AppContext {
    /// Compressor built from the configured policy and transcoder paths
    pub fn compressor(&self) -> MediaCompressor {
        MediaCompressor::with_ffmpeg(
            self.config.compression_policy(),
            self.config.compression.ffmpeg.clone(),
        )
    }
}
