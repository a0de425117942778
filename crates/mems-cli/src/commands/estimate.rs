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
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use mems_media::{estimated_compression_ratio, mime_from_extension, MediaKind};
use std::path::PathBuf;

/// Estimate compressed sizes without compressing
#[derive(Parser, Debug)]
pub struct EstimateCmd {
    /// Files to estimate
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// Expected size after compression: unchanged when within `budget`
pub(crate) fn estimate(len: u64, mime: &str, budget: Option<u64>) -> u64 {
    match budget {
        Some(max) if len > max => (len as f64 * estimated_compression_ratio(mime)).round() as u64,
        _ => len,
    }
}

impl EstimateCmd {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let policy = ctx.config.compression_policy();
        let (mut before, mut after) = (0u64, 0u64);

        for path in &self.files {
            let len = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
                .len();
            let mime = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(mime_from_extension)
                .unwrap_or("application/octet-stream");
            let budget = match MediaKind::from_mime(mime) {
                Some(kind) => Some(policy.budget_for(kind)?.bytes()),
                None => None,
            };

            let expected = estimate(len, mime, budget);
            before += len;
            after += expected;
            output::detail(&path.display().to_string(), &output::size_change(len, expected));
        }

        output::info(&format!(
            "Estimated total: {} -> {}",
            HumanBytes(before),
            HumanBytes(after)
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        assert_eq!(estimate(500, "image/png", Some(1000)), 500);
        assert_eq!(estimate(2000, "image/png", Some(1000)), 400);
        assert_eq!(estimate(1000, "video/mp4", Some(100)), 300);
        assert_eq!(estimate(2000, "application/pdf", None), 2000);
    }
}
