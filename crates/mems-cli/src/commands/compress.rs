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
use crate::progress::ProgressTracker;
use anyhow::{bail, Context, Result};
use clap::Parser;
use mems_media::{MediaFile, Progress};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compress one image or video to its byte budget
#[derive(Parser, Debug)]
pub struct CompressCmd {
    /// File to compress
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Where to write the result [default: <stem>-compressed.<ext> next to FILE]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Byte budget instead of the configured one for the file's kind
    #[arg(long, value_name = "BYTES")]
    pub max_bytes: Option<u64>,

    /// MIME type instead of the one guessed from the extension
    #[arg(long, value_name = "TYPE")]
    pub mime: Option<String>,
}

/// `dir/stem-compressed.ext`, keeping the output's extension
fn default_output(input: &Path, output: &MediaFile) -> PathBuf {
    let file_name = match output.name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-compressed.{ext}"),
        _ => format!("{}-compressed", output.name),
    };
    input.parent().unwrap_or_else(|| Path::new(".")).join(file_name)
}

/// Whether `output` resolves to the same file as `input`
async fn is_same_file(output: &Path, input: &Path) -> bool {
    if output == input {
        return true;
    }
    match (tokio::fs::canonicalize(output).await, tokio::fs::canonicalize(input).await) {
        (Ok(output), Ok(input)) => output == input,
        _ => false,
    }
}

impl CompressCmd {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let mut file = MediaFile::read(&self.input)
            .await
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        if let Some(mime) = &self.mime {
            file.mime = mime.clone();
        }
        debug!(name = %file.name, mime = %file.mime, size = file.len(), "compressing");

        let compressor = ctx.compressor();
        let budget = match (self.max_bytes, file.kind()) {
            (Some(max), _) => Some(max),
            (None, Some(kind)) => Some(compressor.budget_for(kind)?.bytes()),
            (None, None) => None,
        };

        let tracker = ProgressTracker::new(ctx.quiet);
        let bar = tracker.percent_bar(&file.name);
        let reporter = bar.clone();
        let progress = Progress::new(move |percent| reporter.set_position(u64::from(percent)));

        let result = match self.max_bytes {
            Some(max) => compressor.compress(&file, max, &progress).await,
            None => compressor.compress_for_kind(&file, &progress).await,
        };
        bar.finish_and_clear();
        let compressed = result.with_context(|| format!("Failed to compress {}", file.name))?;

        let path = match &self.output {
            Some(path) => path.clone(),
            None => default_output(&self.input, &compressed),
        };
        if is_same_file(&path, &self.input).await {
            bail!("Refusing to overwrite the input file {}", path.display());
        }
        tokio::fs::write(&path, &compressed.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        output::success(&format!("Compressed {}", file.name));
        output::detail("Size", &output::size_change(file.len(), compressed.len()));
        output::detail("Type", &compressed.mime);
        output::detail("Output", &path.display().to_string());
        match budget {
            Some(max) if compressed.len() > max => {
                output::warning(&format!("Still over the {max} byte budget; kept the smallest attempt"))
            }
            Some(_) => {}
            None => output::info("Not an image or video; copied unchanged"),
        }
        Ok(())
    }
}
