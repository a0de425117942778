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
use mems_cli::{DirectorySink, QueueObserver, UploadQueue, UploadState, DEFAULT_CONCURRENCY};
use mems_media::MediaFile;
use std::path::PathBuf;
use std::sync::Arc;

/// Compress several files concurrently into a directory
///
/// Each file succeeds or fails on its own; the command fails if any did.
#[derive(Parser, Debug)]
pub struct BatchCmd {
    /// Files to compress
    #[arg(required = true, value_name = "FILES")]
    pub inputs: Vec<PathBuf>,

    /// Directory for the compressed files
    #[arg(short, long, value_name = "DIR", default_value = "compressed")]
    pub out_dir: PathBuf,

    /// Files compressed at once
    #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Refuse more files than the configured per-mem media quota
    #[arg(long)]
    pub quota: bool,
}

impl BatchCmd {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let mut files = Vec::with_capacity(self.inputs.len());
        for path in &self.inputs {
            let file = MediaFile::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            files.push(file);
        }

        let mut queue = UploadQueue::new(ctx.config.uploads.clone()).with_concurrency(self.concurrency);
        if self.quota {
            queue = queue.with_quota(1, 0);
        }
        queue.enqueue(files)?;

        let names: Vec<String> = queue.files().iter().map(|f| f.name.clone()).collect();
        let bars = Arc::new(ProgressTracker::new(ctx.quiet).queue_observer(&names));
        let sink = DirectorySink::new(&self.out_dir);
        let compressor = ctx.compressor();
        let summary = queue
            .run(&compressor, &sink, Arc::clone(&bars) as Arc<dyn QueueObserver>)
            .await;
        bars.finish();

        for file in queue.files() {
            match (file.state, &file.result) {
                (UploadState::Success, Some(uploaded)) => {
                    output::success(&format!("{} -> {}", file.name, uploaded.location));
                    output::detail("Size", &output::size_change(file.source.len(), uploaded.bytes));
                }
                _ => output::error(&format!(
                    "{}: {}",
                    file.name,
                    file.error.as_deref().unwrap_or("not processed")
                )),
            }
        }

        // files rejected at enqueue never run, so count them from the queue
        let failed = queue.len() - summary.succeeded;
        output::header(&format!(
            "{} compressed, {failed} failed, output in {}",
            summary.succeeded,
            sink.dir().display()
        ));
        if failed > 0 {
            bail!("{failed} of {} files failed", queue.len());
        }
        Ok(())
    }
}
