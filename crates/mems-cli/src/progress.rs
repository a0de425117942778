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

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use mems_cli::{QueueObserver, UploadState};
use std::sync::Arc;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.cyan} {msg:30} [{bar:40.cyan/blue}] {pos:>3}%";

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Progress bars for compression runs
///
/// Draws to stderr so stdout stays clean for piping; hidden entirely when
/// quiet.
pub struct ProgressTracker {
    multi: Arc<MultiProgress>,
    quiet: bool,
}

impl ProgressTracker {
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: Arc::new(if quiet {
                MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
            } else {
                MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
            }),
            quiet,
        }
    }

    /// A 0..=100 bar for one file
    pub fn percent_bar(&self, msg: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(100));
        pb.set_style(bar_style());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// One bar per queued file, driven by queue events
    pub fn queue_observer(&self, names: &[String]) -> QueueBars {
        QueueBars {
            bars: names.iter().map(|name| self.percent_bar(name)).collect(),
        }
    }
}

/// Bars for an [`mems_cli::UploadQueue`] run
pub struct QueueBars {
    bars: Vec<ProgressBar>,
}

impl QueueObserver for QueueBars {
    fn state_changed(&self, index: usize, state: UploadState, message: Option<&str>) {
        let Some(pb) = self.bars.get(index) else {
            return;
        };
        match state {
            UploadState::Success => pb.finish_with_message(format!("{} ✓", pb.message())),
            UploadState::Error => {
                pb.abandon_with_message(format!("{} ✗ {}", pb.message(), message.unwrap_or_default()))
            }
            UploadState::Uploading => pb.set_position(100),
            UploadState::Idle | UploadState::Compressing => {}
        }
    }

    fn progress(&self, index: usize, percent: u8) {
        if let Some(pb) = self.bars.get(index) {
            pb.set_position(u64::from(percent));
        }
    }
}

impl QueueBars {
    /// Stop bars of files that were never run
    pub fn finish(&self) {
        for pb in &self.bars {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}
