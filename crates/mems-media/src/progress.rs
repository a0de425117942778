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

//! Monotonic progress reporting
//!
//! A [`Progress`] is the only streaming surface of the pipeline. Callers hand
//! in a callback receiving integer percentages; the reporter guarantees the
//! callback sees strictly increasing values in `[0, 100]` and that 100 is
//! delivered at most once. Nested stages report against a sub-range created
//! with [`Progress::span`], so the image compressor can run inside the frame
//! extractor without knowing it.

use std::fmt;
use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

/// Callback invoked with a percentage in `[0, 100]`
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

struct Shared {
    callback: Option<ProgressCallback>,
    // -1 until the first report
    last: AtomicI16,
}

/// Progress reporter over a global `[lo, hi]` window
#[derive(Clone)]
pub struct Progress {
    shared: Arc<Shared>,
    lo: f32,
    hi: f32,
}

impl Progress {
    /// Reporter forwarding to `callback`
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self::from_callback(Some(Arc::new(callback)))
    }

    /// Reporter from an optional shared callback
    pub fn from_callback(callback: Option<ProgressCallback>) -> Self {
        Progress {
            shared: Arc::new(Shared {
                callback,
                last: AtomicI16::new(-1),
            }),
            lo: 0.0,
            hi: 100.0,
        }
    }

    /// Reporter that discards everything
    pub fn silent() -> Self {
        Self::from_callback(None)
    }

    /// Report `percent` of this reporter's window
    pub fn report(&self, percent: f32) {
        let local = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let global = self.lo + (self.hi - self.lo) * local / 100.0;
        self.emit(global.floor() as i16);
    }

    /// Report the end of this reporter's window
    pub fn complete(&self) {
        self.report(100.0);
    }

    /// Report global completion regardless of window
    pub fn finish(&self) {
        self.emit(100);
    }

    /// Sub-reporter mapping its `[0, 100]` onto `[lo, hi]` of this window
    pub fn span(&self, lo: f32, hi: f32) -> Progress {
        let lo = lo.clamp(0.0, 100.0);
        let hi = hi.clamp(lo, 100.0);
        let width = self.hi - self.lo;
        Progress {
            shared: Arc::clone(&self.shared),
            lo: self.lo + width * lo / 100.0,
            hi: self.lo + width * hi / 100.0,
        }
    }

    /// Last value delivered to the callback, if any
    pub fn last(&self) -> Option<u8> {
        u8::try_from(self.shared.last.load(Ordering::Acquire)).ok()
    }

    /// Whether 100 has been delivered
    pub fn is_finished(&self) -> bool {
        self.last() == Some(100)
    }

    fn emit(&self, value: i16) {
        let value = value.clamp(0, 100);
        let previous = self.shared.last.fetch_max(value, Ordering::AcqRel);
        if value > previous {
            if let Some(callback) = &self.shared.callback {
                callback(value as u8);
            }
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::silent()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .field("last", &self.last())
            .finish()
    }
}
