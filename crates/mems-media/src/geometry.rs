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

//! Longest-edge scaling

/// Scale `(width, height)` so the longest edge is at most `max_edge`
///
/// Aspect ratio is preserved and images are never upscaled.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    let ratio = f64::min(
        max_edge as f64 / width as f64,
        max_edge as f64 / height as f64,
    );
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).clamp(1, max_edge);
    (scale(width), scale(height))
}

/// Like [`fit_within`] but rounded down to even dimensions for video encoders
pub fn fit_within_even(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let (w, h) = fit_within(width, height, max_edge);
    let even = |v: u32| if v >= 2 { v & !1 } else { v };
    (even(w), even(h))
}
