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

//! Shared output formatting for CLI commands.
//!
//! Result lines go to stdout, errors to stderr. Progress bars live in
//! [`crate::progress`] and are the only thing `--quiet` hides.

use console::style;
use indicatif::HumanBytes;

/// Print a success message with green checkmark emoji.
pub fn success(msg: &str) {
    println!("{} {}", style("✅").green().bold(), msg);
}

/// Print an error message to stderr with red X emoji.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("❌").red().bold(), msg);
}

/// Print an informational message with cyan info emoji.
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ️").cyan(), msg);
}

/// Print a warning message with yellow warning emoji.
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠️").yellow(), msg);
}

/// Print a detail line with key-value formatting.
///
/// ```text
///   Original: 4.20 MiB
///   Compressed: 812.00 KiB
/// ```
pub fn detail(key: &str, value: &str) {
    println!("  {}: {}", key, style(value).cyan());
}

/// Print a header message with camera emoji.
pub fn header(msg: &str) {
    println!("{} {}", style("📸").green().bold(), msg);
}

/// `before -> after (+/-NN.N%)`
pub fn size_change(before: u64, after: u64) -> String {
    let change = if before == 0 {
        0.0
    } else {
        after as f64 / before as f64 * 100.0 - 100.0
    };
    format!("{} -> {} ({:+.1}%)", HumanBytes(before), HumanBytes(after), change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_change() {
        assert_eq!(size_change(1000, 250), "1000 B -> 250 B (-75.0%)");
        assert_eq!(size_change(100, 100), "100 B -> 100 B (+0.0%)");
        assert_eq!(size_change(100, 150), "100 B -> 150 B (+50.0%)");
        assert_eq!(size_change(0, 0), "0 B -> 0 B (+0.0%)");
    }
}
