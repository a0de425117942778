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

//! Deterministic image fixtures.
//!
//! Generated in memory so tests never depend on files on disk. Noise is
//! driven by a fixed-seed LCG so sizes are stable across runs.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

/// Smooth RGB gradient; compresses very well.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) * 255 / (width + height).max(1)) as u8;
        Rgb([r, g, b])
    })
}

/// Per-pixel pseudo-random noise; compresses badly.
pub fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let bytes = (state >> 24).to_le_bytes();
        Rgb([bytes[0], bytes[1], bytes[2]])
    })
}

/// Gradient with a varying alpha channel.
pub fn translucent(width: u32, height: u32) -> RgbaImage {
    let base = gradient(width, height);
    RgbaImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *base.get_pixel(x, y);
        Rgba([r, g, b, ((x ^ y) & 0xff) as u8])
    })
}

/// Encode as JPEG at `quality` (1..=100).
pub fn jpeg(image: RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .expect("jpeg fixture encodes");
    out
}

/// Encode as PNG.
pub fn png(image: RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .expect("png fixture encodes");
    out
}

/// Bytes that start like a JPEG and then fall apart.
pub fn corrupt_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend((0..len.saturating_sub(4)).map(|i| (i * 31 % 251) as u8));
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic() {
        assert_eq!(noise(16, 16, 7), noise(16, 16, 7));
        assert_ne!(noise(16, 16, 7), noise(16, 16, 8));
    }

    #[test]
    fn test_noise_is_bigger_than_gradient() {
        let smooth = jpeg(gradient(256, 256), 90).len();
        let rough = jpeg(noise(256, 256, 1), 90).len();
        assert!(rough > smooth * 2);
    }

    #[test]
    fn test_corrupt_bytes_do_not_decode() {
        assert!(image::load_from_memory(&corrupt_bytes(2048)).is_err());
        assert_eq!(corrupt_bytes(2048).len(), 2048);
    }
}
