//! Deterministic test image generator
//!
//! Images are built from a fixed-seed xorshift generator so every run sees
//! identical bytes.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    /// Uniform in [-amplitude, amplitude]
    fn jitter(&mut self, amplitude: i32) -> i32 {
        (self.next() % (2 * amplitude as u32 + 1)) as i32 - amplitude
    }
}

/// Smooth gradient with per-pixel sensor-like noise
pub fn textured_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut rng = XorShift(seed.max(1));
    RgbImage::from_fn(width, height, |x, y| {
        let base_r = (x * 200 / width.max(1)) as i32 + 30;
        let base_g = (y * 200 / height.max(1)) as i32 + 30;
        let base_b = ((x + y) * 100 / (width + height).max(1)) as i32 + 80;
        let px = |base: i32, rng: &mut XorShift| (base + rng.jitter(20)).clamp(0, 255) as u8;
        Rgb([px(base_r, &mut rng), px(base_g, &mut rng), px(base_b, &mut rng)])
    })
}

pub fn png_bytes(img: RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .expect("encode png");
    buf
}

/// Textured PNG bytes
pub fn textured_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
    png_bytes(textured_rgb(width, height, seed))
}

/// Single-color PNG bytes
pub fn flat_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    png_bytes(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// JPEG bytes at `quality`
pub fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .expect("encode jpeg");
    buf
}
