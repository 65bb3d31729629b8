//! Artifact rendering helpers shared by the detectors

use crate::error::DetectorError;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

/// PNG-encode an image for a `DetectorResult` artifact
pub fn encode_png(image: DynamicImage) -> Result<Vec<u8>, DetectorError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

/// Min-max normalize `values` into an 8-bit grayscale image
///
/// A constant field maps to all zeros.
pub fn normalize_to_gray(values: &[f32], width: u32, height: u32) -> Result<GrayImage, DetectorError> {
    if values.len() != (width as usize) * (height as usize) {
        return Err(DetectorError::compute(format!(
            "field has {} values, expected {}x{}",
            values.len(),
            width,
            height
        )));
    }

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let pixels: Vec<u8> = if range > 0.0 && range.is_finite() {
        values
            .iter()
            .map(|&v| (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    } else {
        vec![0; values.len()]
    };

    GrayImage::from_raw(width, height, pixels)
        .ok_or_else(|| DetectorError::compute("failed to build grayscale artifact"))
}

/// JET colormap (blue → cyan → yellow → red) for an intensity in [0, 1]
pub fn jet(intensity: f32) -> Rgb<u8> {
    let v = intensity.clamp(0.0, 1.0);
    let channel = |offset: f32| ((1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Alpha-blend `overlay` onto `base`: `base * (1 - alpha) + overlay * alpha`
pub fn blend(base: &RgbImage, overlay: &RgbImage, alpha: f64) -> Result<RgbImage, DetectorError> {
    if base.dimensions() != overlay.dimensions() {
        return Err(DetectorError::compute(format!(
            "overlay {:?} does not match image {:?}",
            overlay.dimensions(),
            base.dimensions()
        )));
    }

    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = RgbImage::new(base.width(), base.height());
    for (dst, (b, o)) in out.pixels_mut().zip(base.pixels().zip(overlay.pixels())) {
        for c in 0..3 {
            let value = b[c] as f64 * (1.0 - alpha) + o[c] as f64 * alpha;
            dst[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spans_full_range() {
        let gray = normalize_to_gray(&[-2.0, 0.0, 2.0, 1.0], 2, 2).unwrap();
        assert_eq!(gray.as_raw(), &vec![0, 128, 255, 191]);
    }

    #[test]
    fn test_normalize_constant_field_is_black() {
        let gray = normalize_to_gray(&[3.0; 6], 3, 2).unwrap();
        assert!(gray.as_raw().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_normalize_rejects_wrong_length() {
        assert!(normalize_to_gray(&[1.0, 2.0], 2, 2).is_err());
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0.0), Rgb([0, 0, 128]));
        assert_eq!(jet(1.0), Rgb([128, 0, 0]));
        assert_eq!(jet(0.5), Rgb([128, 255, 128]));
    }

    #[test]
    fn test_blend_ratio() {
        let base = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        let overlay = RgbImage::from_pixel(2, 2, Rgb([200, 0, 50]));
        let out = blend(&base, &overlay, 0.4).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([140, 60, 80]));
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = encode_png(DynamicImage::ImageLuma8(GrayImage::new(3, 3))).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
