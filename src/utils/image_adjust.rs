//! Frame pre-adjustment: resize to the processing resolution and apply the
//! linear brightness/contrast transform.

use super::safe_cast::f64_to_u8_saturating;
use image::{imageops::FilterType, RgbImage};

/// Resize `frame` to exactly `width` x `height`.
///
/// Frames already at the target size are copied without resampling.
#[must_use]
pub fn normalize_resolution(frame: &RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    image::imageops::resize(frame, width, height, FilterType::Triangle)
}

/// Apply `out = clamp(in * contrast + brightness, 0, 255)` to every channel in place
pub fn apply_brightness_contrast(frame: &mut RgbImage, brightness: f64, contrast: f64) {
    // Neutral settings leave the frame untouched
    if brightness == 0.0 && (contrast - 1.0).abs() < f64::EPSILON {
        return;
    }

    let lut: [u8; 256] = std::array::from_fn(|v| {
        #[allow(clippy::cast_precision_loss)]
        let input = v as f64;
        f64_to_u8_saturating(input.mul_add(contrast, brightness))
    });

    for channel in frame.iter_mut() {
        *channel = lut[usize::from(*channel)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_normalize_resolution() {
        let frame = RgbImage::from_pixel(1280, 720, Rgb([10, 20, 30]));
        let resized = normalize_resolution(&frame, 640, 480);
        assert_eq!(resized.dimensions(), (640, 480));
        assert_eq!(*resized.get_pixel(320, 240), Rgb([10, 20, 30]));

        let same = normalize_resolution(&resized, 640, 480);
        assert_eq!(same, resized);
    }

    #[test]
    fn test_brightness_contrast_linear() {
        let mut frame = RgbImage::from_pixel(2, 2, Rgb([100, 0, 250]));
        apply_brightness_contrast(&mut frame, 10.0, 1.2);
        // 100*1.2+10 = 130, 0*1.2+10 = 10, 250*1.2+10 = 310 -> 255
        assert_eq!(*frame.get_pixel(0, 0), Rgb([130, 10, 255]));
    }

    #[test]
    fn test_negative_brightness_saturates_at_zero() {
        let mut frame = RgbImage::from_pixel(1, 1, Rgb([5, 50, 200]));
        apply_brightness_contrast(&mut frame, -60.0, 1.0);
        assert_eq!(*frame.get_pixel(0, 0), Rgb([0, 0, 140]));
    }

    #[test]
    fn test_neutral_settings_noop() {
        let original = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        let mut frame = original.clone();
        apply_brightness_contrast(&mut frame, 0.0, 1.0);
        assert_eq!(frame, original);
    }
}
