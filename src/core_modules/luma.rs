// THEORY (single-pixel brightness):
// The engine reasons only about brightness. Whatever color layout the capture
// collaborator delivers, it is reduced here to one luma byte per pixel before
// any region is sampled. Luma is the Rec. 601 weighted sum of R, G and B, the
// same weighting a camera's own grayscale conversion uses, so a shadow reads
// the same whether the frame came from a webcam or a replayed video file.
//
// Nothing in this module looks at neighbours or history; it is a pure
// per-pixel transform feeding `brightness_sampler`.

use crate::error::ShadowError;
use image::{GrayImage, Luma};

pub type Channel = u8;
pub type Luminance = f64;

/// Byte order of an interleaved color buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba,
    Rgb,
    /// OpenCV's native order.
    Bgr,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgba => 4,
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
        }
    }

    fn rgb(self, px: &[Channel]) -> (Channel, Channel, Channel) {
        match self {
            PixelLayout::Rgba | PixelLayout::Rgb => (px[0], px[1], px[2]),
            PixelLayout::Bgr => (px[2], px[1], px[0]),
        }
    }
}

/// Rec. 601 luma of one pixel on the 0..255 scale.
#[inline]
pub fn luminance(red: Channel, green: Channel, blue: Channel) -> Luminance {
    0.299_f64 * red as f64 + 0.587_f64 * green as f64 + 0.114_f64 * blue as f64
}

/// Converts an interleaved color buffer into a grayscale frame.
pub fn gray_from_interleaved(
    width: u32,
    height: u32,
    layout: PixelLayout,
    bytes: &[u8],
) -> Result<GrayImage, ShadowError> {
    let expected = width as usize * height as usize * layout.channels();
    if bytes.len() != expected {
        return Err(ShadowError::FrameShape {
            expected: format!("{expected} bytes ({width}x{height} {layout:?})"),
            actual: format!("{} bytes", bytes.len()),
        });
    }

    let luma: Vec<u8> = bytes
        .chunks_exact(layout.channels())
        .map(|px| {
            let (r, g, b) = layout.rgb(px);
            luminance(r, g, b).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    GrayImage::from_raw(width, height, luma).ok_or_else(|| ShadowError::FrameShape {
        expected: format!("{width}x{height}"),
        actual: "buffer rejected by image".to_string(),
    })
}

pub fn gray_from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<GrayImage, ShadowError> {
    gray_from_interleaved(width, height, PixelLayout::Rgba, bytes)
}

pub fn gray_from_bgr(width: u32, height: u32, bytes: &[u8]) -> Result<GrayImage, ShadowError> {
    gray_from_interleaved(width, height, PixelLayout::Bgr, bytes)
}

/// A uniformly lit frame; handy for calibration and tests.
pub fn flat_frame(width: u32, height: u32, level: Channel) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([level]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_white_and_black_map_to_the_ends_of_the_scale() {
        assert!((luminance(255, 255, 255) - 255.0).abs() < 1e-9);
        assert_eq!(luminance(0, 0, 0), 0.0);
    }

    #[test]
    fn rgba_conversion_uses_rec601_weights_and_ignores_alpha() {
        let bytes = [255, 0, 0, 17, 0, 255, 0, 200];
        let gray = gray_from_rgba(2, 1, &bytes).unwrap();
        assert_eq!(gray.get_pixel(0, 0).0[0], 76); // 0.299 * 255
        assert_eq!(gray.get_pixel(1, 0).0[0], 150); // 0.587 * 255
    }

    #[test]
    fn bgr_conversion_swaps_red_and_blue() {
        let gray = gray_from_bgr(1, 1, &[255, 0, 0]).unwrap();
        assert_eq!(gray.get_pixel(0, 0).0[0], 29); // 0.114 * 255
    }

    #[test]
    fn a_short_buffer_is_a_frame_shape_error() {
        let err = gray_from_rgba(2, 2, &[0u8; 15]).unwrap_err();
        assert!(matches!(err, ShadowError::FrameShape { .. }));
    }
}
