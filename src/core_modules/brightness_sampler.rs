// THEORY:
// The `brightness_sampler` is the spatial pooling step. It reduces a rectangle
// of the grayscale frame to a single mean, which cancels out per-pixel sensor
// noise and leaves only spatially coherent changes such as a hand's shadow.
//
// Key principles:
// 1.  **Stateless**: Pure functions of (frame, region). No memory between frames.
// 2.  **Ordinal output**: `sample_zones` returns one mean per zone, left to right,
//     so index `i` of the result is zone ordinal `i`.
// 3.  **Trusts validation**: Regions were checked against the frame size when the
//     pipeline was built; sampling itself never fails.

use crate::core_modules::region::Region;
use image::GrayImage;

pub type Brightness = f64;

/// Arithmetic mean of pixel luma over `region`.
pub fn sample(frame: &GrayImage, region: &Region) -> Brightness {
    if region.is_empty() {
        return 0.0;
    }

    let stride = frame.width() as usize;
    let raw = frame.as_raw();
    let (x0, x1) = (region.x as usize, region.right() as usize);

    let sum: u64 = (region.y..region.bottom())
        .map(|row| {
            let start = row as usize * stride;
            raw[start + x0..start + x1].iter().map(|&v| v as u64).sum::<u64>()
        })
        .sum();

    sum as f64 / region.area() as f64
}

/// Splits `region` into `zone_count` equal-width columns and samples each one.
///
/// Columns come from `Region::split_columns`, so any remainder pixels at the
/// right edge are not part of any zone.
pub fn sample_zones(frame: &GrayImage, region: &Region, zone_count: usize) -> Vec<Brightness> {
    region
        .split_columns(zone_count)
        .iter()
        .map(|cell| sample(frame, cell))
        .collect()
}
