// THEORY:
// The `Region` is the spatial vocabulary of the engine: a plain axis-aligned
// rectangle in pixel coordinates. Both the detection strip and the reference
// ("honey pot") patch are regions, and so is every zone cell once the detection
// strip has been split.
//
// Regions are validated exactly once, when the pipeline is built. After that
// every sampling operation may assume a non-empty rectangle that lies fully
// inside the frame, which keeps the per-frame math total.

use crate::error::ShadowError;
use serde::Deserialize;
use std::fmt;

/// An axis-aligned rectangle in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Region {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks that the region is non-empty and fully inside a frame of the given size.
    pub fn validate_within(
        &self,
        name: &'static str,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<(), ShadowError> {
        let reason = if self.is_empty() {
            Some("region is empty".to_string())
        } else if self.x.checked_add(self.width).is_none_or(|r| r > frame_width)
            || self.y.checked_add(self.height).is_none_or(|b| b > frame_height)
        {
            Some(format!("exceeds frame bounds {frame_width}x{frame_height}"))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ShadowError::InvalidRegion {
                name,
                region: self.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Splits the region into `count` equal-width vertical cells, left to right.
    ///
    /// The cell width is `width / count` (integer division). Remainder columns at
    /// the right edge belong to no cell.
    pub fn split_columns(&self, count: usize) -> Vec<Region> {
        if count == 0 {
            return Vec::new();
        }
        let cell_width = self.width / count as u32;
        (0..count as u32)
            .map(|j| Region::new(self.x + j * cell_width, self.y, cell_width, self.height))
            .collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}
