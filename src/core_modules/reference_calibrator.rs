// THEORY:
// The `ReferenceCalibrator` turns a fixed, always-unoccluded patch of the scene
// (the "honey pot") into the activation threshold for every zone. Because the
// threshold is a fraction of whatever the honey pot currently reads, a dimmer
// or brighter room moves the cutoff with it instead of relying on a magic
// brightness constant.
//
// Key principles:
// 1.  **Dynamic threshold**: `threshold = reference_mean * calibration_factor`,
//     recomputed every frame.
// 2.  **Degenerate guard**: when the honey pot itself drops below
//     `min_reference_brightness` the threshold would collapse toward zero and
//     every zone would read as shadowed. The frame is flagged degenerate and
//     detection is suspended.
// 3.  **Edge reporting**: the calibrator remembers whether the previous frame was
//     degenerate so that entering and leaving the condition are each reported
//     exactly once.

use crate::core_modules::brightness_sampler::{self, Brightness};
use crate::core_modules::region::Region;
use image::GrayImage;
use tracing::{info, warn};

pub const DEFAULT_CALIBRATION_FACTOR: f64 = 0.5;
pub const DEFAULT_MIN_REFERENCE_BRIGHTNESS: Brightness = 63.0;

/// How this frame's lighting compares to the previous frame's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingChange {
    /// Same condition as the previous frame.
    Steady,
    /// First degenerate frame after a calibratable one (or at session start).
    EnteredDegenerate,
    /// First calibratable frame after one or more degenerate frames.
    Recovered,
}

/// The calibration result for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub reference_mean: Brightness,
    /// Zones darker than this activate. Defined even when `degenerate`.
    pub threshold: Brightness,
    /// Active zones at or above this release. Equals `threshold` unless a
    /// separate release factor is configured.
    pub release_threshold: Brightness,
    pub degenerate: bool,
    pub change: LightingChange,
}

pub struct ReferenceCalibrator {
    calibration_factor: f64,
    release_factor: Option<f64>,
    min_reference_brightness: Brightness,
    /// Whether the previous evaluated frame was degenerate.
    was_degenerate: bool,
}

impl ReferenceCalibrator {
    pub fn new(
        calibration_factor: f64,
        release_factor: Option<f64>,
        min_reference_brightness: Brightness,
    ) -> Self {
        Self {
            calibration_factor,
            release_factor,
            min_reference_brightness,
            was_degenerate: false,
        }
    }

    /// Samples the reference region and derives this frame's calibration.
    pub fn evaluate(&mut self, frame: &GrayImage, reference_region: &Region) -> Calibration {
        let reference_mean = brightness_sampler::sample(frame, reference_region);
        self.calibrate(reference_mean)
    }

    /// Derives the calibration from an already-sampled reference mean.
    pub fn calibrate(&mut self, reference_mean: Brightness) -> Calibration {
        let degenerate = reference_mean < self.min_reference_brightness;
        let threshold = reference_mean * self.calibration_factor;
        let release_threshold = self
            .release_factor
            .map_or(threshold, |factor| reference_mean * factor);

        let change = match (self.was_degenerate, degenerate) {
            (false, true) => {
                warn!(
                    reference_mean,
                    minimum = self.min_reference_brightness,
                    "Reference region too dark to calibrate; zone detection suspended"
                );
                LightingChange::EnteredDegenerate
            }
            (true, false) => {
                info!(reference_mean, "Reference lighting recovered; zone detection resumed");
                LightingChange::Recovered
            }
            _ => LightingChange::Steady,
        };
        self.was_degenerate = degenerate;

        Calibration {
            reference_mean,
            threshold,
            release_threshold,
            degenerate,
            change,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.was_degenerate
    }
}

impl Default for ReferenceCalibrator {
    fn default() -> Self {
        Self::new(
            DEFAULT_CALIBRATION_FACTOR,
            None,
            DEFAULT_MIN_REFERENCE_BRIGHTNESS,
        )
    }
}
