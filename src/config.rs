// THEORY:
// `PipelineConfig` is the whole tunable surface of the detection core. Every
// field has a default so a YAML file only needs to mention what it changes.
// Validation happens once, in `validate`, against the real frame size; after
// that the per-frame code treats the configuration as trusted.

use crate::core_modules::reference_calibrator::{
    DEFAULT_CALIBRATION_FACTOR, DEFAULT_MIN_REFERENCE_BRIGHTNESS,
};
use crate::core_modules::region::Region;
use crate::error::ShadowError;
use serde::Deserialize;

/// One chromatic octave, C up to the next C.
pub const DEFAULT_ZONE_LABELS: [&str; 13] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B", "C2",
];

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Configuration for the `ShadowPipeline`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The strip of the frame that is split into zones. `None` derives it from the frame size.
    pub detection_region: Option<Region>,
    /// The always-unoccluded "honey pot" patch. `None` derives it from the frame size.
    pub reference_region: Option<Region>,
    /// Ordered zone labels; their count is the zone count.
    pub zone_labels: Vec<String>,
    /// Threshold = reference brightness x this factor.
    pub calibration_factor: f64,
    /// Below this reference brightness detection is suspended.
    pub min_reference_brightness: f64,
    /// Optional separate release factor (>= `calibration_factor`). Unset keeps
    /// the single-threshold behavior.
    pub release_factor: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_region: None,
            reference_region: None,
            zone_labels: DEFAULT_ZONE_LABELS.iter().map(|s| s.to_string()).collect(),
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            min_reference_brightness: DEFAULT_MIN_REFERENCE_BRIGHTNESS,
            release_factor: None,
        }
    }
}

impl PipelineConfig {
    /// A config sized for the common 640x480 webcam mode.
    pub fn webcam() -> Self {
        Self::default().for_frame(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT)
    }

    pub fn from_yaml(source: &str) -> Result<Self, ShadowError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Default reference patch: the top-left corner, a tenth of the width by a
    /// sixth of the height.
    pub fn default_reference_region(frame_width: u32, frame_height: u32) -> Region {
        Region::new(0, 0, (frame_width / 10).max(1), (frame_height / 6).max(1))
    }

    /// Default detection strip: the full width below the reference patch.
    pub fn default_detection_region(frame_width: u32, frame_height: u32) -> Region {
        let top = Self::default_reference_region(frame_width, frame_height).bottom();
        Region::new(0, top, frame_width, frame_height.saturating_sub(top))
    }

    pub fn detection_region_for(&self, frame_width: u32, frame_height: u32) -> Region {
        self.detection_region
            .unwrap_or_else(|| Self::default_detection_region(frame_width, frame_height))
    }

    pub fn reference_region_for(&self, frame_width: u32, frame_height: u32) -> Region {
        self.reference_region
            .unwrap_or_else(|| Self::default_reference_region(frame_width, frame_height))
    }

    /// Fills in unset regions for a frame of the given size.
    pub fn for_frame(mut self, frame_width: u32, frame_height: u32) -> Self {
        self.detection_region = Some(self.detection_region_for(frame_width, frame_height));
        self.reference_region = Some(self.reference_region_for(frame_width, frame_height));
        self
    }

    /// Checks every option against a frame of the given size.
    pub fn validate(&self, frame_width: u32, frame_height: u32) -> Result<(), ShadowError> {
        let detection = self.detection_region_for(frame_width, frame_height);
        let reference = self.reference_region_for(frame_width, frame_height);

        detection.validate_within("detection", frame_width, frame_height)?;
        reference.validate_within("reference", frame_width, frame_height)?;

        if self.zone_labels.is_empty() {
            return Err(ShadowError::InvalidConfig(
                "zone_labels must not be empty".to_string(),
            ));
        }
        if (detection.width as usize) < self.zone_labels.len() {
            return Err(ShadowError::InvalidRegion {
                name: "detection",
                region: detection.to_string(),
                reason: format!(
                    "too narrow for {} zones of at least one pixel",
                    self.zone_labels.len()
                ),
            });
        }
        if !(self.calibration_factor.is_finite() && self.calibration_factor > 0.0) {
            return Err(ShadowError::InvalidConfig(format!(
                "calibration_factor must be positive, got {}",
                self.calibration_factor
            )));
        }
        if !(self.min_reference_brightness.is_finite() && self.min_reference_brightness >= 0.0) {
            return Err(ShadowError::InvalidConfig(format!(
                "min_reference_brightness must be non-negative, got {}",
                self.min_reference_brightness
            )));
        }
        if let Some(release) = self.release_factor {
            if !release.is_finite() || release < self.calibration_factor {
                return Err(ShadowError::InvalidConfig(format!(
                    "release_factor {release} must be >= calibration_factor {}",
                    self.calibration_factor
                )));
            }
        }
        Ok(())
    }
}
