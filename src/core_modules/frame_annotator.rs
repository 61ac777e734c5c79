// THEORY:
// The `FrameAnnotator` produces the operator's view of what the engine decided:
// a rectangle and a label per zone, the reference patch, and a status line.
// It emits backend-neutral primitives; an OpenCV window or the PNG snapshot
// helper turns them into pixels.
//
// It only ever reads a snapshot of the zone states taken after the state
// machine has run for the frame. Nothing here can change a zone.

use crate::core_modules::reference_calibrator::Calibration;
use crate::core_modules::region::Region;
use crate::core_modules::zone::ZoneTable;
use crate::core_modules::zone_state_machine::ZoneState;
use image::GrayImage;

/// Semantic color of an overlay element; renderers pick the actual color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColor {
    Active,
    Inactive,
    /// Detection suspended because the reference region is too dark.
    Degenerate,
    Reference,
}

impl OverlayColor {
    /// RGB triple used by the bundled renderers.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            OverlayColor::Active => [0, 220, 0],
            OverlayColor::Inactive => [255, 0, 0],
            OverlayColor::Degenerate => [255, 160, 0],
            OverlayColor::Reference => [0, 160, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    Rectangle { region: Region, color: OverlayColor },
    /// Text anchored at its baseline-left point.
    Label { text: String, x: u32, y: u32, color: OverlayColor },
    Status { text: String, color: OverlayColor },
}

/// Consumes overlay snapshots for display. Nothing it returns feeds back into detection.
pub trait Renderer {
    fn draw_overlay(&mut self, frame: &GrayImage, overlay: &[OverlayPrimitive]);
}

pub struct FrameAnnotator {
    zone_cells: Vec<Region>,
    reference_region: Region,
}

impl FrameAnnotator {
    pub fn new(detection_region: Region, reference_region: Region, zone_count: usize) -> Self {
        Self {
            zone_cells: detection_region.split_columns(zone_count),
            reference_region,
        }
    }

    pub fn zone_cells(&self) -> &[Region] {
        &self.zone_cells
    }

    pub fn annotate(
        &self,
        zones: &ZoneTable,
        states: &[ZoneState],
        calibration: &Calibration,
    ) -> Vec<OverlayPrimitive> {
        let mut overlay = Vec::with_capacity(zones.len() * 2 + 2);

        for ((zone, state), cell) in zones.iter().zip(states).zip(&self.zone_cells) {
            let color = if calibration.degenerate {
                OverlayColor::Degenerate
            } else if state.active {
                OverlayColor::Active
            } else {
                OverlayColor::Inactive
            };
            overlay.push(OverlayPrimitive::Rectangle {
                region: *cell,
                color,
            });
            overlay.push(OverlayPrimitive::Label {
                text: zone.label.clone(),
                x: cell.x + 10,
                y: cell.y + 30,
                color,
            });
        }

        overlay.push(OverlayPrimitive::Rectangle {
            region: self.reference_region,
            color: OverlayColor::Reference,
        });

        let status = if calibration.degenerate {
            OverlayPrimitive::Status {
                text: format!(
                    "Too dark to calibrate (reference {:.0})",
                    calibration.reference_mean
                ),
                color: OverlayColor::Degenerate,
            }
        } else {
            OverlayPrimitive::Status {
                text: format!(
                    "Reference {:.0}  threshold {:.0}",
                    calibration.reference_mean, calibration.threshold
                ),
                color: OverlayColor::Reference,
            }
        };
        overlay.push(status);

        overlay
    }
}
