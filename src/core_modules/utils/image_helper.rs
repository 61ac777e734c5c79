use crate::core_modules::frame_annotator::{OverlayPrimitive, Renderer};
use crate::core_modules::region::Region;
use image::{DynamicImage, GrayImage, ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const OUTLINE: u32 = 2;
const MARKER: u32 = 6;

pub fn save(path: &Path, image: &RgbImage) -> Result<(), image::error::ImageError> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);

    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}

/// Rasterises overlay primitives onto an RGB copy of the grayscale frame.
///
/// There is no font rasteriser here: labels become a small filled marker at
/// their anchor and the status line a bar in the top-left corner.
pub fn render_overlay(frame: &GrayImage, overlay: &[OverlayPrimitive]) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(frame.clone()).to_rgb8();

    for primitive in overlay {
        match primitive {
            OverlayPrimitive::Rectangle { region, color } => {
                outline(&mut canvas, region, Rgb(color.rgb()));
            }
            OverlayPrimitive::Label { x, y, color, .. } => {
                fill(&mut canvas, &Region::new(*x, *y, MARKER, MARKER), Rgb(color.rgb()));
            }
            OverlayPrimitive::Status { color, .. } => {
                fill(&mut canvas, &Region::new(0, 0, MARKER * 4, MARKER), Rgb(color.rgb()));
            }
        }
    }

    canvas
}

fn fill(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let x1 = region.right().min(canvas.width());
    let y1 = region.bottom().min(canvas.height());
    for y in region.y..y1 {
        for x in region.x..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn outline(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let t = OUTLINE.min(region.width).min(region.height);
    let (x, y, w, h) = (region.x, region.y, region.width, region.height);
    fill(canvas, &Region::new(x, y, w, t), color);
    fill(canvas, &Region::new(x, y + h - t, w, t), color);
    fill(canvas, &Region::new(x, y, t, h), color);
    fill(canvas, &Region::new(x + w - t, y, t, h), color);
}

/// A headless `Renderer` that keeps the latest annotated frame and writes it
/// to disk on request.
pub struct SnapshotRenderer {
    path: PathBuf,
    latest: Option<RgbImage>,
}

impl SnapshotRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            latest: None,
        }
    }

    pub fn latest(&self) -> Option<&RgbImage> {
        self.latest.as_ref()
    }

    /// Saves the most recent frame. Returns `Ok(false)` if nothing was rendered yet.
    pub fn flush(&self) -> Result<bool, image::error::ImageError> {
        match &self.latest {
            Some(image) => {
                save(&self.path, image)?;
                info!(path = %self.path.display(), "Saved overlay snapshot");
                Ok(true)
            }
            None => {
                warn!("No frame was rendered; snapshot not written");
                Ok(false)
            }
        }
    }
}

impl Renderer for SnapshotRenderer {
    fn draw_overlay(&mut self, frame: &GrayImage, overlay: &[OverlayPrimitive]) {
        self.latest = Some(render_overlay(frame, overlay));
    }
}
