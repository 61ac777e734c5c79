use image::GrayImage;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
};
use shadow_keys::core_modules::frame_annotator::{OverlayColor, OverlayPrimitive, Renderer};
use shadow_keys::core_modules::utils::image_helper::SnapshotRenderer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

const WINDOW_NAME: &str = "Shadow Detection";
const QUIT_KEY: i32 = 'q' as i32;

fn scalar(color: OverlayColor) -> Scalar {
    let [r, g, b] = color.rgb();
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

/// The operator window: grayscale feed plus the zone overlay. Pressing `q`
/// raises the shared stop flag.
pub struct OpenCvWindow {
    stop: Arc<AtomicBool>,
}

impl OpenCvWindow {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    fn show(&mut self, frame: &GrayImage, overlay: &[OverlayPrimitive]) -> opencv::Result<()> {
        let gray = Mat::from_slice(frame.as_raw())?;
        let gray = gray.reshape(1, frame.height() as i32)?;
        let mut canvas = Mat::default();
        imgproc::cvt_color(&gray, &mut canvas, imgproc::COLOR_GRAY2BGR, 0)?;

        for primitive in overlay {
            match primitive {
                OverlayPrimitive::Rectangle { region, color } => {
                    let rect = Rect::new(
                        region.x as i32,
                        region.y as i32,
                        region.width as i32,
                        region.height as i32,
                    );
                    imgproc::rectangle(&mut canvas, rect, scalar(*color), 2, imgproc::LINE_8, 0)?;
                }
                OverlayPrimitive::Label { text, x, y, color } => {
                    imgproc::put_text(
                        &mut canvas,
                        text,
                        Point::new(*x as i32, *y as i32),
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.5,
                        scalar(*color),
                        1,
                        imgproc::LINE_AA,
                        false,
                    )?;
                }
                OverlayPrimitive::Status { text, color } => {
                    let origin = Point::new(10, canvas.rows() - 10);
                    imgproc::put_text(
                        &mut canvas,
                        text,
                        origin,
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.6,
                        scalar(*color),
                        1,
                        imgproc::LINE_AA,
                        false,
                    )?;
                }
            }
        }

        highgui::imshow(WINDOW_NAME, &canvas)?;
        if highgui::wait_key(1)? & 0xFF == QUIT_KEY {
            self.stop.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn close(&self) {
        if let Err(err) = highgui::destroy_all_windows() {
            warn!(error = %err, "Failed to close the display window");
        }
    }
}

impl Renderer for OpenCvWindow {
    fn draw_overlay(&mut self, frame: &GrayImage, overlay: &[OverlayPrimitive]) {
        if let Err(err) = self.show(frame, overlay) {
            warn!(error = %err, "Failed to render frame");
        }
    }
}

/// Either the live window or the headless PNG snapshot.
pub enum Display {
    Window(OpenCvWindow),
    Snapshot(SnapshotRenderer),
}

impl Display {
    pub fn finish(self) {
        match self {
            Display::Window(window) => window.close(),
            Display::Snapshot(snapshot) => {
                if let Err(err) = snapshot.flush() {
                    warn!(error = %err, "Failed to write overlay snapshot");
                }
            }
        }
    }
}

impl Renderer for Display {
    fn draw_overlay(&mut self, frame: &GrayImage, overlay: &[OverlayPrimitive]) {
        match self {
            Display::Window(window) => window.draw_overlay(frame, overlay),
            Display::Snapshot(snapshot) => snapshot.draw_overlay(frame, overlay),
        }
    }
}
