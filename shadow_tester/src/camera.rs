use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use image::GrayImage;
use shadow_keys::core_modules::luma;
use shadow_keys::{FrameSource, ShadowError};
use std::path::Path;
use tracing::info;

fn capture_error(err: opencv::Error) -> ShadowError {
    ShadowError::CaptureUnavailable(err.to_string())
}

/// A live camera or a video file, read through OpenCV.
pub struct Camera {
    cap: VideoCapture,
    width: u32,
    height: u32,
    frame: Mat,
    rgba: Mat,
}

impl Camera {
    pub fn open_index(index: i32) -> Result<Self, ShadowError> {
        let cap = VideoCapture::new(index, videoio::CAP_ANY).map_err(capture_error)?;
        Self::from_capture(cap, &format!("camera {index}"))
    }

    pub fn open_file(path: &Path) -> Result<Self, ShadowError> {
        let name = path.to_string_lossy();
        let cap = VideoCapture::from_file(&name, videoio::CAP_ANY).map_err(capture_error)?;
        Self::from_capture(cap, &name)
    }

    fn from_capture(cap: VideoCapture, name: &str) -> Result<Self, ShadowError> {
        if !cap.is_opened().map_err(capture_error)? {
            return Err(ShadowError::CaptureUnavailable(format!(
                "could not open {name}"
            )));
        }
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(capture_error)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(capture_error)? as u32;
        let fps = cap.get(videoio::CAP_PROP_FPS).map_err(capture_error)?;
        info!(source = name, width, height, fps, "Video capture opened");

        Ok(Self {
            cap,
            width,
            height,
            frame: Mat::default(),
            rgba: Mat::default(),
        })
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for Camera {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, ShadowError> {
        if !self.cap.read(&mut self.frame).map_err(capture_error)? || self.frame.empty() {
            return Ok(None);
        }

        // Convert the OpenCV Mat (BGR) to an RGBA buffer for the engine.
        imgproc::cvt_color(&self.frame, &mut self.rgba, imgproc::COLOR_BGR2RGBA, 0)
            .map_err(capture_error)?;
        let bytes = self.rgba.data_bytes().map_err(capture_error)?;
        let (width, height) = (self.rgba.cols() as u32, self.rgba.rows() as u32);

        luma::gray_from_rgba(width, height, bytes).map(Some)
    }
}
