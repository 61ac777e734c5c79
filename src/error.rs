//! # Error Types
//!
//! Two families of errors exist in the engine:
//! - `ShadowError`: fatal conditions. Bad configuration is caught once at
//!   startup; a capture device that stops producing frames ends the session.
//! - `SinkError`: a single output sink failed to deliver one event. These are
//!   collected and logged by the dispatcher and never stop the pipeline.
//!
//! Degenerate lighting is not an error. It is reported per frame through
//! `reference_calibrator::LightingChange`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShadowError {
    /// The frame source cannot produce frames. Fatal; the pipeline stops.
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// A configured region is empty or falls outside the frame.
    #[error("Invalid {name} region {region}: {reason}")]
    InvalidRegion {
        name: &'static str,
        region: String,
        reason: String,
    },

    /// Any other configuration value that cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame or pixel buffer does not have the expected dimensions.
    #[error("Frame shape mismatch: expected {expected}, got {actual}")]
    FrameShape { expected: String, actual: String },

    /// The YAML configuration could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    /// The transport rejected a write (e.g. the serial cable was unplugged).
    #[error("Sink write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The audio backend could not start or stop a sample.
    #[error("Playback failed: {0}")]
    Playback(String),
}
