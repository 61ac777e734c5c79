// THEORY:
// This file is the main entry point for the `shadow_keys` library crate.
// It exposes the `ShadowPipeline` facade and its configuration/report types as
// the high-level interface of the shadow keyboard. Everything that decides
// whether a zone is pressed lives in `core_modules`; the I/O around it (camera,
// serial port, speakers, window) is supplied by the caller through the
// `FrameSource`, `OutputSink` and `Renderer` traits.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{ShadowError, SinkError};
pub use pipeline::{FrameReport, FrameSource, RunSummary, ShadowPipeline};
