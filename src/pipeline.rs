// THEORY:
// The `pipeline` module is the top-level API of the shadow keyboard. It wires
// the stages into the single-threaded frame loop:
//
//     frame -> calibrate -> sample zones -> advance state machine -> dispatch -> render
//
// Key principles:
// 1.  **Validate once**: `ShadowPipeline::new` checks every region and option
//     against the real frame size. A bad configuration never reaches the loop.
// 2.  **Explicit ownership**: the calibrator, state machine and dispatcher are
//     fields of one pipeline value that the caller threads through the session.
//     There is no process-wide state.
// 3.  **Never stuck on**: whichever way the session ends (operator quit, end of
//     stream, capture failure) every still-active zone is released through the
//     sinks before the pipeline returns.

use crate::config::PipelineConfig;
use crate::core_modules::brightness_sampler::{self, Brightness};
use crate::core_modules::frame_annotator::FrameAnnotator;
use crate::core_modules::reference_calibrator::{LightingChange, ReferenceCalibrator};
use crate::core_modules::zone_state_machine::ZoneStateMachine;
use crate::error::ShadowError;
use image::GrayImage;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::event_dispatcher::{EventDispatcher, OutputSink, SinkFailure};
pub use crate::core_modules::frame_annotator::{OverlayColor, OverlayPrimitive, Renderer};
pub use crate::core_modules::reference_calibrator::Calibration;
pub use crate::core_modules::region::Region;
pub use crate::core_modules::zone::{Zone, ZoneId, ZoneTable};
pub use crate::core_modules::zone_state_machine::{TransitionEvent, TransitionKind, ZoneState};

/// Produces grayscale frames for the pipeline.
pub trait FrameSource {
    /// The next frame, or `None` at end of stream. An error means the source
    /// can no longer produce frames.
    fn next_frame(&mut self) -> Result<Option<GrayImage>, ShadowError>;
}

/// Everything the pipeline decided about one frame.
#[derive(Debug)]
pub struct FrameReport {
    /// 1-based frame number within the session.
    pub frame: u64,
    pub calibration: Calibration,
    /// Per-zone means in ordinal order. Empty on degenerate frames, where no
    /// zone is sampled.
    pub zone_means: Vec<Brightness>,
    pub events: Vec<TransitionEvent>,
    pub sink_failures: Vec<SinkFailure>,
}

/// Totals for a completed `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub presses: u64,
    pub releases: u64,
    pub degenerate_frames: u64,
    pub sink_failures: u64,
}

impl RunSummary {
    pub fn record_events(&mut self, events: &[TransitionEvent]) {
        for event in events {
            match event.kind {
                TransitionKind::Pressed => self.presses += 1,
                TransitionKind::Released => self.releases += 1,
            }
        }
    }

    pub fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        if report.calibration.degenerate {
            self.degenerate_frames += 1;
        }
        self.record_events(&report.events);
        self.sink_failures += report.sink_failures.len() as u64;
    }
}

pub struct ShadowPipeline {
    frame_width: u32,
    frame_height: u32,
    detection_region: Region,
    reference_region: Region,
    zones: ZoneTable,
    calibrator: ReferenceCalibrator,
    state_machine: ZoneStateMachine,
    dispatcher: EventDispatcher,
    annotator: FrameAnnotator,
}

impl ShadowPipeline {
    /// Builds a pipeline for frames of `frame_width` x `frame_height`.
    ///
    /// All configuration errors are reported here and are fatal.
    pub fn new(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
        dispatcher: EventDispatcher,
    ) -> Result<Self, ShadowError> {
        config.validate(frame_width, frame_height)?;
        let config = config.for_frame(frame_width, frame_height);
        let detection_region = config.detection_region_for(frame_width, frame_height);
        let reference_region = config.reference_region_for(frame_width, frame_height);

        let zones = ZoneTable::from_labels(&config.zone_labels)?;
        let calibrator = ReferenceCalibrator::new(
            config.calibration_factor,
            config.release_factor,
            config.min_reference_brightness,
        );

        info!(
            zones = zones.len(),
            %detection_region,
            %reference_region,
            calibration_factor = config.calibration_factor,
            min_reference_brightness = config.min_reference_brightness,
            sinks = dispatcher.sink_count(),
            "Shadow pipeline ready"
        );

        Ok(Self {
            frame_width,
            frame_height,
            detection_region,
            reference_region,
            state_machine: ZoneStateMachine::new(zones.len()),
            annotator: FrameAnnotator::new(detection_region, reference_region, zones.len()),
            zones,
            calibrator,
            dispatcher,
        })
    }

    /// Runs one frame through calibration, detection and dispatch.
    pub fn process_frame(&mut self, frame: &GrayImage) -> Result<FrameReport, ShadowError> {
        if frame.dimensions() != (self.frame_width, self.frame_height) {
            return Err(ShadowError::FrameShape {
                expected: format!("{}x{}", self.frame_width, self.frame_height),
                actual: format!("{}x{}", frame.width(), frame.height()),
            });
        }

        let calibration = self.calibrator.evaluate(frame, &self.reference_region);
        if calibration.change == LightingChange::EnteredDegenerate
            && self.state_machine.active_count() > 0
        {
            warn!(
                active = self.state_machine.active_count(),
                "Releasing active zones while lighting is degenerate"
            );
        }

        let zone_means = if calibration.degenerate {
            Vec::new()
        } else {
            brightness_sampler::sample_zones(frame, &self.detection_region, self.zones.len())
        };

        let events = self.state_machine.advance(&zone_means, &calibration);
        let sink_failures = self.dispatcher.dispatch_all(&events, &self.zones);

        let frame_number = self.state_machine.frame();
        if !events.is_empty() {
            debug!(frame = frame_number, events = events.len(), "Frame produced transitions");
        }

        Ok(FrameReport {
            frame: frame_number,
            calibration,
            zone_means,
            events,
            sink_failures,
        })
    }

    /// Overlay snapshot for the frame just processed.
    pub fn overlay(&self, report: &FrameReport) -> Vec<OverlayPrimitive> {
        self.annotator
            .annotate(&self.zones, self.state_machine.states(), &report.calibration)
    }

    /// Releases every active zone through the sinks. Safe to call more than once.
    pub fn shutdown(&mut self) -> Vec<TransitionEvent> {
        let events = self.state_machine.release_active();
        let failures = self.dispatcher.dispatch_all(&events, &self.zones);
        info!(
            released = events.len(),
            failures = failures.len(),
            "Shadow pipeline shut down"
        );
        events
    }

    /// The synchronous frame loop.
    ///
    /// `should_stop` is polled before every frame. The loop ends on a stop
    /// request, at end of stream, or on a capture error; in every case active
    /// zones are released before returning.
    pub fn run<S, R, F>(
        &mut self,
        source: &mut S,
        renderer: &mut R,
        mut should_stop: F,
    ) -> Result<RunSummary, ShadowError>
    where
        S: FrameSource + ?Sized,
        R: Renderer + ?Sized,
        F: FnMut() -> bool,
    {
        let mut summary = RunSummary::default();

        let outcome = loop {
            if should_stop() {
                info!("Stop requested");
                break Ok(());
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source reached end of stream");
                    break Ok(());
                }
                Err(err) => break Err(err),
            };

            let report = match self.process_frame(&frame) {
                Ok(report) => report,
                Err(err) => break Err(err),
            };
            summary.record(&report);

            let overlay = self.overlay(&report);
            renderer.draw_overlay(&frame, &overlay);
        };

        let released = self.shutdown();
        summary.record_events(&released);

        outcome.map(|()| summary)
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn states(&self) -> &[ZoneState] {
        self.state_machine.states()
    }

    pub fn is_degenerate(&self) -> bool {
        self.calibrator.is_degenerate()
    }

    pub fn detection_region(&self) -> Region {
        self.detection_region
    }

    pub fn reference_region(&self) -> Region {
        self.reference_region
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::event_dispatcher::tests::{Log, RecordingSink};
    use crate::core_modules::luma::flat_frame;
    use std::rc::Rc;

    fn pipeline(log: &Log) -> ShadowPipeline {
        let config = PipelineConfig {
            detection_region: Some(Region::new(0, 10, 30, 10)),
            reference_region: Some(Region::new(0, 0, 10, 10)),
            zone_labels: vec!["C".into(), "D".into(), "E".into()],
            ..PipelineConfig::default()
        };
        let dispatcher = EventDispatcher::new().with_sink(Box::new(RecordingSink {
            name: "rec".to_string(),
            log: log.clone(),
            fail: false,
        }));
        ShadowPipeline::new(config, 30, 20, dispatcher).unwrap()
    }

    #[test]
    fn wrong_sized_frames_are_rejected() {
        let log: Log = Rc::default();
        let mut pipeline = pipeline(&log);
        let err = pipeline.process_frame(&flat_frame(31, 20, 200)).unwrap_err();
        assert!(matches!(err, ShadowError::FrameShape { .. }));
    }

    #[test]
    fn invalid_configuration_fails_at_construction() {
        let config = PipelineConfig {
            reference_region: Some(Region::new(0, 0, 100, 100)),
            ..PipelineConfig::default()
        };
        let result = ShadowPipeline::new(config, 30, 20, EventDispatcher::new());
        assert!(matches!(result, Err(ShadowError::InvalidRegion { .. })));
    }

    #[test]
    fn degenerate_frames_skip_zone_sampling() {
        let log: Log = Rc::default();
        let mut pipeline = pipeline(&log);
        let report = pipeline.process_frame(&flat_frame(30, 20, 20)).unwrap();
        assert!(report.calibration.degenerate);
        assert!(report.zone_means.is_empty());
        assert!(report.events.is_empty());
        assert!(pipeline.is_degenerate());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let log: Log = Rc::default();
        let mut pipeline = pipeline(&log);
        let frame = GrayImage::from_fn(30, 20, |_, y| image::Luma([if y < 10 { 200 } else { 10 }]));
        assert_eq!(pipeline.process_frame(&frame).unwrap().events.len(), 3);

        assert_eq!(pipeline.shutdown().len(), 3);
        assert!(pipeline.shutdown().is_empty());
        assert_eq!(log.borrow().iter().filter(|l| l.contains(":off:")).count(), 3);
    }
}
