use image::{GrayImage, Luma};
use shadow_keys::core_modules::serial_sink::SerialSink;
use shadow_keys::core_modules::utils::image_helper::SnapshotRenderer;
use shadow_keys::pipeline::{
    EventDispatcher, OutputSink, OverlayPrimitive, Region, Renderer, TransitionEvent, Zone,
};
use shadow_keys::{FrameSource, PipelineConfig, ShadowError, ShadowPipeline, SinkError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::rc::Rc;

const WIDTH: u32 = 30;
const HEIGHT: u32 = 20;

type Log = Rc<RefCell<Vec<String>>>;

struct RecordingSink {
    name: &'static str,
    log: Log,
    fail: bool,
}

impl OutputSink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    fn on_zone_activated(&mut self, zone: &Zone) -> Result<(), SinkError> {
        self.log.borrow_mut().push(format!("{}:on:{}", self.name, zone.id));
        if self.fail {
            return Err(SinkError::Playback("device gone".to_string()));
        }
        Ok(())
    }

    fn on_zone_deactivated(&mut self, zone: &Zone) -> Result<(), SinkError> {
        self.log.borrow_mut().push(format!("{}:off:{}", self.name, zone.id));
        if self.fail {
            return Err(SinkError::Playback("device gone".to_string()));
        }
        Ok(())
    }
}

/// Shared in-memory serial line so the test can read what was written.
#[derive(Clone, Default)]
struct SerialLine(Rc<RefCell<Vec<u8>>>);

impl Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct ScriptedSource {
    frames: VecDeque<Result<GrayImage, ShadowError>>,
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, ShadowError> {
        self.frames.pop_front().transpose()
    }
}

#[derive(Default)]
struct CountingRenderer {
    frames: usize,
    last: Vec<OverlayPrimitive>,
}

impl Renderer for CountingRenderer {
    fn draw_overlay(&mut self, _frame: &GrayImage, overlay: &[OverlayPrimitive]) {
        self.frames += 1;
        self.last = overlay.to_vec();
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        reference_region: Some(Region::new(0, 0, WIDTH, 10)),
        detection_region: Some(Region::new(0, 10, WIDTH, 10)),
        zone_labels: vec!["C".into(), "D".into(), "E".into()],
        ..PipelineConfig::default()
    }
}

/// Top half is the reference level; the bottom half holds one level per zone.
fn frame(reference: u8, zones: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        if y < 10 {
            Luma([reference])
        } else {
            Luma([zones[(x / 10) as usize]])
        }
    })
}

fn pipeline_with(sinks: Vec<Box<dyn OutputSink>>) -> ShadowPipeline {
    let mut dispatcher = EventDispatcher::new();
    for sink in sinks {
        dispatcher.register(sink);
    }
    ShadowPipeline::new(config(), WIDTH, HEIGHT, dispatcher).unwrap()
}

fn recording(log: &Log) -> Box<dyn OutputSink> {
    Box::new(RecordingSink {
        name: "rec",
        log: log.clone(),
        fail: false,
    })
}

#[test]
fn one_frame_scenario_presses_the_dark_zones_in_order() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);

    let report = pipeline.process_frame(&frame(200, [50, 150, 90])).unwrap();

    assert_eq!(report.calibration.reference_mean, 200.0);
    assert_eq!(report.calibration.threshold, 100.0);
    assert_eq!(report.zone_means, vec![50.0, 150.0, 90.0]);
    assert_eq!(
        report.events,
        vec![TransitionEvent::pressed(0), TransitionEvent::pressed(2)]
    );
    let active: Vec<bool> = pipeline.states().iter().map(|s| s.active).collect();
    assert_eq!(active, vec![true, false, true]);
    assert_eq!(*log.borrow(), vec!["rec:on:0", "rec:on:2"]);
}

#[test]
fn threshold_tracks_the_reference_exactly() {
    let mut pipeline = pipeline_with(Vec::new());
    let report = pipeline.process_frame(&frame(120, [200, 200, 200])).unwrap();
    assert!(!report.calibration.degenerate);
    assert_eq!(report.calibration.threshold, 60.0);
}

#[test]
fn unchanged_shadows_never_re_press() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);

    for _ in 0..10 {
        pipeline.process_frame(&frame(200, [20, 200, 200])).unwrap();
    }

    assert_eq!(*log.borrow(), vec!["rec:on:0"]);
}

#[test]
fn darkness_releases_each_active_zone_once() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);
    pipeline.process_frame(&frame(200, [20, 200, 20])).unwrap();

    let entering = pipeline.process_frame(&frame(40, [20, 200, 20])).unwrap();
    assert!(entering.calibration.degenerate);
    assert!(entering.zone_means.is_empty());
    assert_eq!(
        entering.events,
        vec![TransitionEvent::released(0), TransitionEvent::released(2)]
    );

    for _ in 0..5 {
        let report = pipeline.process_frame(&frame(40, [0, 0, 0])).unwrap();
        assert!(report.events.is_empty());
    }

    assert_eq!(
        *log.borrow(),
        vec!["rec:on:0", "rec:on:2", "rec:off:0", "rec:off:2"]
    );
}

#[test]
fn recovery_resumes_detection_on_the_same_frame() {
    let mut pipeline = pipeline_with(Vec::new());
    pipeline.process_frame(&frame(200, [20, 20, 20])).unwrap();
    pipeline.process_frame(&frame(30, [20, 20, 20])).unwrap();

    let recovered = pipeline.process_frame(&frame(200, [20, 200, 200])).unwrap();
    assert_eq!(recovered.events, vec![TransitionEvent::pressed(0)]);
}

#[test]
fn shutdown_releases_only_active_zones_in_ordinal_order() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);
    pipeline.process_frame(&frame(200, [20, 200, 20])).unwrap();
    log.borrow_mut().clear();

    let released = pipeline.shutdown();

    assert_eq!(
        released,
        vec![TransitionEvent::released(0), TransitionEvent::released(2)]
    );
    assert_eq!(*log.borrow(), vec!["rec:off:0", "rec:off:2"]);
}

#[test]
fn a_broken_sink_does_not_starve_the_next_one() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![
        Box::new(RecordingSink {
            name: "broken",
            log: log.clone(),
            fail: true,
        }),
        recording(&log),
    ]);

    let report = pipeline.process_frame(&frame(200, [20, 200, 200])).unwrap();

    assert_eq!(report.events, vec![TransitionEvent::pressed(0)]);
    assert_eq!(report.sink_failures.len(), 1);
    assert_eq!(report.sink_failures[0].sink, "broken");
    assert!(pipeline.states()[0].active);
    assert_eq!(*log.borrow(), vec!["broken:on:0", "rec:on:0"]);
}

#[test]
fn serial_device_sees_codes_and_the_shared_off_signal() {
    let line = SerialLine::default();
    let zones = shadow_keys::pipeline::ZoneTable::from_labels(&["C", "D", "E"]).unwrap();
    let codes = HashMap::from([("D".to_string(), "x".to_string())]);
    let mut pipeline = pipeline_with(vec![Box::new(SerialSink::new(line.clone(), &zones, &codes))]);

    pipeline.process_frame(&frame(200, [20, 20, 200])).unwrap();
    pipeline.process_frame(&frame(200, [200, 200, 200])).unwrap();

    assert_eq!(*line.0.borrow(), b"Cx00".to_vec());
}

#[test]
fn run_flushes_active_zones_when_stopped() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);
    let mut source = ScriptedSource {
        frames: (0..10).map(|_| Ok(frame(200, [20, 200, 20]))).collect(),
    };
    let mut renderer = CountingRenderer::default();
    let mut polls = 0;

    let summary = pipeline
        .run(&mut source, &mut renderer, || {
            polls += 1;
            polls > 3
        })
        .unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.presses, 2);
    assert_eq!(summary.releases, 2);
    assert_eq!(renderer.frames, 3);
    assert!(!renderer.last.is_empty());
    assert!(pipeline.states().iter().all(|s| !s.active));
    assert_eq!(
        *log.borrow(),
        vec!["rec:on:0", "rec:on:2", "rec:off:0", "rec:off:2"]
    );
}

#[test]
fn run_flushes_and_reports_a_capture_failure() {
    let log: Log = Rc::default();
    let mut pipeline = pipeline_with(vec![recording(&log)]);
    let mut source = ScriptedSource {
        frames: VecDeque::from([
            Ok(frame(200, [200, 20, 200])),
            Err(ShadowError::CaptureUnavailable("camera unplugged".to_string())),
        ]),
    };

    let result = pipeline.run(&mut source, &mut CountingRenderer::default(), || false);

    assert!(matches!(result, Err(ShadowError::CaptureUnavailable(_))));
    assert_eq!(*log.borrow(), vec!["rec:on:1", "rec:off:1"]);
}

#[test]
fn run_ends_cleanly_at_end_of_stream() {
    let mut pipeline = pipeline_with(Vec::new());
    let mut source = ScriptedSource {
        frames: VecDeque::from([Ok(frame(200, [200, 200, 200])), Ok(frame(40, [0, 0, 0]))]),
    };
    let mut renderer = SnapshotRenderer::new(std::env::temp_dir().join("shadow_keys_unused.png"));

    let summary = pipeline.run(&mut source, &mut renderer, || false).unwrap();

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.degenerate_frames, 1);
    assert_eq!(summary.presses, 0);
    assert!(renderer.latest().is_some());
}
