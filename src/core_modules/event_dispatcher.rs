// THEORY:
// The `EventDispatcher` decouples detection from output. The state machine has
// already committed a transition by the time an event arrives here; the
// dispatcher only fans that event out, in registration order, to every sink.
//
// Key principles:
// 1.  **Isolation**: each sink call stands alone. A sink that fails (a serial
//     cable pulled mid-performance, an audio device that vanished) is logged and
//     recorded, and delivery continues with the next sink.
// 2.  **Press/release mapping**: `Pressed` means "turn on the output for this
//     zone"; `Released` means "turn off". The hardware sink collapses every
//     release into one shared off-signal; the zone is still passed so sinks that
//     can distinguish zones (audio) stop the right sample.
// 3.  **No back-pressure**: dispatch never blocks or rewinds the state machine.

use crate::core_modules::zone::{Zone, ZoneTable};
use crate::core_modules::zone_state_machine::{TransitionEvent, TransitionKind};
use crate::error::SinkError;
use tracing::{error, trace};

/// An output collaborator driven by zone transitions.
pub trait OutputSink {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &str;

    fn on_zone_activated(&mut self, zone: &Zone) -> Result<(), SinkError>;

    fn on_zone_deactivated(&mut self, zone: &Zone) -> Result<(), SinkError>;
}

/// One sink failing to deliver one event.
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub event: TransitionEvent,
    pub error: SinkError,
}

#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn OutputSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Appends a sink; sinks are called in the order they were registered.
    pub fn register(&mut self, sink: Box<dyn OutputSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.register(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Delivers `event` to every sink, returning the failures that occurred.
    pub fn dispatch(&mut self, event: TransitionEvent, zones: &ZoneTable) -> Vec<SinkFailure> {
        let Some(zone) = zones.get(event.zone_id) else {
            error!(zone = event.zone_id, "Dropping event for unknown zone");
            return Vec::new();
        };

        let mut failures = Vec::new();
        for sink in self.sinks.iter_mut() {
            let result = match event.kind {
                TransitionKind::Pressed => sink.on_zone_activated(zone),
                TransitionKind::Released => sink.on_zone_deactivated(zone),
            };
            match result {
                Ok(()) => trace!(
                    sink = sink.name(),
                    zone = %zone.label,
                    kind = ?event.kind,
                    "Delivered"
                ),
                Err(err) => {
                    error!(
                        sink = sink.name(),
                        zone = %zone.label,
                        kind = ?event.kind,
                        error = %err,
                        "Sink failed to deliver event"
                    );
                    failures.push(SinkFailure {
                        sink: sink.name().to_string(),
                        event,
                        error: err,
                    });
                }
            }
        }
        failures
    }

    /// Dispatches a batch of events in order.
    pub fn dispatch_all(&mut self, events: &[TransitionEvent], zones: &ZoneTable) -> Vec<SinkFailure> {
        events
            .iter()
            .flat_map(|&event| self.dispatch(event, zones))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) type Log = Rc<RefCell<Vec<String>>>;

    /// Records every call as "<sink>:on:<label>" / "<sink>:off:<label>".
    pub(crate) struct RecordingSink {
        pub name: String,
        pub log: Log,
        pub fail: bool,
    }

    impl OutputSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_zone_activated(&mut self, zone: &Zone) -> Result<(), SinkError> {
            self.log.borrow_mut().push(format!("{}:on:{}", self.name, zone.label));
            if self.fail {
                return Err(SinkError::Playback("boom".to_string()));
            }
            Ok(())
        }

        fn on_zone_deactivated(&mut self, zone: &Zone) -> Result<(), SinkError> {
            self.log.borrow_mut().push(format!("{}:off:{}", self.name, zone.label));
            if self.fail {
                return Err(SinkError::Playback("boom".to_string()));
            }
            Ok(())
        }
    }

    fn sink(name: &str, log: &Log, fail: bool) -> Box<dyn OutputSink> {
        Box::new(RecordingSink {
            name: name.to_string(),
            log: log.clone(),
            fail,
        })
    }

    #[test]
    fn events_reach_every_sink_in_registration_order() {
        let log: Log = Rc::default();
        let zones = ZoneTable::from_labels(&["C", "D"]).unwrap();
        let mut dispatcher = EventDispatcher::new()
            .with_sink(sink("serial", &log, false))
            .with_sink(sink("audio", &log, false));

        let failures = dispatcher.dispatch_all(
            &[TransitionEvent::pressed(1), TransitionEvent::released(1)],
            &zones,
        );

        assert!(failures.is_empty());
        assert_eq!(
            *log.borrow(),
            vec!["serial:on:D", "audio:on:D", "serial:off:D", "audio:off:D"]
        );
    }

    #[test]
    fn a_failing_sink_does_not_block_later_sinks() {
        let log: Log = Rc::default();
        let zones = ZoneTable::from_labels(&["C"]).unwrap();
        let mut dispatcher = EventDispatcher::new()
            .with_sink(sink("serial", &log, true))
            .with_sink(sink("audio", &log, false));

        let failures = dispatcher.dispatch(TransitionEvent::pressed(0), &zones);

        assert_eq!(*log.borrow(), vec!["serial:on:C", "audio:on:C"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sink, "serial");
        assert_eq!(failures[0].event, TransitionEvent::pressed(0));
    }

    #[test]
    fn unknown_zones_are_dropped() {
        let log: Log = Rc::default();
        let zones = ZoneTable::from_labels(&["C"]).unwrap();
        let mut dispatcher = EventDispatcher::new().with_sink(sink("serial", &log, false));
        assert!(dispatcher.dispatch(TransitionEvent::pressed(4), &zones).is_empty());
        assert!(log.borrow().is_empty());
    }
}
