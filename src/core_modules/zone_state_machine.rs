// THEORY:
// The `ZoneStateMachine` is the heart of the engine. It owns one `ZoneState` per
// zone and is the only code allowed to flip a zone between `Inactive` and
// `Active`. Each frame it compares the zone means against the calibrated
// threshold and emits an event only on an edge, so a hand held still over a key
// produces exactly one `Pressed` and, when lifted, exactly one `Released`.
//
// Key architectural principles:
// 1.  **Edge-triggered output**: A frame that does not change a zone's state emits
//     nothing for that zone. Idempotence falls out of comparing against the stored
//     state rather than re-announcing the current one.
// 2.  **Ordinal order**: Zones are evaluated and events emitted in zone-ordinal
//     order, which makes the output deterministic for sinks and tests.
// 3.  **Degenerate suspension**: While lighting is degenerate no comparison is
//     made. Every active zone is released on the first degenerate frame; later
//     degenerate frames find nothing active and stay silent. On recovery the
//     zones start from `Inactive` and that same frame is compared normally.
// 4.  **Single-sided hysteresis by default**: Activation is `mean < threshold` and
//     release is `mean >= release_threshold`. With the default configuration the
//     two thresholds are equal, so a zone sitting exactly on the boundary may
//     flicker; a separate release factor widens the band.
// 5.  **Commit before dispatch**: `advance` mutates state and returns the events.
//     Whatever happens to those events downstream cannot corrupt the states.

use crate::core_modules::brightness_sampler::Brightness;
use crate::core_modules::reference_calibrator::Calibration;
use crate::core_modules::zone::ZoneId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Pressed,
    Released,
}

/// A single zone edge, produced by the state machine and consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub zone_id: ZoneId,
    pub kind: TransitionKind,
}

impl TransitionEvent {
    pub fn pressed(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            kind: TransitionKind::Pressed,
        }
    }

    pub fn released(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            kind: TransitionKind::Released,
        }
    }
}

/// The debounced state of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    pub zone_id: ZoneId,
    pub active: bool,
    /// Frame number of the last transition, `None` if the zone never changed.
    pub last_change_frame: Option<u64>,
}

pub struct ZoneStateMachine {
    states: Vec<ZoneState>,
    /// Number of frames advanced so far; the current frame's number after `advance`.
    frame: u64,
}

impl ZoneStateMachine {
    /// Creates a machine with every zone `Inactive`.
    pub fn new(zone_count: usize) -> Self {
        Self {
            states: (0..zone_count)
                .map(|zone_id| ZoneState {
                    zone_id,
                    active: false,
                    last_change_frame: None,
                })
                .collect(),
            frame: 0,
        }
    }

    /// Advances every zone by one frame.
    ///
    /// `zone_means` is indexed by zone ordinal and is ignored entirely when the
    /// calibration is degenerate.
    pub fn advance(
        &mut self,
        zone_means: &[Brightness],
        calibration: &Calibration,
    ) -> Vec<TransitionEvent> {
        self.frame += 1;

        if calibration.degenerate {
            return self.release_active();
        }

        debug_assert_eq!(zone_means.len(), self.states.len());
        let frame = self.frame;
        let mut events = Vec::new();

        for (state, &mean) in self.states.iter_mut().zip(zone_means) {
            let event = if !state.active && mean < calibration.threshold {
                state.active = true;
                Some(TransitionEvent::pressed(state.zone_id))
            } else if state.active && mean >= calibration.release_threshold {
                state.active = false;
                Some(TransitionEvent::released(state.zone_id))
            } else {
                None
            };

            if let Some(event) = event {
                state.last_change_frame = Some(frame);
                debug!(
                    zone = state.zone_id,
                    kind = ?event.kind,
                    mean,
                    threshold = calibration.threshold,
                    frame,
                    "Zone transition"
                );
                events.push(event);
            }
        }

        events
    }

    /// Forces every active zone to `Inactive`, returning one `Released` per zone
    /// in ordinal order. Used on degenerate lighting and at shutdown.
    pub fn release_active(&mut self) -> Vec<TransitionEvent> {
        let frame = self.frame;
        self.states
            .iter_mut()
            .filter(|state| state.active)
            .map(|state| {
                state.active = false;
                state.last_change_frame = Some(frame);
                TransitionEvent::released(state.zone_id)
            })
            .collect()
    }

    pub fn states(&self) -> &[ZoneState] {
        &self.states
    }

    pub fn is_active(&self, zone_id: ZoneId) -> bool {
        self.states.get(zone_id).is_some_and(|s| s.active)
    }

    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|s| s.active).count()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
