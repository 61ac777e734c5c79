// THEORY:
// The `SerialSink` speaks the keyboard's LED controller protocol. The device
// understands two kinds of message: a short code naming the zone that just
// lit up, and the single byte `0` meaning "something turned off". It cannot
// tell which zone was released, so every release sends the same off-signal.
//
// The sink is generic over `std::io::Write` so the protocol can be exercised
// against an in-memory buffer; the runner hands it an opened serial port.

use crate::core_modules::event_dispatcher::OutputSink;
use crate::core_modules::zone::{Zone, ZoneTable};
use crate::error::SinkError;
use std::collections::HashMap;
use std::io::Write;

/// The shared "turn off" byte understood by the device.
pub const OFF_SIGNAL: &[u8] = b"0";

pub struct SerialSink<W: Write> {
    port: W,
    /// Per-zone activation code, indexed by zone ordinal.
    codes: Vec<Vec<u8>>,
}

impl<W: Write> SerialSink<W> {
    /// Builds the sink. Zones without an entry in `codes` send their label.
    pub fn new(port: W, zones: &ZoneTable, codes: &HashMap<String, String>) -> Self {
        let codes = zones
            .iter()
            .map(|zone| {
                codes
                    .get(&zone.label)
                    .unwrap_or(&zone.label)
                    .as_bytes()
                    .to_vec()
            })
            .collect();
        Self { port, codes }
    }

    /// Writes control bytes that have nothing to do with zone state.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    pub fn code_for(&self, zone: &Zone) -> Option<&[u8]> {
        self.codes.get(zone.id).map(Vec::as_slice)
    }

    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> OutputSink for SerialSink<W> {
    fn name(&self) -> &str {
        "serial"
    }

    fn on_zone_activated(&mut self, zone: &Zone) -> Result<(), SinkError> {
        let code = self
            .codes
            .get(zone.id)
            .map_or(zone.label.as_bytes(), Vec::as_slice);
        self.port.write_all(code)?;
        self.port.flush()?;
        Ok(())
    }

    fn on_zone_deactivated(&mut self, _zone: &Zone) -> Result<(), SinkError> {
        self.write_raw(OFF_SIGNAL)
    }
}
