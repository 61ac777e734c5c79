use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use shadow_keys::core_modules::event_dispatcher::OutputSink;
use shadow_keys::core_modules::zone::{Zone, ZoneTable};
use shadow_keys::SinkError;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Plays one WAV sample per zone: started on press, stopped on release.
///
/// Samples are read into memory once at startup; each press decodes from that
/// buffer so there is no disk access on the frame loop.
pub struct SampleSink {
    // Dropping the stream silences every sink, so it lives as long as this value.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    samples: Vec<Option<Arc<[u8]>>>,
    playing: Vec<Option<Sink>>,
}

impl SampleSink {
    pub fn new(zones: &ZoneTable, sample_dir: &Path, files: &HashMap<String, String>) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("No audio output device available")?;

        let mut samples = Vec::with_capacity(zones.len());
        for zone in zones.iter() {
            let sample = match files.get(&zone.label) {
                Some(file) => {
                    let path = sample_dir.join(file);
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read sample {}", path.display()))?;
                    Some(Arc::from(bytes))
                }
                None => {
                    warn!(zone = %zone.label, "No sample configured; zone will be silent");
                    None
                }
            };
            samples.push(sample);
        }

        info!(
            loaded = samples.iter().flatten().count(),
            dir = %sample_dir.display(),
            "Audio samples loaded"
        );

        Ok(Self {
            _stream: stream,
            handle,
            playing: (0..samples.len()).map(|_| None).collect(),
            samples,
        })
    }
}

impl OutputSink for SampleSink {
    fn name(&self) -> &str {
        "audio"
    }

    fn on_zone_activated(&mut self, zone: &Zone) -> Result<(), SinkError> {
        let Some(bytes) = self.samples.get(zone.id).cloned().flatten() else {
            return Ok(());
        };
        let source =
            Decoder::new(Cursor::new(bytes)).map_err(|e| SinkError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&self.handle).map_err(|e| SinkError::Playback(e.to_string()))?;
        sink.append(source);

        if let Some(previous) = self.playing[zone.id].replace(sink) {
            previous.stop();
        }
        Ok(())
    }

    fn on_zone_deactivated(&mut self, zone: &Zone) -> Result<(), SinkError> {
        if let Some(sink) = self.playing.get_mut(zone.id).and_then(Option::take) {
            sink.stop();
        }
        Ok(())
    }
}
