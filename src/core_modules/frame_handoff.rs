// THEORY:
// When capture runs on its own thread, frames must reach the processing thread
// without ever queueing up. A backlog would mean the keyboard reacts to where a
// hand *was* several frames ago. The handoff is therefore a single slot: each
// publish overwrites whatever the consumer has not read yet, and the consumer
// always wakes to the newest frame. Stale frames are dropped, never queued.
//
// `tokio::sync::watch` is exactly this shape. Dropping the publisher closes the
// slot and signals end-of-stream.

use image::GrayImage;
use std::sync::Arc;
use tokio::sync::watch;

pub type SharedFrame = Arc<GrayImage>;

/// Capture-side end of the handoff.
pub struct FramePublisher {
    tx: watch::Sender<Option<SharedFrame>>,
}

/// Processing-side end of the handoff.
pub struct LatestFrame {
    rx: watch::Receiver<Option<SharedFrame>>,
}

pub fn latest_frame_slot() -> (FramePublisher, LatestFrame) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher { tx }, LatestFrame { rx })
}

impl FramePublisher {
    /// Replaces the slot's content. Returns `false` once the consumer is gone.
    pub fn publish(&self, frame: GrayImage) -> bool {
        self.tx.send(Some(Arc::new(frame))).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl LatestFrame {
    /// Waits for a frame newer than the last one returned.
    ///
    /// Returns `None` once the publisher has been dropped and its final frame
    /// (if any) has been consumed.
    pub async fn next(&mut self) -> Option<SharedFrame> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}
