// src/acquisition/sink.rs
//! Delivery of filtered chunks and lifecycle signals to the consumer
//!
//! Emission is fire-and-forget: a sink must return promptly and must not
//! push back on the acquisition thread.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Filtered samples emitted in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SampleChunk {
    /// Cycle counter, starting at 0 for each `start()`
    pub sequence: u64,
    /// Wall-clock emission time, nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
    pub samples: Vec<f64>,
}

/// Lifecycle signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionStatus {
    Started,
    Stopped,
    /// The acquisition loop ended on its own; the controller is idle again
    Faulted(String),
}

/// Consumer of emitted chunks
pub trait ChunkSink: Send + Sync {
    fn on_chunk(&self, chunk: SampleChunk);

    fn on_status(&self, status: AcquisitionStatus) {
        trace!("Unhandled acquisition status: {:?}", status);
    }
}

/// Ends of the channels fed by a [`ChannelSink`]
pub struct SinkReceivers {
    pub chunks: Receiver<SampleChunk>,
    pub status: Receiver<AcquisitionStatus>,
}

/// Forwards chunks over a bounded channel; chunks are dropped while the
/// consumer lags behind.
pub struct ChannelSink {
    chunks: Sender<SampleChunk>,
    status: Sender<AcquisitionStatus>,
    dropped: AtomicU64,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, SinkReceivers) {
        let (chunk_tx, chunk_rx) = channel::bounded(capacity.max(1));
        let (status_tx, status_rx) = channel::unbounded();
        let sink = Self {
            chunks: chunk_tx,
            status: status_tx,
            dropped: AtomicU64::new(0),
        };
        (
            sink,
            SinkReceivers {
                chunks: chunk_rx,
                status: status_rx,
            },
        )
    }

    /// Chunks discarded because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ChunkSink for ChannelSink {
    fn on_chunk(&self, chunk: SampleChunk) {
        match self.chunks.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(chunk)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Consumer lagging, dropped chunk {}", chunk.sequence);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn on_status(&self, status: AcquisitionStatus) {
        let _ = self.status.send(status);
    }
}

/// Adapts a closure into a [`ChunkSink`]; status signals are ignored
pub struct FnSink<F>(pub F);

impl<F> ChunkSink for FnSink<F>
where
    F: Fn(SampleChunk) + Send + Sync,
{
    fn on_chunk(&self, chunk: SampleChunk) {
        (self.0)(chunk)
    }
}
