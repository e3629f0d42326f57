// src/recording/recorder.rs
//! Asynchronous line recorder
//!
//! The acquisition thread formats samples into lines and enqueues them; a
//! dedicated writer thread owns the file and appends whatever it dequeues.
//! Enqueueing never touches the file system.

use crate::config::constants::recording::{COLUMN_HEADER, WRITER_POLL_TIMEOUT_MS};
use crate::config::RecordingConfig;
use crate::error::{AcquireError, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What the producer does when the record queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued line; acquisition never waits
    #[default]
    DropOldest,
    /// Wait for the writer to make room
    Block,
}

/// Recorder counters, cumulative over the recorder's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub lines_written: u64,
    pub lines_dropped: u64,
    pub lines_queued: usize,
    pub recording: bool,
}

#[derive(Default)]
struct Counters {
    written: AtomicU64,
    dropped: AtomicU64,
}

/// Producer ends of a session, cloned out so enqueueing never holds the
/// session lock
#[derive(Clone)]
struct Producer {
    sender: Sender<String>,
    // Used to evict under `DropOldest`
    evict: Receiver<String>,
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl Producer {
    fn is_open(&self) -> bool {
        !self.stop.load(Ordering::Acquire) && !self.failed.load(Ordering::Acquire)
    }
}

struct Session {
    path: PathBuf,
    producer: Producer,
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Session {
    fn is_alive(&self) -> bool {
        !self.producer.failed.load(Ordering::Acquire)
    }
}

/// Bounded-queue recorder with a single writer thread per session
pub struct Recorder {
    session: Mutex<Option<Session>>,
    capacity: usize,
    policy: OverflowPolicy,
    join_timeout: Duration,
    counters: Arc<Counters>,
}

impl Recorder {
    pub fn new(config: &RecordingConfig) -> Self {
        Self::with_settings(
            config.queue_capacity,
            config.overflow_policy,
            Duration::from_millis(config.join_timeout_ms),
        )
    }

    pub fn with_settings(capacity: usize, policy: OverflowPolicy, join_timeout: Duration) -> Self {
        Self {
            session: Mutex::new(None),
            capacity: capacity.max(1),
            policy,
            join_timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Open `path`, write the two header lines and spawn the writer.
    ///
    /// Returns `Ok(false)` without touching anything when a session is already
    /// active.
    pub fn start_recording(&self, path: &Path, header_metadata: &str) -> Result<bool> {
        let mut guard = self.session.lock();
        if let Some(session) = guard.as_ref() {
            if session.is_alive() {
                debug!("Recording already active at {}", session.path.display());
                return Ok(false);
            }
        }
        // A session whose writer failed is torn down before starting over
        if let Some(stale) = guard.take() {
            self.shutdown(stale);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AcquireError::Recording(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let file = File::create(path)
            .map_err(|e| AcquireError::Recording(format!("cannot open {}: {}", path.display(), e)))?;
        let mut writer = LineWriter::new(file);
        writeln!(writer, "{}", header_metadata)?;
        writeln!(writer, "{}", COLUMN_HEADER)?;
        writer.flush()?;

        let (sender, receiver) = channel::bounded::<String>(self.capacity);
        let (done_tx, done) = channel::bounded::<()>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let handle = {
            let receiver = receiver.clone();
            let stop = Arc::clone(&stop);
            let failed = Arc::clone(&failed);
            let counters = Arc::clone(&self.counters);
            let path = path.to_path_buf();
            thread::Builder::new()
                .name("emg-recorder".to_string())
                .spawn(move || {
                    if let Err(e) = writer_loop(writer, &receiver, &stop, &counters) {
                        failed.store(true, Ordering::Release);
                        error!("Recording to {} aborted: {}", path.display(), e);
                    }
                    let _ = done_tx.send(());
                })?
        };

        info!("Recording started: {}", path.display());
        *guard = Some(Session {
            path: path.to_path_buf(),
            producer: Producer {
                sender,
                evict: receiver,
                stop,
                failed,
            },
            done,
            handle,
        });
        Ok(true)
    }

    /// Stop the writer, letting it drain what is already queued.
    ///
    /// Returns `false` when no session was active.
    pub fn stop_recording(&self) -> bool {
        // Take the session out so the lock is not held while joining
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                let path = session.path.clone();
                self.shutdown(session);
                info!(
                    "Recording stopped: {} ({} lines written, {} dropped)",
                    path.display(),
                    self.counters.written.load(Ordering::Relaxed),
                    self.counters.dropped.load(Ordering::Relaxed)
                );
                true
            }
            None => false,
        }
    }

    fn shutdown(&self, session: Session) {
        // Also releases a producer waiting on a full queue
        session.producer.stop.store(true, Ordering::Release);
        drop(session.producer);

        match session.done.recv_timeout(self.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if session.handle.join().is_err() {
                    error!("Recorder thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Recorder thread did not finish within {:?}; detaching",
                    self.join_timeout
                );
            }
        }
    }

    /// Enqueue one line per sample. Does nothing when not recording.
    ///
    /// Under [`OverflowPolicy::Block`] this waits for room in the queue, but
    /// gives up as soon as the session is stopped or its writer fails.
    pub fn push(&self, samples: &[f64]) {
        let producer = match self.session.lock().as_ref() {
            Some(session) if session.is_alive() => session.producer.clone(),
            _ => return,
        };

        for (i, value) in samples.iter().enumerate() {
            let line = value.to_string();
            let queued = match self.policy {
                OverflowPolicy::DropOldest => {
                    self.push_drop_oldest(&producer, line);
                    true
                }
                OverflowPolicy::Block => self.push_blocking(&producer, line),
            };
            if !queued {
                let abandoned = (samples.len() - i - 1) as u64;
                self.counters.dropped.fetch_add(abandoned, Ordering::Relaxed);
                break;
            }
        }
    }

    fn push_drop_oldest(&self, producer: &Producer, line: String) {
        match producer.sender.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(line)) => {
                if producer.evict.try_recv().is_ok() {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
                if producer.sender.try_send(line).is_err() {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // Returns false once the session is stopped or the writer is gone
    fn push_blocking(&self, producer: &Producer, mut line: String) -> bool {
        let poll = Duration::from_millis(WRITER_POLL_TIMEOUT_MS);
        loop {
            if !producer.is_open() {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match producer.sender.send_timeout(line, poll) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => line = back,
                Err(SendTimeoutError::Disconnected(_)) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().as_ref().map(Session::is_alive).unwrap_or(false)
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.session.lock().as_ref().map(|s| s.path.clone())
    }

    pub fn stats(&self) -> RecorderStats {
        let guard = self.session.lock();
        RecorderStats {
            lines_written: self.counters.written.load(Ordering::Relaxed),
            lines_dropped: self.counters.dropped.load(Ordering::Relaxed),
            lines_queued: guard.as_ref().map(|s| s.producer.sender.len()).unwrap_or(0),
            recording: guard.as_ref().map(Session::is_alive).unwrap_or(false),
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop_recording();
    }
}

// Every line reaches the file as soon as it is written
fn writer_loop(
    mut writer: LineWriter<File>,
    receiver: &Receiver<String>,
    stop: &AtomicBool,
    counters: &Counters,
) -> std::io::Result<()> {
    let poll = Duration::from_millis(WRITER_POLL_TIMEOUT_MS);

    while !stop.load(Ordering::Acquire) {
        match receiver.recv_timeout(poll) {
            Ok(line) => {
                writeln!(writer, "{}", line)?;
                counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Drain what was queued before the stop request
    while let Ok(line) = receiver.try_recv() {
        writeln!(writer, "{}", line)?;
        counters.written.fetch_add(1, Ordering::Relaxed);
    }
    writer.flush()
}
