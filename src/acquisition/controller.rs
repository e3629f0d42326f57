// src/acquisition/controller.rs
//! Acquisition lifecycle and the decode → filter → emit loop
//!
//! The acquisition thread is the only owner of the byte source and of the
//! sample history. Everything it hands out (chunks, recorded lines) is a copy,
//! so the history itself is never shared.

use crate::acquisition::sink::{AcquisitionStatus, ChunkSink, SampleChunk};
use crate::config::{AcquisitionConfig, FilterConfig, RecordingConfig};
use crate::error::{AcquireError, Result};
use crate::hal::serial_driver::SerialConnector;
use crate::hal::{ByteSource, PortConnector, ProtocolDecoder};
use crate::processing::FilterChain;
use crate::recording::{Recorder, RecorderStats};
use crate::utils::time::{current_timestamp_nanos, elapsed_nanos};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of the acquisition thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcquisitionState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl AcquisitionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AcquisitionState::Running,
            2 => AcquisitionState::Stopping,
            _ => AcquisitionState::Idle,
        }
    }
}

/// Any acquisition backend: started, stopped, and emitting through a sink
pub trait DataProvider {
    fn start(&self) -> Result<()>;
    fn stop(&self);
    fn is_running(&self) -> bool;
}

/// Counters since the controller was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub bytes_read: u64,
    pub samples_decoded: u64,
    pub bytes_discarded: u64,
    pub frames_rejected: u64,
    pub chunks_emitted: u64,
    pub samples_emitted: u64,
    pub filter_faults: u64,
    /// Duration of the most recent filter-and-emit cycle
    pub last_cycle_ns: u64,
}

#[derive(Default)]
struct StatsCounters {
    bytes_read: AtomicU64,
    samples_decoded: AtomicU64,
    bytes_discarded: AtomicU64,
    frames_rejected: AtomicU64,
    chunks_emitted: AtomicU64,
    samples_emitted: AtomicU64,
    filter_faults: AtomicU64,
    last_cycle_ns: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> AcquisitionStats {
        AcquisitionStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            samples_decoded: self.samples_decoded.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            chunks_emitted: self.chunks_emitted.load(Ordering::Relaxed),
            samples_emitted: self.samples_emitted.load(Ordering::Relaxed),
            filter_faults: self.filter_faults.load(Ordering::Relaxed),
            last_cycle_ns: self.last_cycle_ns.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the controller handle and its acquisition thread
struct Shared {
    state: AtomicU8,
    filters: RwLock<Arc<FilterConfig>>,
    recorder: Recorder,
    sink: Arc<dyn ChunkSink>,
    stats: StatsCounters,
}

impl Shared {
    fn state(&self) -> AcquisitionState {
        AcquisitionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: AcquisitionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Loop parameters fixed for the lifetime of one acquisition thread
#[derive(Debug, Clone, Copy)]
struct LoopParams {
    sample_rate_hz: f64,
    samples_per_update: usize,
    chunk_size: usize,
    read_chunk_bytes: usize,
    poll_interval: Duration,
}

/// One acquisition thread and the stop flag that belongs to it alone
struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

/// Owns the connection and the acquisition thread
pub struct AcquisitionController {
    config: AcquisitionConfig,
    connector: Box<dyn PortConnector>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl AcquisitionController {
    /// Controller reading from `connector`; the configuration is validated here
    pub fn new(
        config: AcquisitionConfig,
        connector: impl PortConnector + 'static,
        sink: Arc<dyn ChunkSink>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: AtomicU8::new(AcquisitionState::Idle as u8),
            filters: RwLock::new(Arc::new(config.filters.clone())),
            recorder: Recorder::new(&config.recording),
            sink,
            stats: StatsCounters::default(),
        });

        Ok(Self {
            config,
            connector: Box::new(connector),
            shared,
            worker: Mutex::new(None),
        })
    }

    /// Controller reading from the serial port named in the configuration
    pub fn with_serial(config: AcquisitionConfig, sink: Arc<dyn ChunkSink>) -> Result<Self> {
        let connector = SerialConnector::new(config.serial.clone());
        Self::new(config, connector, sink)
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn state(&self) -> AcquisitionState {
        self.shared.state()
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.shared.stats.snapshot()
    }

    /// Open the connection and spawn the acquisition thread.
    ///
    /// A connection failure is returned here and leaves the controller idle.
    /// Calling `start()` while running does nothing.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        match self.shared.state() {
            AcquisitionState::Running => {
                debug!("start() ignored: acquisition already running");
                return Ok(());
            }
            AcquisitionState::Stopping => {
                return Err(AcquireError::InvalidState("acquisition is stopping".to_string()));
            }
            AcquisitionState::Idle => {}
        }

        // Reap a thread that ended on a fault
        if let Some(previous) = worker.take() {
            if previous.handle.join().is_err() {
                warn!("Previous acquisition thread panicked");
            }
        }

        let source = self.connector.connect()?;
        info!("Acquisition starting on {}", source.describe());

        let params = LoopParams {
            sample_rate_hz: self.config.stream.sample_rate_hz as f64,
            samples_per_update: self.config.stream.samples_per_update,
            chunk_size: self.config.stream.chunk_size,
            read_chunk_bytes: self.config.serial.read_chunk_bytes,
            poll_interval: self.config.serial.poll_interval(),
        };

        // A thread left behind by a stop() from inside the sink keeps its own
        // flag, so it cannot be revived here
        let stop = Arc::new(AtomicBool::new(false));
        self.shared.set_state(AcquisitionState::Running);
        self.shared.sink.on_status(AcquisitionStatus::Started);

        let shared = Arc::clone(&self.shared);
        let thread_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name("emg-acquisition".to_string())
            .spawn(move || acquisition_thread(source, shared, thread_stop, params));

        match spawned {
            Ok(handle) => {
                *worker = Some(Worker { handle, stop });
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(AcquisitionState::Idle);
                self.shared.sink.on_status(AcquisitionStatus::Stopped);
                Err(AcquireError::Io(e))
            }
        }
    }

    /// Stop acquisition, close the connection and end any recording.
    ///
    /// A second call is a no-op.
    pub fn stop(&self) {
        let worker = self.worker.lock().take();
        if worker.is_none() && !self.shared.recorder.is_recording() {
            return;
        }

        let was_running = self
            .shared
            .state
            .compare_exchange(
                AcquisitionState::Running as u8,
                AcquisitionState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if let Some(worker) = &worker {
            worker.stop.store(true, Ordering::Release);
        }

        // Ending the recording first releases a loop waiting on a full record queue
        self.shared.recorder.stop_recording();

        if let Some(worker) = worker {
            if worker.handle.thread().id() == thread::current().id() {
                // Called from a sink on the acquisition thread; it exits on its own
                debug!("stop() called from the acquisition thread");
            } else if worker.handle.join().is_err() {
                warn!("Acquisition thread panicked during shutdown");
            }
        }

        self.shared.set_state(AcquisitionState::Idle);

        if was_running {
            info!("Acquisition stopped");
            self.shared.sink.on_status(AcquisitionStatus::Stopped);
        }
    }

    /// Start recording to `target`'s `output_folder/filename.csv`.
    ///
    /// Returns `Ok(false)` if a recording is already active. An existing file is
    /// only replaced when `target.overwrite` is set.
    pub fn start_recording(&self, target: &RecordingConfig) -> Result<bool> {
        if self.shared.recorder.is_recording() {
            debug!("start_recording() ignored: already recording");
            return Ok(false);
        }

        let path = target.resolve_path()?;
        if path.exists() && !target.overwrite {
            return Err(AcquireError::Recording(format!(
                "{} already exists and overwrite is disabled",
                path.display()
            )));
        }
        self.shared
            .recorder
            .start_recording(&path, &self.config.header_metadata())
    }

    /// Start recording to the target given in the controller's configuration
    pub fn start_configured_recording(&self) -> Result<bool> {
        self.start_recording(&self.config.recording)
    }

    /// Returns `false` if nothing was being recorded
    pub fn stop_recording(&self) -> bool {
        self.shared.recorder.stop_recording()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recorder.is_recording()
    }

    pub fn recorder_stats(&self) -> RecorderStats {
        self.shared.recorder.stats()
    }

    /// Replace the filter snapshot; picked up at the next cycle.
    ///
    /// Settings the chain cannot apply are accepted; the failing stage is
    /// skipped each cycle and counted in [`AcquisitionStats::filter_faults`].
    pub fn update_filters(&self, filters: FilterConfig) {
        let problems = filters.validate(self.config.stream.sample_rate_hz);
        if !problems.is_empty() {
            warn!("Filter settings will fail at runtime: {}", problems.join("; "));
        }
        *self.shared.filters.write() = Arc::new(filters);
    }

    pub fn filters(&self) -> Arc<FilterConfig> {
        self.shared.filters.read().clone()
    }
}

impl DataProvider for AcquisitionController {
    fn start(&self) -> Result<()> {
        AcquisitionController::start(self)
    }

    fn stop(&self) {
        AcquisitionController::stop(self)
    }

    fn is_running(&self) -> bool {
        self.state() == AcquisitionState::Running
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquisition_thread(
    mut source: Box<dyn ByteSource>,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    params: LoopParams,
) {
    let outcome =
        panic::catch_unwind(AssertUnwindSafe(|| run_loop(source.as_mut(), &shared, &stop, &params)));
    let description = source.describe();
    // Dropping the source closes the connection
    drop(source);

    let fault = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
    };

    match fault {
        None => debug!("Acquisition loop on {} exited", description),
        // stop() already owns the lifecycle of this run
        Some(reason) if stop.load(Ordering::Acquire) => {
            warn!("Acquisition loop on {} failed while stopping: {}", description, reason);
        }
        Some(reason) => {
            error!("Acquisition loop on {} faulted: {}", description, reason);
            shared.recorder.stop_recording();
            shared.set_state(AcquisitionState::Idle);
            shared.sink.on_status(AcquisitionStatus::Faulted(reason));
        }
    }
}

fn run_loop(source: &mut dyn ByteSource, shared: &Shared, stop: &AtomicBool, params: &LoopParams) -> Result<()> {
    let chain = FilterChain::new(params.sample_rate_hz);
    let mut decoder = ProtocolDecoder::new();
    let mut history: Vec<i32> = Vec::with_capacity(params.chunk_size + params.read_chunk_bytes);
    let mut buf = vec![0u8; params.read_chunk_bytes];
    let mut sequence = 0u64;
    let stats = &shared.stats;

    while !stop.load(Ordering::Acquire) {
        let n = source.read_available(&mut buf)?;

        if n > 0 {
            stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
            let decoded = decoder.feed_into(&buf[..n], &mut history);
            stats.samples_decoded.fetch_add(decoded as u64, Ordering::Relaxed);
            let decoder_stats = decoder.stats();
            stats.bytes_discarded.store(decoder_stats.bytes_discarded, Ordering::Relaxed);
            stats.frames_rejected.store(decoder_stats.frames_rejected, Ordering::Relaxed);

            // The oldest `chunk_size` samples form the window, so every
            // emitted slice follows the previous one without gaps
            while history.len() >= params.chunk_size && !stop.load(Ordering::Acquire) {
                let started = Instant::now();
                let filters = shared.filters.read().clone();

                let window: Vec<f64> = history[..params.chunk_size].iter().map(|&v| v as f64).collect();
                let output = chain.apply_with_report(&window, &filters);
                if output.fault.is_some() {
                    stats.filter_faults.fetch_add(1, Ordering::Relaxed);
                }

                let samples = output.samples[params.chunk_size - params.samples_per_update..].to_vec();
                shared.recorder.push(&samples);

                let emitted = samples.len() as u64;
                shared.sink.on_chunk(SampleChunk {
                    sequence,
                    timestamp_ns: current_timestamp_nanos(),
                    samples,
                });
                sequence += 1;
                history.drain(..params.samples_per_update);

                stats.chunks_emitted.fetch_add(1, Ordering::Relaxed);
                stats.samples_emitted.fetch_add(emitted, Ordering::Relaxed);
                stats.last_cycle_ns.store(elapsed_nanos(started), Ordering::Relaxed);
                trace!(sequence, history = history.len(), "Chunk emitted");
            }
        }

        // Keep reading without pause while the device has a backlog
        if n < buf.len() {
            thread::sleep(params.poll_interval);
        }
    }

    debug!(
        chunks = sequence,
        pending_samples = history.len(),
        "Acquisition loop stopping"
    );
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
