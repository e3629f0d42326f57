// src/config/constants.rs
//! System-wide configuration constants

/// Two-byte sample framing protocol
pub mod protocol {
    /// High bit marking the first byte of a frame
    pub const FRAME_MARKER: u8 = 0x80;
    /// Mask selecting the 7 payload bits of either frame byte
    pub const PAYLOAD_MASK: u8 = 0x7F;
    /// Payload bits carried by each frame byte
    pub const PAYLOAD_BITS: u32 = 7;
    /// Offset subtracted from the raw 14-bit value to center it around zero
    pub const BIAS_OFFSET: i32 = 8192;
    /// Smallest decodable sample
    pub const SAMPLE_MIN: i32 = -BIAS_OFFSET;
    /// Largest decodable sample
    pub const SAMPLE_MAX: i32 = BIAS_OFFSET - 1;
}

/// Signal and windowing constants
pub mod signal {
    pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 10_000;
    pub const MIN_SAMPLING_RATE_HZ: u32 = 100;
    pub const MAX_SAMPLING_RATE_HZ: u32 = 100_000;

    pub const DEFAULT_SAMPLES_PER_UPDATE: usize = 100;
    pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
    pub const MIN_CHUNK_SIZE: usize = 100;
    pub const MAX_CHUNK_SIZE: usize = 100_000;
}

/// Serial link constants
pub mod serial {
    pub const DEFAULT_PORT: &str = "COM12";
    pub const DEFAULT_BAUD_RATE: u32 = 230_400;
    pub const MAX_BAUD_RATE: u32 = 4_000_000;
    /// Upper bound on bytes pulled from the port per read attempt
    pub const DEFAULT_READ_CHUNK_BYTES: usize = 512;
    pub const MIN_READ_CHUNK_BYTES: usize = 2;
    pub const MAX_READ_CHUNK_BYTES: usize = 65_536;
    /// Sleep between read attempts
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
    pub const MAX_POLL_INTERVAL_MS: u64 = 100;
}

/// Filter parameter defaults and ranges
pub mod filters {
    pub const DEFAULT_NOTCH_FREQ_HZ: f64 = 60.0;
    pub const MIN_NOTCH_FREQ_HZ: f64 = 10.0;
    pub const MAX_NOTCH_FREQ_HZ: f64 = 100.0;
    pub const DEFAULT_NOTCH_Q: f64 = 30.0;
    pub const MIN_NOTCH_Q: f64 = 1.0;
    pub const MAX_NOTCH_Q: f64 = 100.0;
    pub const DEFAULT_NOTCH_HARMONICS: u32 = 3;
    pub const MAX_NOTCH_HARMONICS: u32 = 5;

    pub const DEFAULT_BANDPASS_LOW_HZ: f64 = 20.0;
    pub const DEFAULT_BANDPASS_HIGH_HZ: f64 = 450.0;
    pub const DEFAULT_BANDPASS_ORDER: usize = 2;
    pub const MIN_BANDPASS_ORDER: usize = 1;
    pub const MAX_BANDPASS_ORDER: usize = 10;

    /// Zero-phase band-pass needs at least this many samples per unit of order
    pub const BANDPASS_MIN_SAMPLES_PER_ORDER: usize = 3;
}

/// Recording constants
pub mod recording {
    pub const FILE_EXTENSION: &str = "csv";
    pub const COLUMN_HEADER: &str = "valor";
    pub const METADATA_PREFIX: &str = "# sample_rate: ";
    /// Lines held in the writer queue before the overflow policy applies
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1_000_000;
    pub const MIN_QUEUE_CAPACITY: usize = 1;
    /// Writer thread dequeue poll
    pub const WRITER_POLL_TIMEOUT_MS: u64 = 100;
    /// Bound on how long `stop_recording` waits for the writer thread
    pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 2_000;
}

/// Environment and file locations
pub mod paths {
    pub const ENV_PREFIX: &str = "EMG_ACQUIRE";
    pub const ENV_SEPARATOR: &str = "__";
    pub const DEFAULT_CONFIG_FILE: &str = "emg-acquire.toml";
}
