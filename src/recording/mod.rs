// src/recording/mod.rs
//! Persistence of the filtered stream

pub mod recorder;

pub use recorder::{OverflowPolicy, Recorder, RecorderStats};
