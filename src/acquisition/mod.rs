// src/acquisition/mod.rs
//! Acquisition lifecycle and chunk delivery

pub mod controller;
pub mod sink;

pub use controller::{AcquisitionController, AcquisitionState, AcquisitionStats, DataProvider};
pub use sink::{AcquisitionStatus, ChannelSink, ChunkSink, FnSink, SampleChunk, SinkReceivers};
