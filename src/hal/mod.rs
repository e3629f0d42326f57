// src/hal/mod.rs
//! Hardware abstraction layer: byte sources and the sample framing protocol

pub mod traits;
pub mod protocol;
pub mod simulator;
pub mod serial_driver;

pub use traits::*;
pub use protocol::{ProtocolDecoder, DecoderStats};
