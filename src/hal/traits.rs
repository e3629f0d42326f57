// src/hal/traits.rs
//! Core HAL traits for byte-stream device abstraction

use crate::error::Result;
use std::io;

/// Non-blocking source of raw amplifier bytes.
///
/// Owned by exactly one acquisition thread; dropping it closes the device.
pub trait ByteSource: Send {
    /// Copy whatever bytes are currently available into `buf`.
    ///
    /// Returns `Ok(0)` when nothing is pending. Must not block waiting for data.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Human-readable device name for logs
    fn describe(&self) -> String {
        "byte source".to_string()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_available(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Opens a [`ByteSource`].
///
/// Called synchronously from `start()`, so a missing or busy device is
/// reported to the caller before any thread is spawned.
pub trait PortConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ByteSource>>;
}

impl<F> PortConnector for F
where
    F: Fn() -> Result<Box<dyn ByteSource>> + Send + Sync,
{
    fn connect(&self) -> Result<Box<dyn ByteSource>> {
        self()
    }
}
