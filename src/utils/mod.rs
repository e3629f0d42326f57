//! Small helpers shared across the crate

pub mod time;

pub use time::{current_timestamp_nanos, elapsed_nanos};
