// src/processing/mod.rs
//! Signal processing for the filtered EMG stream

pub mod filter_chain;
pub mod filters;

pub use filter_chain::{center_in_place, FilterChain, FilterOutput, FilterStage, StageFault};
pub use filters::{FilterError, SecondOrderSection};
