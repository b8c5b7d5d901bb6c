//! Real-time mood-driven synthesizer: instruments and envelopes, a
//! sequencer that stages notes on a beat clock, a mixer feeding a block
//! ring, and the device and file sinks that drain it.

pub mod config;
pub mod core;
pub mod error;
pub mod messaging;

pub use config::SessionConfig;
pub use error::{Result, SynthError};
