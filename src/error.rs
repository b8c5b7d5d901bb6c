use thiserror::Error;

/// Errors raised by the synthesizer core.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open output device: {0}")]
    DeviceOpen(String),

    #[error("unsupported output sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("invalid device configuration: {0}")]
    InvalidDeviceConfig(String),

    #[error("output device is no longer accepting blocks")]
    DeviceUnavailable,

    #[error("invalid beat pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown instrument id {0}")]
    UnknownInstrument(usize),

    #[error("invalid tempo {tempo} bpm with {steps} steps per bar")]
    InvalidTempo { tempo: f64, steps: usize },

    #[error("wav output error: {0}")]
    Wav(#[from] hound::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SynthError>;
