pub mod arrangement;
pub mod audio;
pub mod instrument;
pub mod note;
pub mod oscillator;
pub mod phrase;
pub mod sequencer;
pub mod synth;

pub use instrument::{Instrument, InstrumentBank, InstrumentId, InstrumentKind};
pub use note::Note;
pub use sequencer::Sequencer;
pub use synth::{AudioEngine, Mixer};
