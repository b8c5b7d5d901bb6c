use crate::core::arrangement::DrumGroove;
use crate::core::instrument::InstrumentId;

/// Commands from input threads (stdin, network listeners, key pollers) to
/// the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum SynthMessage {
    /// New mood value, latest wins
    SetMood(i32),
    KeyDown {
        instrument: InstrumentId,
        scale_position: i32,
    },
    KeyUp {
        instrument: InstrumentId,
        scale_position: i32,
    },
    /// Replace one instrument's bar from the next beat on
    PlayBar(InstrumentId, String),
    SetGroove(DrumGroove),
    Quit,
}
