mod bus;
mod types;

pub use bus::{MessageBus, ProcessOutcome};
pub use types::SynthMessage;
