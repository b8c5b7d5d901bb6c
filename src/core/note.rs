use crate::core::instrument::{InstrumentBank, InstrumentId};

/// A sounding (or releasing) pitch bound to an instrument.
///
/// The note is held while `on_time > off_time`. A fresh note is created
/// with `off_time = 0.0`, so anything switched on after the clock started is
/// held until it gets an explicit off time.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Semitones from the reference pitch (A3).
    pub scale_position: i32,
    pub on_time: f64,
    pub off_time: f64,
    pub is_active: bool,
    pub instrument: InstrumentId,
}

impl Note {
    /// A held note switched on at `on_time`.
    pub fn new(scale_position: i32, on_time: f64, instrument: InstrumentId) -> Self {
        Self {
            scale_position,
            on_time,
            off_time: 0.0,
            is_active: true,
            instrument,
        }
    }

    pub fn is_held(&self) -> bool {
        self.on_time > self.off_time
    }

    /// Let go of the note at `time`; it fades through its release from here.
    pub fn release(&mut self, time: f64) {
        if self.is_held() {
            self.off_time = time;
        }
    }

    /// Re-strike a note that is fading out.
    pub fn retrigger(&mut self, time: f64) {
        if !self.is_held() {
            self.on_time = time;
            self.is_active = true;
        }
    }

    /// Sample at `time`. Updates `is_active` from the instrument's verdict;
    /// a note whose instrument is missing from the bank is finished.
    pub fn sound(&mut self, time: f64, bank: &InstrumentBank) -> f64 {
        let (sample, finished) = match bank.get(self.instrument) {
            Some(instrument) => {
                instrument.sound(time, self.on_time, self.off_time, self.scale_position)
            }
            None => (0.0, true),
        };

        self.is_active = !finished;
        sample
    }
}
