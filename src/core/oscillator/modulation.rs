use serde::{Deserialize, Serialize};

/// Low frequency oscillator settings. Used as frequency modulation for
/// vibrato and as amplitude modulation for tremolo.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Lfo {
    pub amplitude: f64,
    pub hertz: f64,
}

impl Lfo {
    pub const NONE: Lfo = Lfo { amplitude: 0.0, hertz: 0.0 };

    pub const fn new(amplitude: f64, hertz: f64) -> Self {
        Self { amplitude, hertz }
    }

    /// Phase offset added to the carrier at `time`.
    pub fn phase_offset(&self, time: f64) -> f64 {
        self.amplitude * self.hertz * (angular_velocity(self.hertz) * time).sin()
    }

    /// Gain applied to the carrier at `time`, swinging around `1 - amplitude`.
    pub fn gain(&self, time: f64) -> f64 {
        let offset = 1.0 - self.amplitude;
        offset + self.amplitude * (angular_velocity(self.hertz) * time).sin()
    }
}

/// Convert a frequency in Hz to angular velocity.
pub fn angular_velocity(hertz: f64) -> f64 {
    hertz * 2.0 * std::f64::consts::PI
}
