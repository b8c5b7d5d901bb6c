use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of partials summed by the analog saw, exclusive.
const ANALOG_SAW_PARTIALS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    /// Band-limited sawtooth built from 49 harmonics.
    AnalogSaw,
    /// Closed-form sawtooth. Aliases audibly when mixed with other waves.
    DigitalSaw,
    /// Uniform white noise, not seeded.
    Noise,
}

impl Waveform {
    /// Sample the waveform at carrier phase `phase` (radians). `time` and
    /// `hertz` are only read by the digital saw, which ignores modulation.
    pub fn sample(&self, phase: f64, time: f64, hertz: f64) -> f64 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Square => {
                if phase.sin() > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => phase.sin().asin() * (2.0 / PI),
            Waveform::AnalogSaw => {
                let sum: f64 = (1..ANALOG_SAW_PARTIALS)
                    .map(|n| (n as f64 * phase).sin() / n as f64)
                    .sum();
                sum * (2.0 / PI)
            }
            Waveform::DigitalSaw => {
                (2.0 / PI) * (hertz * PI * (time % (1.0 / hertz)) - (PI / 2.0))
            }
            Waveform::Noise => 2.0 * rand::random::<f64>() - 1.0,
        }
    }

    /// Whether the amplitude modulation gain applies to this waveform.
    pub fn takes_modulation(&self) -> bool {
        !matches!(self, Waveform::DigitalSaw | Waveform::Noise)
    }
}
