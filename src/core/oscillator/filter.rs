use super::modulation::angular_velocity;

/// A single-pole post-processing stage. Owned by the mixer and only ever
/// touched from the audio thread.
pub trait Filter: Send {
    /// Recompute the coefficients. Called every sample so the cutoff can
    /// drift with the mood value.
    fn set_presets(&mut self, sample_interval: f64, cutoff: f64);

    fn process(&mut self, input: f64) -> f64;

    fn output(&self) -> f64;

    /// Drop the filter's memory.
    fn reset(&mut self);
}

/// One-pole low-pass. Cutoff 0 leaves the signal untouched, larger values
/// smooth it harder.
#[derive(Debug, Clone, Default)]
pub struct LowPassFilter {
    output: f64,
    coefficient: f64,
}

impl LowPassFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

impl Filter for LowPassFilter {
    fn set_presets(&mut self, sample_interval: f64, cutoff: f64) {
        self.coefficient = 1.0 - (-sample_interval * angular_velocity(cutoff)).exp();
    }

    fn process(&mut self, input: f64) -> f64 {
        self.output = input + (self.output - input) * self.coefficient;
        self.output
    }

    fn output(&self) -> f64 {
        self.output
    }

    fn reset(&mut self) {
        self.output = 0.0;
    }
}
