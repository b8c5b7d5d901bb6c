use serde::{Deserialize, Serialize};

/// Smallest duration an envelope stage may have. Zero-length stages are
/// stretched to this so the ramps never divide by zero.
pub const MIN_DURATION: f64 = 1e-6;

/// Amplitudes at or below this are reported as exactly zero. Instruments
/// read a zero amplitude during release as "note finished".
pub const SILENCE_THRESHOLD: f64 = 0.001;

/// Attack / decay / sustain / release envelope. Stateless: the amplitude is
/// a pure function of the note's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub start_amplitude: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.1,
            sustain: 1.0,
            release: 0.2,
            start_amplitude: 1.0,
        }
    }
}

impl Envelope {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            start_amplitude: 1.0,
        }
    }

    /// Amplitude at `time` for a note switched on at `time_on` and off at
    /// `time_off`. The note counts as held while `time_on > time_off`.
    pub fn amplitude(&self, time: f64, time_on: f64, time_off: f64) -> f64 {
        let amplitude = if time_on > time_off {
            self.held_amplitude(time - time_on)
        } else {
            // Replay attack/decay up to the release point instead of storing
            // the level the note had when it was let go.
            let release_amplitude = self.held_amplitude(time_off - time_on);
            let release = self.release.max(MIN_DURATION);
            ((time - time_off) / release) * (0.0 - release_amplitude) + release_amplitude
        };

        if amplitude <= SILENCE_THRESHOLD {
            0.0
        } else {
            amplitude
        }
    }

    fn held_amplitude(&self, life_time: f64) -> f64 {
        let attack = self.attack.max(MIN_DURATION);
        let decay = self.decay.max(MIN_DURATION);

        if life_time <= attack {
            (life_time / attack) * self.start_amplitude
        } else if life_time <= attack + decay {
            ((life_time - attack) / decay) * (self.sustain - self.start_amplitude)
                + self.start_amplitude
        } else {
            self.sustain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn piano() -> Envelope {
        Envelope::new(0.01, 0.1, 0.65, 0.1)
    }

    #[test]
    fn attack_ramps_to_start_amplitude() {
        let env = piano();
        assert_eq!(env.amplitude(0.0, 0.0, -1.0), 0.0);
        assert!((env.amplitude(1.005, 1.0, 0.0) - 0.5).abs() < EPS);
        assert!((env.amplitude(1.01, 1.0, 0.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn continuous_at_stage_boundaries() {
        let env = piano();
        let on = 2.0;
        let attack_end = on + env.attack;
        let decay_end = attack_end + env.decay;
        let delta = 1e-9;

        let before = env.amplitude(attack_end - delta, on, 0.0);
        let after = env.amplitude(attack_end + delta, on, 0.0);
        assert!((before - after).abs() < 1e-6);

        let before = env.amplitude(decay_end - delta, on, 0.0);
        let after = env.amplitude(decay_end + delta, on, 0.0);
        assert!((before - after).abs() < 1e-6);
        assert!((after - env.sustain).abs() < 1e-6);
    }

    #[test]
    fn stays_within_start_amplitude() {
        let env = Envelope {
            start_amplitude: 0.8,
            ..piano()
        };
        let on = 1.0;
        for step in 0..2000 {
            let t = on + step as f64 * 0.0005;
            let a = env.amplitude(t, on, 0.0);
            assert!((0.0..=0.8 + EPS).contains(&a), "t = {t}, a = {a}");
        }
    }

    #[test]
    fn release_replays_level_at_release_time() {
        let env = piano();
        let on = 1.0;
        // released mid-attack, level was 0.5
        let off = 1.005;
        assert!((env.amplitude(off, on, off) - 0.5).abs() < EPS);
        let half = env.amplitude(off + env.release / 2.0, on, off);
        assert!((half - 0.25).abs() < EPS);
        assert_eq!(env.amplitude(off + env.release, on, off), 0.0);
    }

    #[test]
    fn small_amplitudes_clamp_to_zero() {
        let env = piano();
        let on = 1.0;
        let off = 2.0;
        // just before the release ends the level is below the threshold
        let t = off + env.release * 0.9999;
        assert_eq!(env.amplitude(t, on, off), 0.0);
    }

    #[test]
    fn zero_durations_stay_finite() {
        let env = Envelope::new(0.0, 0.0, 0.0, 0.0);
        for &(t, on, off) in &[(0.0, 0.0, 0.0), (1.0, 0.5, 0.0), (1.0, 0.5, 0.75)] {
            assert!(env.amplitude(t, on, off).is_finite());
        }
    }

    #[test]
    fn equal_on_and_off_is_treated_as_released() {
        let env = piano();
        // lifetime zero at release, so there is nothing to ramp down from
        assert_eq!(env.amplitude(3.0, 3.0, 3.0), 0.0);
    }
}
