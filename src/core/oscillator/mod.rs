mod envelope;
mod filter;
mod modulation;
mod pitch;
mod waveform;

pub use self::envelope::{Envelope, MIN_DURATION, SILENCE_THRESHOLD};
pub use self::filter::{Filter, LowPassFilter};
pub use self::modulation::{angular_velocity, Lfo};
pub use self::pitch::{
    clamp_scale_position, invert, note_to_scale, scale_to_frequency, scale_to_note, NOTE_NAMES,
    OCTAVE_BASE_FREQUENCY, SCALE_POSITION_LIMIT, STARTING_HALF_STEP,
};
pub use self::waveform::Waveform;

/// Sample a waveform at `time` seconds into the note.
///
/// `fm` bends the carrier phase (vibrato), `am` scales the output (tremolo).
/// Non-positive or non-finite frequencies are silent.
pub fn oscillator(time: f64, hertz: f64, waveform: Waveform, fm: Lfo, am: Lfo) -> f64 {
    if !hertz.is_finite() || hertz <= 0.0 {
        return 0.0;
    }

    let phase = angular_velocity(hertz) * time + fm.phase_offset(time);
    let sample = waveform.sample(phase, time, hertz);

    if waveform.takes_modulation() {
        sample * am.gain(time)
    } else {
        sample
    }
}

/// Shorthand for an unmodulated oscillator.
pub fn plain(time: f64, hertz: f64, waveform: Waveform) -> f64 {
    oscillator(time, hertz, waveform, Lfo::NONE, Lfo::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_starts_at_zero() {
        assert_eq!(plain(0.0, 440.0, Waveform::Sine), 0.0);
    }

    #[test]
    fn square_is_always_full_scale() {
        for step in 0..5000 {
            let t = step as f64 / 44100.0;
            let s = plain(t, 440.0, Waveform::Square);
            assert!(s == 1.0 || s == -1.0, "t = {t}, s = {s}");
        }
    }

    #[test]
    fn modulated_output_is_reproducible() {
        let fm = Lfo::new(1.5, 1.5);
        let am = Lfo::new(0.3, 3.0);
        for wave in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::AnalogSaw,
            Waveform::DigitalSaw,
        ] {
            for step in 0..200 {
                let t = step as f64 * 0.0013;
                let a = oscillator(t, 261.6, wave, fm, am);
                let b = oscillator(t, 261.6, wave, fm, am);
                assert_eq!(a.to_bits(), b.to_bits(), "{wave:?} at {t}");
            }
        }
    }

    #[test]
    fn outputs_stay_near_unit_range() {
        for wave in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::AnalogSaw,
            Waveform::DigitalSaw,
            Waveform::Noise,
        ] {
            for step in 0..2000 {
                let t = step as f64 / 44100.0;
                let s = plain(t, 110.0, wave);
                assert!(s.abs() <= 1.2, "{wave:?} at {t}: {s}");
            }
        }
    }

    #[test]
    fn tremolo_scales_output() {
        let am = Lfo::new(0.5, 4.0);
        let t = 0.0625; // quarter period of the 4 Hz tremolo, gain = 1.0
        let dry = plain(t, 100.0, Waveform::Sine);
        let wet = oscillator(t, 100.0, Waveform::Sine, Lfo::NONE, am);
        assert!((wet - dry * am.gain(t)).abs() < 1e-12);
    }

    #[test]
    fn bad_frequencies_are_silent() {
        for hz in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert_eq!(plain(0.3, hz, Waveform::DigitalSaw), 0.0);
            assert_eq!(plain(0.3, hz, Waveform::Sine), 0.0);
        }
    }
}
