mod bank;
mod kind;

pub use self::bank::{InstrumentBank, InstrumentId};
pub use self::kind::InstrumentKind;

use crate::core::oscillator::{Envelope, Lfo};

/// An immutable voice configuration shared by every note that plays it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub volume: f64,
    pub envelope: Envelope,
    /// Vibrato applied to the carrier partials.
    pub fm: Lfo,
    /// Tremolo applied to the carrier partials.
    pub am: Lfo,
    /// One-shot instruments stop after this many seconds regardless of key
    /// state.
    pub max_life_time: Option<f64>,
}

impl Instrument {
    pub fn new(kind: InstrumentKind) -> Self {
        let preset = kind.preset();
        let max_life_time = preset
            .one_shot
            .then(|| preset.envelope.attack + preset.envelope.decay);

        Self {
            kind,
            volume: preset.volume,
            envelope: preset.envelope,
            fm: preset.fm,
            am: preset.am,
            max_life_time,
        }
    }

    /// Sample for a note at `time`. Returns the sample and whether the note
    /// has finished and can be dropped.
    pub fn sound(&self, time: f64, time_on: f64, time_off: f64, scale_position: i32) -> (f64, bool) {
        if let Some(max_life_time) = self.max_life_time {
            if time - time_on >= max_life_time {
                return (0.0, true);
            }
        }

        let amplitude = self.envelope.amplitude(time, time_on, time_off);

        if self.max_life_time.is_none() && amplitude <= 0.0 {
            // silence during attack is not the end of the note
            return (0.0, time_off > time_on);
        }

        let life_time = time - time_on;
        let voice = self.kind.voice(life_time, scale_position, self.fm, self.am);
        (amplitude * voice * self.volume, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shots_derive_max_life_time_from_envelope() {
        let kick = Instrument::new(InstrumentKind::Kick);
        assert_eq!(kick.max_life_time, Some(0.001 + 0.5));

        let keys = Instrument::new(InstrumentKind::Keys);
        assert_eq!(keys.max_life_time, None);
    }

    #[test]
    fn held_note_survives_silent_attack_start() {
        let keys = Instrument::new(InstrumentKind::Keys);
        // amplitude is exactly zero at the first instant of the attack
        let (sample, finished) = keys.sound(1.0, 1.0, 0.0, 0);
        assert_eq!(sample, 0.0);
        assert!(!finished);

        for step in 1..200 {
            let t = 1.0 + step as f64 * 0.001;
            let (_, finished) = keys.sound(t, 1.0, 0.0, 0);
            assert!(!finished, "finished while held at {t}");
        }
    }

    #[test]
    fn released_note_finishes_after_release() {
        let keys = Instrument::new(InstrumentKind::Keys);
        let on = 1.0;
        let off = 2.0;
        let (_, finished) = keys.sound(off + 0.05, on, off, 3);
        assert!(!finished);
        let (sample, finished) = keys.sound(off + keys.envelope.release + 0.001, on, off, 3);
        assert!(finished);
        assert_eq!(sample, 0.0);
    }

    #[test]
    fn one_shot_finishes_at_max_life_time_even_when_held() {
        for kind in [
            InstrumentKind::Kick,
            InstrumentKind::Snare,
            InstrumentKind::HiHat,
            InstrumentKind::Lead,
            InstrumentKind::Chord,
            InstrumentKind::ChordBassInverted,
        ] {
            let inst = Instrument::new(kind);
            let max = inst.max_life_time.unwrap();

            // switched on at zero so that time - on is exactly max
            let (_, finished) = inst.sound(max * 0.5, 0.0, -1.0, 0);
            assert!(!finished, "{kind:?} finished early");
            let (sample, finished) = inst.sound(max, 0.0, -1.0, 0);
            assert!(finished, "{kind:?} still playing at max life time");
            assert_eq!(sample, 0.0);

            let on = 4.0;
            let (_, finished) = inst.sound(on + max * 0.5, on, 0.0, 0);
            assert!(!finished, "{kind:?} finished early");
            let (_, finished) = inst.sound(on + max + 1e-9, on, 0.0, 0);
            assert!(finished, "{kind:?} still playing past max life time");
        }
    }

    #[test]
    fn one_shot_ignores_key_release() {
        let kick = Instrument::new(InstrumentKind::Kick);
        let on = 1.0;
        // released almost immediately, but the one-shot keeps sounding
        let (_, finished) = kick.sound(1.2, on, 1.0001, 0);
        assert!(!finished);
    }

    #[test]
    fn every_kind_produces_finite_samples() {
        for kind in InstrumentKind::ALL {
            let inst = Instrument::new(kind);
            for step in 0..400 {
                let t = 10.0 + step as f64 * 0.0025;
                for pos in [-13, 0, 5, 11, 23] {
                    let (sample, _) = inst.sound(t, 10.0, 0.0, pos);
                    assert!(sample.is_finite(), "{kind:?} at {t} pos {pos}");
                }
            }
        }
    }

    #[test]
    fn extreme_scale_positions_do_not_overflow() {
        for kind in InstrumentKind::ALL {
            let inst = Instrument::new(kind);
            for pos in [i32::MIN, i32::MIN + 1, i32::MAX - 1, i32::MAX] {
                let (sample, _) = inst.sound(1.5, 1.0, 0.0, pos);
                assert!(sample.is_finite(), "{kind:?} pos {pos}");
            }
        }
    }
}
