use serde::{Deserialize, Serialize};

use crate::core::oscillator::{
    clamp_scale_position, invert, oscillator, plain, scale_to_frequency, Envelope, Lfo, Waveform,
    STARTING_HALF_STEP,
};

/// The fixed set of voices the synthesizer knows about. Each kind owns a
/// preset (envelope, modulation, volume) and a partial table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Sustaining voice played from the computer keyboard.
    Keys,
    Bell,
    Bell8,
    Harmonica,
    Kick,
    Snare,
    HiHat,
    /// Short plucked lead driven by generated phrases.
    Lead,
    LeadInverted,
    LeadDiminished,
    Chord,
    ChordDiminished,
    ChordInverted,
    ChordBass,
    ChordBassInverted,
}

/// Static configuration for one instrument kind.
pub(crate) struct Preset {
    pub volume: f64,
    pub envelope: Envelope,
    pub fm: Lfo,
    pub am: Lfo,
    pub one_shot: bool,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 15] = [
        InstrumentKind::Keys,
        InstrumentKind::Bell,
        InstrumentKind::Bell8,
        InstrumentKind::Harmonica,
        InstrumentKind::Kick,
        InstrumentKind::Snare,
        InstrumentKind::HiHat,
        InstrumentKind::Lead,
        InstrumentKind::LeadInverted,
        InstrumentKind::LeadDiminished,
        InstrumentKind::Chord,
        InstrumentKind::ChordDiminished,
        InstrumentKind::ChordInverted,
        InstrumentKind::ChordBass,
        InstrumentKind::ChordBassInverted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InstrumentKind::Keys => "keys",
            InstrumentKind::Bell => "bell",
            InstrumentKind::Bell8 => "bell8",
            InstrumentKind::Harmonica => "harmonica",
            InstrumentKind::Kick => "kick",
            InstrumentKind::Snare => "snare",
            InstrumentKind::HiHat => "hihat",
            InstrumentKind::Lead => "lead",
            InstrumentKind::LeadInverted => "lead-inverted",
            InstrumentKind::LeadDiminished => "lead-diminished",
            InstrumentKind::Chord => "chord",
            InstrumentKind::ChordDiminished => "chord-diminished",
            InstrumentKind::ChordInverted => "chord-inverted",
            InstrumentKind::ChordBass => "chord-bass",
            InstrumentKind::ChordBassInverted => "chord-bass-inverted",
        }
    }

    pub(crate) fn preset(&self) -> Preset {
        use InstrumentKind::*;

        match self {
            Keys => Preset {
                volume: 0.5,
                envelope: Envelope::new(0.01, 0.1, 0.65, 0.1),
                fm: Lfo::new(1.5, 1.5),
                am: Lfo::new(0.3, 3.0),
                one_shot: false,
            },
            Bell => Preset {
                volume: 1.0,
                envelope: Envelope::new(0.01, 1.0, 0.0, 1.0),
                fm: Lfo::new(5.0, 0.001),
                am: Lfo::NONE,
                one_shot: false,
            },
            Bell8 => Preset {
                volume: 1.0,
                envelope: Envelope::new(0.01, 0.5, 0.8, 1.0),
                fm: Lfo::new(5.0, 0.001),
                am: Lfo::NONE,
                one_shot: false,
            },
            Harmonica => Preset {
                volume: 0.3,
                envelope: Envelope::new(0.05, 1.0, 0.95, 0.1),
                fm: Lfo::new(5.0, 0.001),
                am: Lfo::NONE,
                one_shot: false,
            },
            Kick => Preset {
                volume: 0.5,
                envelope: Envelope::new(0.001, 0.5, 0.0, 0.0),
                fm: Lfo::NONE,
                am: Lfo::NONE,
                one_shot: true,
            },
            Snare => Preset {
                volume: 0.05,
                envelope: Envelope::new(0.01, 0.6, 0.0, 0.0),
                fm: Lfo::new(0.5, 1.0),
                am: Lfo::NONE,
                one_shot: true,
            },
            HiHat => Preset {
                volume: 0.02,
                envelope: Envelope::new(0.01, 0.05, 0.0, 0.0),
                fm: Lfo::new(1.5, 1.0),
                am: Lfo::NONE,
                one_shot: true,
            },
            Lead | LeadInverted | LeadDiminished => Preset {
                volume: 1.3,
                envelope: Envelope::new(0.01, 0.5, 0.0, 0.0),
                fm: Lfo::new(1.5, 1.5),
                am: Lfo::new(0.3, 3.0),
                one_shot: true,
            },
            Chord | ChordDiminished | ChordInverted => Preset {
                volume: 0.5,
                envelope: Envelope::new(0.01, 1.1, 0.0, 0.0),
                fm: Lfo::new(1.0, 1.0),
                am: Lfo::new(0.5, 4.0),
                one_shot: true,
            },
            ChordBass | ChordBassInverted => Preset {
                volume: 0.3,
                envelope: Envelope::new(0.01, 2.0, 0.0, 0.0),
                fm: Lfo::new(0.8, 0.8),
                am: Lfo::NONE,
                one_shot: true,
            },
        }
    }

    /// Unscaled mix of this kind's partials, `life_time` seconds into a note
    /// at `pos`.
    pub(crate) fn voice(&self, life_time: f64, pos: i32, fm: Lfo, am: Lfo) -> f64 {
        use InstrumentKind::*;
        use Waveform::*;

        let t = life_time;
        let pos = clamp_scale_position(pos);
        let f = scale_to_frequency;
        let osc = |hz: f64, wave: Waveform, fm: Lfo, am: Lfo| oscillator(t, hz, wave, fm, am);
        let none = Lfo::NONE;

        match self {
            Keys => {
                2.0 * osc(f(pos - 24), Sine, fm, am)
                    + 0.5 * osc(f(pos + 24), Sine, fm, am)
                    + 0.5 * osc(f(pos), Sine, fm, am)
            }
            Bell => {
                osc(f(pos + 12), Sine, fm, none)
                    + 0.5 * plain(t, f(pos + 24), Sine)
                    + 0.25 * plain(t, f(pos + 36), Sine)
            }
            Bell8 => {
                osc(f(pos), Square, fm, none)
                    + 0.5 * plain(t, f(pos + 12), Sine)
                    + 0.25 * plain(t, f(pos + 24), Sine)
            }
            Harmonica => {
                osc(f(pos - 12), AnalogSaw, fm, none)
                    + osc(f(pos), Square, fm, none)
                    + 0.5 * plain(t, f(pos + 12), Square)
                    + 0.25 * plain(t, f(0), Noise)
            }
            Kick => {
                // fixed pitch at C1, the pattern letter is ignored
                let root = f(-STARTING_HALF_STEP + 12);
                osc(root, Sine, fm, am)
                    + 0.8 * osc(2.0 * root, Sine, fm, am)
                    + 0.01 * plain(t, f(0), Noise)
            }
            Snare => 0.5 * osc(f(pos - 24), Sine, fm, none) + 0.5 * plain(t, f(0), Noise),
            HiHat => 0.1 * osc(f(pos - 12), Square, fm, none) + 0.9 * plain(t, f(0), Noise),
            Lead => lead_voicing(pos, &osc, fm, am),
            LeadInverted => lead_voicing(invert(pos), &osc, fm, am),
            LeadDiminished => {
                let lowered = match pos {
                    7 | 8 | 10 => pos - 1,
                    _ => pos,
                };
                lead_voicing(invert(lowered), &osc, fm, am)
            }
            Chord => {
                let root = pos - 12;
                [0, 7, 12, 15, 19]
                    .iter()
                    .map(|step| osc(f(root + step), Sine, fm, none))
                    .sum::<f64>()
            }
            ChordDiminished => {
                let root = pos - 12;
                [0, 6, 12, 15, 18]
                    .iter()
                    .map(|step| osc(f(root + step), Sine, fm, none))
                    .sum::<f64>()
            }
            ChordInverted => {
                osc(f(invert(pos) - 12), Sine, fm, none)
                    + osc(f(invert(pos + 7) - 12), Sine, fm, none)
                    + osc(f(invert(pos)), Sine, fm, none)
                    + osc(f(invert(pos + 3)), Sine, fm, none)
                    + osc(f(invert(pos + 7)), Sine, fm, none)
            }
            ChordBass => bass_voicing(pos - 24, &osc, fm, am),
            ChordBassInverted => bass_voicing(invert(pos) - 24, &osc, fm, am),
        }
    }
}

fn lead_voicing<F>(pos: i32, osc: &F, fm: Lfo, am: Lfo) -> f64
where
    F: Fn(f64, Waveform, Lfo, Lfo) -> f64,
{
    let f = scale_to_frequency;
    osc(f(pos - 24), Waveform::Sine, fm, am)
        + 0.5 * osc(f(pos + 24), Waveform::Sine, fm, am)
        + 0.5 * osc(f(pos), Waveform::Sine, fm, am)
}

fn bass_voicing<F>(root: i32, osc: &F, fm: Lfo, am: Lfo) -> f64
where
    F: Fn(f64, Waveform, Lfo, Lfo) -> f64,
{
    let f = scale_to_frequency;
    let none = Lfo::NONE;
    osc(f(root), Waveform::Sine, fm, am)
        + 0.5 * osc(f(root + 12), Waveform::Sine, fm, am)
        + 0.2 * osc(3.0 * f(root), Waveform::Sine, none, none)
        + 0.05 * osc(5.0 * f(root), Waveform::Sine, none, none)
}
