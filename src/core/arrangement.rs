//! What the band plays from bar to bar: the drum groove, the twelve-bar
//! chord roots, and the lead phrase asked for at every measure boundary.

use std::sync::Arc;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::instrument::{InstrumentBank, InstrumentId, InstrumentKind};
use crate::core::phrase::{new_phrase, Key};
use crate::core::sequencer::{BeatPattern, MeasureCallback, Sequencer, REST};
use crate::core::synth::AudioEngine;
use crate::error::Result;

/// Chord roots of a twelve-bar blues in A.
pub const TWELVE_BAR_BLUES: [char; 12] = ['A', 'D', 'A', 'A', 'D', 'D', 'A', 'A', 'E', 'D', 'A', 'E'];

/// Which chord colour a bar is played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordChange {
    #[default]
    Normal,
    Inverted,
    Diminished,
}

/// One bar's worth of direction for the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseCommand {
    pub first_note: char,
    pub note_count: usize,
    pub change: ChordChange,
}

impl PhraseCommand {
    pub const fn new(first_note: char, note_count: usize, change: ChordChange) -> Self {
        Self {
            first_note,
            note_count,
            change,
        }
    }
}

/// Decides the next bar from the current mood. Called on the control
/// thread at each measure boundary.
pub trait PhraseSource: Send {
    fn next_phrase(&mut self, mood: i32, bar: usize) -> PhraseCommand;
}

/// Replays a fixed list of commands, looping at the end.
#[derive(Debug, Clone)]
pub struct ScriptedPhrases {
    commands: Vec<PhraseCommand>,
    cursor: usize,
}

impl ScriptedPhrases {
    pub fn new(commands: Vec<PhraseCommand>) -> Self {
        Self {
            commands,
            cursor: 0,
        }
    }

    /// Two passes over the blues: the first colours two bars inverted, the
    /// second mixes in diminished bars.
    pub fn blues() -> Self {
        use ChordChange::*;

        let c = PhraseCommand::new;
        Self::new(vec![
            c('A', 2, Normal),
            c('D', 3, Normal),
            c('A', 3, Normal),
            c('A', 4, Inverted),
            c('D', 4, Normal),
            c('D', 5, Normal),
            c('A', 5, Inverted),
            c('A', 6, Normal),
            c('E', 6, Normal),
            c('D', 5, Normal),
            c('A', 5, Normal),
            c('E', 3, Normal),
            c('A', 2, Normal),
            c('D', 3, Normal),
            c('A', 3, Diminished),
            c('A', 4, Normal),
            c('D', 4, Normal),
            c('D', 5, Diminished),
            c('A', 5, Normal),
            c('A', 6, Normal),
            c('E', 6, Normal),
            c('D', 5, Inverted),
            c('A', 5, Normal),
            c('E', 3, Normal),
        ])
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl PhraseSource for ScriptedPhrases {
    fn next_phrase(&mut self, _mood: i32, _bar: usize) -> PhraseCommand {
        let Some(&command) = self.commands.get(self.cursor) else {
            return PhraseCommand::new('A', 1, ChordChange::Normal);
        };
        self.cursor = (self.cursor + 1) % self.commands.len();
        command
    }
}

/// Chord, bass and lead instruments for one chord colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voicing {
    pub chord: InstrumentId,
    pub bass: InstrumentId,
    pub lead: InstrumentId,
}

/// Refreshes the harmony channels at the end of every measure.
pub struct Arrangement {
    normal: Voicing,
    inverted: Voicing,
    diminished: Voicing,
    source: Box<dyn PhraseSource>,
    key: Key,
    rng: StdRng,
    bar: usize,
    history: Vec<(i32, ChordChange)>,
}

impl Arrangement {
    pub fn new(bank: &InstrumentBank, source: Box<dyn PhraseSource>) -> Result<Self> {
        Self::with_rng(bank, source, StdRng::from_os_rng())
    }

    /// Same as [`new`](Self::new) with a caller-provided generator, for
    /// reproducible phrases.
    pub fn with_rng(bank: &InstrumentBank, source: Box<dyn PhraseSource>, rng: StdRng) -> Result<Self> {
        use InstrumentKind::*;

        Ok(Self {
            normal: Voicing {
                chord: bank.require(Chord)?,
                bass: bank.require(ChordBass)?,
                lead: bank.require(Lead)?,
            },
            inverted: Voicing {
                chord: bank.require(ChordInverted)?,
                bass: bank.require(ChordBassInverted)?,
                lead: bank.require(LeadInverted)?,
            },
            // diminished bars share the plain bass
            diminished: Voicing {
                chord: bank.require(ChordDiminished)?,
                bass: bank.require(ChordBass)?,
                lead: bank.require(LeadDiminished)?,
            },
            source,
            key: Key::AMinor,
            rng,
            bar: 0,
            history: Vec::new(),
        })
    }

    pub fn voicing(&self, change: ChordChange) -> Voicing {
        match change {
            ChordChange::Normal => self.normal,
            ChordChange::Inverted => self.inverted,
            ChordChange::Diminished => self.diminished,
        }
    }

    /// Every instrument the arrangement writes to.
    pub fn harmony_instruments(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = [self.normal, self.inverted, self.diminished]
            .iter()
            .flat_map(|v| [v.chord, v.bass, v.lead])
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Index into [`TWELVE_BAR_BLUES`] of the next bar.
    pub fn bar(&self) -> usize {
        self.bar
    }

    /// Key the lead phrases are written in.
    pub fn key(&self) -> Key {
        self.key
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    /// Mood and chord colour of every bar refreshed so far.
    pub fn history(&self) -> &[(i32, ChordChange)] {
        &self.history
    }

    /// Silence every harmony channel, then program the next bar: the chord
    /// root on the first step for chord and bass, and a generated lead
    /// phrase, all on the instruments for the chosen chord colour.
    pub fn refresh(&mut self, sequencer: &mut Sequencer, mood: i32) -> Result<PhraseCommand> {
        let steps = sequencer.total_beats();
        for id in self.harmony_instruments() {
            sequencer.set_pattern(id, BeatPattern::silent(steps));
        }

        let root = TWELVE_BAR_BLUES[self.bar];
        let chord_bar: String = std::iter::once(root)
            .chain(std::iter::repeat(REST).take(steps.saturating_sub(1)))
            .collect();

        let command = self.source.next_phrase(mood, self.bar);
        let voicing = self.voicing(command.change);

        sequencer.play_bar(voicing.chord, &chord_bar)?;
        sequencer.play_bar(voicing.bass, &chord_bar)?;

        match new_phrase(self.key, command.note_count, command.first_note, &mut self.rng) {
            Some(phrase) => {
                if let Err(e) = sequencer.play_bar(voicing.lead, &phrase) {
                    warn!("lead phrase rejected, bar {} stays silent: {e}", self.bar);
                } else {
                    debug!("bar {}: {root} {:?} lead {phrase}", self.bar, command.change);
                }
            }
            None => warn!(
                "no rhythm fits {} notes, lead rests in bar {}",
                command.note_count, self.bar
            ),
        }

        self.history.push((mood, command.change));
        self.bar = (self.bar + 1) % TWELVE_BAR_BLUES.len();
        Ok(command)
    }

    /// Turn the arrangement into a measure callback that reads the mood from
    /// `engine` each time it fires.
    pub fn into_callback(mut self, engine: Arc<AudioEngine>) -> MeasureCallback {
        Box::new(move |sequencer: &mut Sequencer| {
            if let Err(e) = self.refresh(sequencer, engine.mood()) {
                warn!("measure refresh failed: {e}");
            }
        })
    }
}

/// Drum parts for kick, snare and hi-hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrumGroove {
    #[default]
    Backbeat,
    ImpeachThePresident,
    IconicEights,
    FourOnTheFloor,
    TwoBeat,
    BoomBap,
}

impl DrumGroove {
    pub const ALL: [DrumGroove; 6] = [
        DrumGroove::Backbeat,
        DrumGroove::ImpeachThePresident,
        DrumGroove::IconicEights,
        DrumGroove::FourOnTheFloor,
        DrumGroove::TwoBeat,
        DrumGroove::BoomBap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DrumGroove::Backbeat => "backbeat",
            DrumGroove::ImpeachThePresident => "impeach",
            DrumGroove::IconicEights => "eights",
            DrumGroove::FourOnTheFloor => "four-on-the-floor",
            DrumGroove::TwoBeat => "two-beat",
            DrumGroove::BoomBap => "boom-bap",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }

    /// Kick, snare and hi-hat bars.
    pub fn patterns(&self) -> [(InstrumentKind, &'static str); 3] {
        use InstrumentKind::{HiHat, Kick, Snare};

        let (kick, snare, hihat) = match self {
            DrumGroove::Backbeat => ("A...A...A...A...", "....A.......A...", "A.A.A.A.A.A.A.A."),
            DrumGroove::ImpeachThePresident => {
                ("A......AA.A...A.", "....A.......A...", "A.A.A.AAA...A.A.")
            }
            DrumGroove::IconicEights => ("A.........A.....", "....A.......A...", "A.A.A.A.A.A.A.A."),
            DrumGroove::FourOnTheFloor => {
                ("A.........A.....", "....A.......A...", "..A...A...A...A.")
            }
            DrumGroove::TwoBeat => ("A.........A.....", "....A.......A...", "A...A...A...A..."),
            DrumGroove::BoomBap => ("AA......AA.A....", "....A..A....A..A", "A.A.A.A.A.A.A.A."),
        };
        [(Kick, kick), (Snare, snare), (HiHat, hihat)]
    }

    /// Program the groove on `sequencer`.
    pub fn apply(&self, sequencer: &mut Sequencer, bank: &InstrumentBank) -> Result<()> {
        // snare, kick, hi-hat
        let [kick, snare, hihat] = self.patterns();
        for (kind, pattern) in [snare, kick, hihat] {
            sequencer.play_bar(bank.require(kind)?, pattern)?;
        }
        Ok(())
    }
}
