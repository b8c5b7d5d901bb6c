//! Step sequencer that turns bar patterns into note-on events on a beat clock.

mod pattern;

pub use self::pattern::{BeatPattern, REST, STEPS_PER_BAR};

use std::vec::Drain;

use log::debug;

use crate::core::instrument::InstrumentId;
use crate::core::note::Note;
use crate::error::{Result, SynthError};

/// Called every time the beat index wraps back to the start of the bar.
/// Receives the sequencer so it can reprogram the channels for the next bar.
pub type MeasureCallback = Box<dyn FnMut(&mut Sequencer) + Send>;

/// One instrument and the bar it plays.
#[derive(Debug, Clone)]
pub struct Channel {
    pub instrument: InstrumentId,
    pub pattern: BeatPattern,
}

pub struct Sequencer {
    beat_time: f64,
    accumulate: f64,
    current_beat: usize,
    total_beats: usize,
    channels: Vec<Channel>,
    notes: Vec<Note>,
    on_measure_end: Option<MeasureCallback>,
}

impl Sequencer {
    /// A sequencer at `tempo` BPM with `beats` beats per bar, each split into
    /// `sub_beats` steps.
    pub fn new(tempo: f64, beats: usize, sub_beats: usize) -> Result<Self> {
        let invalid = || SynthError::InvalidTempo {
            tempo,
            steps: beats.saturating_mul(sub_beats),
        };

        let total_beats = beats.checked_mul(sub_beats).ok_or_else(invalid)?;
        if !tempo.is_finite() || tempo <= 0.0 || total_beats == 0 {
            return Err(invalid());
        }

        let beat_time = (60.0 / tempo) / sub_beats as f64;
        if !beat_time.is_normal() {
            return Err(invalid());
        }

        Ok(Self {
            beat_time,
            accumulate: 0.0,
            current_beat: 0,
            total_beats,
            channels: Vec::new(),
            notes: Vec::new(),
            on_measure_end: None,
        })
    }

    /// Four beats of sixteenth notes.
    pub fn with_tempo(tempo: f64) -> Result<Self> {
        Self::new(tempo, 4, 4)
    }

    pub fn set_measure_callback(&mut self, callback: MeasureCallback) {
        self.on_measure_end = Some(callback);
    }

    /// Advance the beat clock by `delta_time` seconds and stage a note for
    /// every channel that hits on each beat crossed. `now` stamps the new
    /// notes. Returns the number of notes staged by this call. A negative or
    /// non-finite `delta_time` does not move the clock.
    pub fn update(&mut self, delta_time: f64, now: f64) -> usize {
        self.notes.clear();

        if !delta_time.is_finite() || delta_time < 0.0 {
            debug!("sequencer: ignoring time step {delta_time}");
            return 0;
        }

        self.accumulate += delta_time;
        while self.accumulate >= self.beat_time {
            for channel in &self.channels {
                if let Some(position) = channel.pattern.step(self.current_beat) {
                    self.notes.push(Note::new(position, now, channel.instrument));
                }
            }

            self.accumulate -= self.beat_time;
            self.current_beat = (self.current_beat + 1) % self.total_beats;

            if self.current_beat == 0 {
                self.end_measure();
            }
        }

        self.notes.len()
    }

    fn end_measure(&mut self) {
        // Taken out for the call so the callback can borrow the sequencer.
        if let Some(mut callback) = self.on_measure_end.take() {
            callback(self);
            if self.on_measure_end.is_none() {
                self.on_measure_end = Some(callback);
            }
        }
    }

    /// Program `instrument` to play `pattern` from the next beat on. Replaces
    /// the bar of an existing channel for that instrument or adds a channel.
    /// A malformed pattern is rejected and leaves every channel unchanged.
    pub fn play_bar(&mut self, instrument: InstrumentId, pattern: &str) -> Result<()> {
        let pattern = BeatPattern::parse(pattern, self.total_beats)?;
        self.set_pattern(instrument, pattern);
        Ok(())
    }

    /// Same as [`play_bar`](Self::play_bar) for an already parsed pattern.
    pub fn set_pattern(&mut self, instrument: InstrumentId, pattern: BeatPattern) {
        match self.channels.iter_mut().find(|c| c.instrument == instrument) {
            Some(channel) => channel.pattern = pattern,
            None => {
                debug!("sequencer: new channel for instrument {instrument}");
                self.channels.push(Channel {
                    instrument,
                    pattern,
                });
            }
        }
    }

    /// Notes staged by the last [`update`](Self::update).
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Hand the staged notes over to the caller.
    pub fn drain_notes(&mut self) -> Drain<'_, Note> {
        self.notes.drain(..)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, instrument: InstrumentId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.instrument == instrument)
    }

    pub fn current_beat(&self) -> usize {
        self.current_beat
    }

    pub fn total_beats(&self) -> usize {
        self.total_beats
    }

    /// Duration of one step in seconds.
    pub fn beat_time(&self) -> f64 {
        self.beat_time
    }
}
