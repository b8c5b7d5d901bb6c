mod mixer;

pub use mixer::{map_value_reverse, Mixer, MixerSettings};

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::instrument::{InstrumentBank, InstrumentId};
use crate::core::note::Note;

/// Everything the audio thread and the control thread share for one
/// playback session: the sounding notes, the instrument bank and the mood.
///
/// The note list is the only state behind a lock. The mood is a single
/// atomic word so the listener that writes it never blocks the mixer.
pub struct AudioEngine {
    notes: Mutex<Vec<Note>>,
    mood: AtomicI32,
    instruments: InstrumentBank,
}

impl AudioEngine {
    pub fn new(instruments: InstrumentBank, initial_mood: i32) -> Self {
        Self {
            notes: Mutex::new(Vec::new()),
            mood: AtomicI32::new(initial_mood),
            instruments,
        }
    }

    pub fn instruments(&self) -> &InstrumentBank {
        &self.instruments
    }

    pub fn mood(&self) -> i32 {
        self.mood.load(Ordering::Relaxed)
    }

    /// Latest value wins, no queueing.
    pub fn set_mood(&self, mood: i32) {
        self.mood.store(mood, Ordering::Relaxed);
    }

    // A panic elsewhere must not silence the audio thread.
    fn lock_notes(&self) -> MutexGuard<'_, Vec<Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sum every note at `time`, then drop the notes that reported finished.
    /// The order of the remaining notes is preserved.
    pub fn mix(&self, time: f64) -> f64 {
        let mut notes = self.lock_notes();

        let mut mixed = 0.0;
        for note in notes.iter_mut() {
            mixed += note.sound(time, &self.instruments);
        }

        notes.retain(|note| note.is_active);
        mixed
    }

    /// Merge notes staged by the sequencer. Inactive notes are skipped so
    /// everything in the list was active when it went in.
    pub fn add_notes<I>(&self, staged: I) -> usize
    where
        I: IntoIterator<Item = Note>,
    {
        let mut notes = self.lock_notes();
        let before = notes.len();
        notes.extend(staged.into_iter().filter(|note| note.is_active));
        notes.len() - before
    }

    /// A key went down. Starts a note for `instrument` at `scale_position`,
    /// or re-strikes the matching note if it is still fading out.
    pub fn key_down(&self, instrument: InstrumentId, scale_position: i32, now: f64) {
        let mut notes = self.lock_notes();
        match notes
            .iter_mut()
            .find(|n| n.scale_position == scale_position && n.instrument == instrument)
        {
            Some(note) => note.retrigger(now),
            None => notes.push(Note::new(scale_position, now, instrument)),
        }
    }

    /// A key came up. Moves the matching held note into its release.
    pub fn key_up(&self, instrument: InstrumentId, scale_position: i32, now: f64) {
        let mut notes = self.lock_notes();
        if let Some(note) = notes
            .iter_mut()
            .find(|n| n.scale_position == scale_position && n.instrument == instrument)
        {
            note.release(now);
        }
    }

    /// Apply a polled key state.
    pub fn update_key(&self, instrument: InstrumentId, scale_position: i32, held: bool, now: f64) {
        if held {
            self.key_down(instrument, scale_position, now);
        } else {
            self.key_up(instrument, scale_position, now);
        }
    }

    pub fn note_count(&self) -> usize {
        self.lock_notes().len()
    }

    /// Copy of the current note list.
    pub fn notes(&self) -> Vec<Note> {
        self.lock_notes().clone()
    }

    pub fn clear(&self) {
        self.lock_notes().clear();
    }
}
