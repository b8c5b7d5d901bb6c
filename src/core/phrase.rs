//! Generative phrases: a rhythm that fits the bar and a melodic line that
//! walks the key, merged into a sequencer pattern.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::sequencer::{REST, STEPS_PER_BAR};

/// Marks a note start in a beat sequence.
pub const HIT: char = 'x';

/// Rhythmic building blocks: a hit followed by its rests. A whole-bar note
/// is left out on purpose, it only fits a single-note phrase which is
/// special-cased.
pub const FRAGMENTS: [&str; 4] = ["x.......", "x...", "x.", "x"];

/// Key whose rule tables drive the note walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Key {
    #[default]
    AMinor,
    AMajor,
}

impl Key {
    pub const ALL: [Key; 2] = [Key::AMinor, Key::AMajor];

    pub fn name(&self) -> &'static str {
        match self {
            Key::AMinor => "a-minor",
            Key::AMajor => "a-major",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Note a third above.
    pub fn third(self, note: char) -> Option<char> {
        let next = match (self, note) {
            (Key::AMinor, 'A') => 'C',
            (Key::AMinor, 'B') => 'D',
            (Key::AMinor, 'C') => 'E',
            (Key::AMinor, 'D') => 'F',
            (Key::AMinor, 'E') => 'G',
            (Key::AMinor, 'F') => 'A',
            (Key::AMinor, 'G') => 'B',
            (Key::AMajor, 'A') => 'c',
            (Key::AMajor, 'B') => 'D',
            (Key::AMajor, 'c') => 'E',
            (Key::AMajor, 'D') => 'f',
            (Key::AMajor, 'E') => 'g',
            (Key::AMajor, 'f') => 'A',
            (Key::AMajor, 'g') => 'B',
            _ => return None,
        };
        Some(next)
    }

    /// Resolution of an unstable note to its neighbour.
    pub fn resolve(self, note: char) -> Option<char> {
        let next = match (self, note) {
            (Key::AMinor, 'B') | (Key::AMinor, 'D') => 'C',
            (Key::AMinor, 'F') => 'E',
            (Key::AMinor, 'G') => 'A',
            (Key::AMajor, 'B') | (Key::AMajor, 'D') => 'c',
            (Key::AMajor, 'f') => 'E',
            (Key::AMajor, 'g') => 'A',
            _ => return None,
        };
        Some(next)
    }

    /// Notes that want to resolve.
    pub fn is_active(self, note: char) -> bool {
        self.resolve(note).is_some()
    }
}

/// First combination of `fragments` (in the given order, each fragment
/// reusable, never picking an earlier fragment after a later one) that
/// fills exactly [`STEPS_PER_BAR`] steps with exactly `count` hits.
pub fn find_sequence(fragments: &[&str], count: usize) -> Option<String> {
    let mut stack: Vec<usize> = Vec::new();
    let mut len = 0;
    let mut next = 0;

    loop {
        let mut extended = false;

        if len < STEPS_PER_BAR && stack.len() < count {
            if let Some(i) = (next..fragments.len())
                .find(|&i| len + fragments[i].len() <= STEPS_PER_BAR)
            {
                stack.push(i);
                len += fragments[i].len();
                if len == STEPS_PER_BAR && stack.len() == count {
                    return Some(stack.iter().map(|&i| fragments[i]).collect());
                }
                next = i;
                extended = true;
            }
        }

        if !extended {
            let i = stack.pop()?;
            len -= fragments[i].len();
            next = i + 1;
        }
    }
}

/// A bar-long rhythm with `count` hits, or `None` when no combination of
/// fragments fits. The fragment order is shuffled first, so repeated calls
/// give different rhythms for the same count.
pub fn beat_sequence<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Option<String> {
    match count {
        1 => return Some("x...............".to_string()),
        2 => return Some("x.......x.......".to_string()),
        STEPS_PER_BAR => return Some(HIT.to_string().repeat(STEPS_PER_BAR)),
        _ => {}
    }

    let mut fragments = FRAGMENTS;
    fragments.shuffle(rng);
    find_sequence(&fragments, count)
}

/// Next note after `previous`: one time in ten it repeats, an unstable
/// note resolves half of the time, otherwise the line climbs a third. A
/// note outside the key repeats.
pub fn next_note<R: Rng + ?Sized>(key: Key, previous: char, rng: &mut R) -> char {
    let roll = rng.random_range(0..10);

    if roll < 1 {
        return previous;
    }
    if roll < 6 {
        if let Some(resolved) = key.resolve(previous) {
            return resolved;
        }
    }
    key.third(previous).unwrap_or(previous)
}

/// `count` notes starting at `first`.
pub fn generate_notes<R: Rng + ?Sized>(key: Key, first: char, count: usize, rng: &mut R) -> String {
    let mut notes = String::with_capacity(count);
    let mut previous = first;

    for i in 0..count {
        let note = if i == 0 {
            first
        } else {
            next_note(key, previous, rng)
        };
        notes.push(note);
        previous = note;
    }
    notes
}

/// A full bar: a rhythm with `count` hits whose hits are filled with a note
/// line starting at `first`. `None` if no rhythm fits `count`.
pub fn new_phrase<R: Rng + ?Sized>(
    key: Key,
    count: usize,
    first: char,
    rng: &mut R,
) -> Option<String> {
    let notes = generate_notes(key, first, count, rng);
    let beats = beat_sequence(count, rng)?;

    let mut line = notes.chars();
    let phrase = beats
        .chars()
        .map(|beat| match beat {
            HIT => line.next().unwrap_or(REST),
            other => other,
        })
        .collect();

    Some(phrase)
}
