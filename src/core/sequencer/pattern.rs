use std::fmt;
use std::str::FromStr;

use crate::core::oscillator::note_to_scale;
use crate::error::{Result, SynthError};

/// Steps in one bar of four quarter notes split into sixteenths.
pub const STEPS_PER_BAR: usize = 16;

/// Rest marker in a pattern string.
pub const REST: char = '.';

/// A validated bar: one optional scale position per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatPattern {
    text: String,
    steps: Vec<Option<i32>>,
}

impl BeatPattern {
    /// Parse a pattern with exactly `steps` characters. Each character is
    /// either `.` or a note letter from the note table.
    pub fn parse(text: &str, steps: usize) -> Result<Self> {
        let invalid = |reason: String| SynthError::InvalidPattern {
            pattern: text.to_string(),
            reason,
        };

        let len = text.chars().count();
        if len != steps {
            return Err(invalid(format!("expected {steps} steps, got {len}")));
        }

        let steps = text
            .chars()
            .enumerate()
            .map(|(i, c)| match c {
                REST => Ok(None),
                _ => note_to_scale(c)
                    .map(Some)
                    .ok_or_else(|| invalid(format!("unknown note {c:?} at step {i}"))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            text: text.to_string(),
            steps,
        })
    }

    /// A bar of rests.
    pub fn silent(steps: usize) -> Self {
        Self {
            text: REST.to_string().repeat(steps),
            steps: vec![None; steps],
        }
    }

    pub fn step(&self, index: usize) -> Option<i32> {
        self.steps.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of steps that trigger a note.
    pub fn hits(&self) -> usize {
        self.steps.iter().filter(|s| s.is_some()).count()
    }
}

impl FromStr for BeatPattern {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, STEPS_PER_BAR)
    }
}

impl fmt::Display for BeatPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
