/// C0 in an equal-tempered scale with A4 = 440 Hz.
pub const OCTAVE_BASE_FREQUENCY: f64 = 16.35;

/// Half steps from C0 to scale position 0 (A3).
pub const STARTING_HALF_STEP: i32 = 45;

/// Scale positions further than this from A3 are held at the limit. Far
/// beyond hearing either way, and small enough that partial offsets never
/// overflow.
pub const SCALE_POSITION_LIMIT: i32 = 128;

/// Note letters as they appear in beat patterns. Lowercase letters are the
/// sharp of the preceding uppercase note.
pub const NOTE_NAMES: [char; 12] = ['A', 'a', 'B', 'C', 'c', 'D', 'd', 'E', 'F', 'f', 'G', 'g'];

/// Convert a scale position (semitones from A3) to a frequency in Hz.
pub fn scale_to_frequency(scale_position: i32) -> f64 {
    let half_steps = f64::from(scale_position.saturating_add(STARTING_HALF_STEP));
    OCTAVE_BASE_FREQUENCY * 2.0f64.powf(half_steps / 12.0)
}

/// Hold `scale_position` to [`SCALE_POSITION_LIMIT`] either side of A3.
pub fn clamp_scale_position(scale_position: i32) -> i32 {
    scale_position.clamp(-SCALE_POSITION_LIMIT, SCALE_POSITION_LIMIT)
}

/// Negative-harmony reflection of a pitch class, used by the inverted and
/// diminished voicings.
pub fn invert(scale_position: i32) -> i32 {
    let pitch_class = scale_position % 12;
    (13 - pitch_class) % 12
}

/// Look up the scale position for a pattern letter.
pub fn note_to_scale(note: char) -> Option<i32> {
    NOTE_NAMES.iter().position(|&n| n == note).map(|p| p as i32)
}

/// Pattern letter for a pitch class. Negative positions wrap into the octave.
pub fn scale_to_note(scale_position: i32) -> char {
    NOTE_NAMES[scale_position.rem_euclid(12) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_zero_is_a3() {
        assert!((scale_to_frequency(0) - 220.0).abs() < 0.1);
        assert!((scale_to_frequency(12) - 440.0).abs() < 0.2);
    }

    #[test]
    fn octave_doubles_frequency() {
        for pos in [-24, -5, 0, 7, 19] {
            let ratio = scale_to_frequency(pos + 12) / scale_to_frequency(pos);
            assert!((ratio - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn invert_is_an_involution_on_pitch_classes() {
        for x in -40..40 {
            let twice = invert(invert(x) % 12) % 12;
            assert_eq!(twice, x.rem_euclid(12), "x = {x}");
        }
    }

    #[test]
    fn invert_known_values() {
        assert_eq!(invert(0), 1);
        assert_eq!(invert(1), 0);
        assert_eq!(invert(7), 6);
        assert_eq!(invert(12), 1);
    }

    #[test]
    fn note_table_round_trips() {
        for (i, &name) in NOTE_NAMES.iter().enumerate() {
            assert_eq!(note_to_scale(name), Some(i as i32));
            assert_eq!(scale_to_note(i as i32), name);
        }
        assert_eq!(note_to_scale('x'), None);
        assert_eq!(note_to_scale('.'), None);
    }

    #[test]
    fn extreme_positions_stay_finite() {
        for pos in [-SCALE_POSITION_LIMIT, SCALE_POSITION_LIMIT] {
            let hz = scale_to_frequency(pos);
            assert!(hz.is_finite() && hz > 0.0, "pos {pos} -> {hz}");
        }
        // out at the i32 ends the frequency saturates instead of panicking
        assert_eq!(scale_to_frequency(i32::MIN), 0.0);
        assert_eq!(scale_to_frequency(i32::MAX), f64::INFINITY);
        assert_eq!(clamp_scale_position(i32::MAX), SCALE_POSITION_LIMIT);
        assert_eq!(clamp_scale_position(i32::MIN), -SCALE_POSITION_LIMIT);
        assert_eq!(clamp_scale_position(-7), -7);
    }
}
