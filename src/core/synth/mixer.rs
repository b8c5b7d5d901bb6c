use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use super::AudioEngine;
use crate::core::audio::SampleSource;
use crate::core::oscillator::{Filter, LowPassFilter};

/// How the mood drives the output filter and how loud the result is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub master_volume: f64,
    /// Sample interval handed to the filter on every sample.
    pub filter_sample_interval: f64,
    /// Mood at which the cutoff bottoms out.
    pub mood_max: f64,
    /// Mood at which the cutoff is widest.
    pub mood_min: f64,
    pub cutoff_max: f64,
    pub cutoff_min: f64,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.1,
            filter_sample_interval: 0.1,
            mood_max: 90.0,
            mood_min: 10.0,
            cutoff_max: 3.0,
            cutoff_min: 0.0,
        }
    }
}

/// Reversed linear map: `min1` lands on `max2 + min2` and `max1` on zero.
/// With `min2 = 0` this is the plain `[min1, max1] -> [max2, 0]` mapping.
/// Values outside the input range extrapolate. A degenerate input range is
/// treated as sitting at `min1`.
pub fn map_value_reverse(value: f64, max1: f64, min1: f64, max2: f64, min2: f64) -> f64 {
    let span = max1 - min1;
    let fraction = if span == 0.0 { 0.0 } else { (value - min1) / span };
    max2 - ((fraction * (max2 + min2)) - min2)
}

/// The per-sample output stage: sums the engine's notes, runs them through
/// a low-pass filter whose cutoff follows the mood, and scales to master
/// volume.
pub struct Mixer {
    engine: Arc<AudioEngine>,
    filter: LowPassFilter,
    settings: MixerSettings,
}

impl Mixer {
    pub fn new(engine: Arc<AudioEngine>, settings: MixerSettings) -> Self {
        Self {
            engine,
            filter: LowPassFilter::default(),
            settings,
        }
    }

    pub fn engine(&self) -> &Arc<AudioEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Filter cutoff for the given mood. The mood is held to the configured
    /// range and the cutoff never goes negative, which keeps the filter
    /// coefficient inside [0, 1).
    pub fn cutoff(&self, mood: i32) -> f64 {
        let s = &self.settings;
        let (low, high) = if s.mood_min <= s.mood_max {
            (s.mood_min, s.mood_max)
        } else {
            (s.mood_max, s.mood_min)
        };
        let mood = f64::from(mood).clamp(low, high);
        let cutoff = map_value_reverse(mood, s.mood_max, s.mood_min, s.cutoff_max, s.cutoff_min);
        if cutoff.is_finite() {
            cutoff.max(0.0)
        } else {
            0.0
        }
    }

    /// Produce the next output sample at `time`.
    pub fn render(&mut self, time: f64) -> f64 {
        let mut mixed = self.engine.mix(time);
        if !mixed.is_finite() {
            mixed = 0.0;
        }

        let cutoff = self.cutoff(self.engine.mood());
        self.filter
            .set_presets(self.settings.filter_sample_interval, cutoff);
        if !self.filter.process(mixed).is_finite() {
            warn!("mixer filter diverged, resetting");
            self.filter.reset();
        }

        self.filter.output() * self.settings.master_volume
    }
}

impl SampleSource for Mixer {
    // Mono engine: every channel of a frame gets its own call.
    fn next_sample(&mut self, _channel: usize, time: f64) -> f64 {
        self.render(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::{InstrumentBank, InstrumentKind};
    use crate::core::note::Note;

    fn mixer() -> Mixer {
        let engine = Arc::new(AudioEngine::new(InstrumentBank::standard(), 10));
        Mixer::new(engine, MixerSettings::default())
    }

    #[test]
    fn reverse_mapping_endpoints() {
        assert_eq!(map_value_reverse(90.0, 90.0, 10.0, 3.0, 0.0), 0.0);
        assert_eq!(map_value_reverse(10.0, 90.0, 10.0, 3.0, 0.0), 3.0);
        assert!((map_value_reverse(50.0, 90.0, 10.0, 3.0, 0.0) - 1.5).abs() < 1e-12);
        assert_eq!(map_value_reverse(5.0, 7.0, 7.0, 3.0, 0.0), 3.0);
        // a non-zero floor shifts both ends
        assert!((map_value_reverse(10.0, 90.0, 10.0, 3.0, 1.0) - 4.0).abs() < 1e-12);
        assert!(map_value_reverse(90.0, 90.0, 10.0, 3.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn silence_in_silence_out() {
        let mut mixer = mixer();
        for i in 0..64 {
            assert_eq!(mixer.render(i as f64 / 44100.0), 0.0);
        }
    }

    #[test]
    fn mood_ninety_passes_the_mix_straight_through() {
        let mut mixer = mixer();
        mixer.engine().set_mood(90);
        assert_eq!(mixer.cutoff(90), 0.0);

        let reference = AudioEngine::new(InstrumentBank::standard(), 90);
        let keys = reference.instruments().find(InstrumentKind::Keys).unwrap();
        reference.add_notes([Note::new(0, 1.0, keys)]);
        mixer.engine().add_notes([Note::new(0, 1.0, keys)]);

        // zero cutoff gives a zero coefficient: output = input * master
        let mut heard = false;
        for i in 1..2000 {
            let t = 1.0 + i as f64 / 44100.0;
            let expected = reference.mix(t) * 0.1;
            heard |= expected != 0.0;
            assert!((mixer.render(t) - expected).abs() < 1e-12);
        }
        assert!(heard);
    }

    #[test]
    fn output_is_filtered_and_scaled() {
        let mut mixer = mixer();
        let keys = mixer.engine().instruments().find(InstrumentKind::Keys).unwrap();
        mixer.engine().add_notes([Note::new(0, 1.0, keys)]);

        let mut peak: f64 = 0.0;
        for i in 1..4410 {
            let sample = mixer.render(1.0 + i as f64 / 44100.0);
            assert!(sample.is_finite());
            peak = peak.max(sample.abs());
        }
        assert!(peak > 0.0);
        // keys peak well under 3.0 raw, times 0.5 volume, times 0.1 master
        assert!(peak < 0.3);
    }

    #[test]
    fn mood_outside_the_range_is_held_to_its_ends() {
        let mixer = mixer();
        assert_eq!(mixer.cutoff(200), mixer.cutoff(90));
        assert_eq!(mixer.cutoff(200), 0.0);
        assert_eq!(mixer.cutoff(-500), mixer.cutoff(10));
        assert_eq!(mixer.cutoff(i32::MIN), 3.0);
        assert_eq!(mixer.cutoff(i32::MAX), 0.0);
    }

    #[test]
    fn extreme_mood_keeps_the_output_finite() {
        let mut mixer = mixer();
        let keys = mixer.engine().instruments().find(InstrumentKind::Keys).unwrap();
        mixer.engine().add_notes([Note::new(0, 1.0, keys)]);

        mixer.engine().set_mood(200);
        for i in 1..2000 {
            let sample = mixer.render(1.0 + i as f64 / 44100.0);
            assert!(sample.is_finite(), "sample {i} at mood 200");
        }

        mixer.engine().set_mood(50);
        let mut peak: f64 = 0.0;
        for i in 2000..6000 {
            let sample = mixer.render(1.0 + i as f64 / 44100.0);
            assert!(sample.is_finite(), "sample {i} at mood 50");
            peak = peak.max(sample.abs());
        }
        assert!(peak > 0.0);
    }

    #[test]
    fn inverted_settings_still_give_a_usable_cutoff() {
        let engine = Arc::new(AudioEngine::new(InstrumentBank::standard(), 10));
        let settings = MixerSettings {
            cutoff_min: -10.0,
            ..MixerSettings::default()
        };
        let mixer = Mixer::new(engine, settings);
        for mood in [-100, 10, 50, 90, 1000] {
            assert!(mixer.cutoff(mood) >= 0.0);
        }
    }
}
