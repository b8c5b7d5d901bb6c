use std::io::{Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;

use super::{fill_block, DeviceConfig, PcmSample, PlaybackClock};
use crate::core::sequencer::Sequencer;
use crate::core::synth::Mixer;
use crate::error::Result;

/// What an offline render produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub blocks: u64,
    pub frames: u64,
    /// Notes the sequencer started during the render.
    pub notes: usize,
    pub seconds: f64,
}

/// Runs the sequencer and mixer through the same block fill path as the
/// live driver, without a device, and writes 16-bit PCM.
///
/// The sequencer advances one block at a time, so note starts are quantised
/// to block boundaries just like in live playback.
pub struct WavRenderer {
    config: DeviceConfig,
}

impl WavRenderer {
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    pub fn render_to_file(
        &self,
        path: impl AsRef<Path>,
        seconds: f64,
        sequencer: &mut Sequencer,
        mixer: &mut Mixer,
        clock: &PlaybackClock,
    ) -> Result<RenderSummary> {
        let path = path.as_ref();
        let writer = WavWriter::create(path, self.spec())?;
        let summary = self.write_blocks(writer, seconds, sequencer, mixer, clock)?;
        info!(
            "rendered {:.2}s ({} notes) to {}",
            summary.seconds,
            summary.notes,
            path.display()
        );
        Ok(summary)
    }

    /// Render into any seekable writer.
    pub fn render<W>(
        &self,
        writer: W,
        seconds: f64,
        sequencer: &mut Sequencer,
        mixer: &mut Mixer,
        clock: &PlaybackClock,
    ) -> Result<RenderSummary>
    where
        W: Write + Seek,
    {
        let writer = WavWriter::new(writer, self.spec())?;
        self.write_blocks(writer, seconds, sequencer, mixer, clock)
    }

    fn write_blocks<W>(
        &self,
        mut writer: WavWriter<W>,
        seconds: f64,
        sequencer: &mut Sequencer,
        mixer: &mut Mixer,
        clock: &PlaybackClock,
    ) -> Result<RenderSummary>
    where
        W: Write + Seek,
    {
        let block_duration = self.config.block_duration();
        let blocks = if seconds > 0.0 {
            (seconds / block_duration).ceil() as u64
        } else {
            0
        };

        let channels = self.config.channels as usize;
        let time_step = self.config.time_step();
        let mut buffer = vec![i16::SILENCE; self.config.block_samples];
        let mut notes = 0;

        for _ in 0..blocks {
            sequencer.update(block_duration, clock.time());
            notes += mixer.engine().add_notes(sequencer.drain_notes());

            fill_block(&mut buffer, channels, mixer, clock, time_step);
            for &sample in &buffer {
                writer.write_sample(sample)?;
            }
        }

        writer.finalize()?;

        let frames = blocks * self.config.block_frames() as u64;
        Ok(RenderSummary {
            blocks,
            frames,
            notes,
            seconds: frames as f64 * time_step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::{InstrumentBank, InstrumentKind};
    use crate::core::synth::{AudioEngine, MixerSettings};
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn renders_whole_blocks_of_pcm() {
        let engine = Arc::new(AudioEngine::new(InstrumentBank::standard(), 10));
        let kick = engine.instruments().find(InstrumentKind::Kick).unwrap();
        let mut mixer = Mixer::new(Arc::clone(&engine), MixerSettings::default());
        let mut sequencer = Sequencer::with_tempo(120.0).unwrap();
        sequencer.play_bar(kick, "A...A...A...A...").unwrap();

        let renderer = WavRenderer::new(DeviceConfig::default()).unwrap();
        let clock = PlaybackClock::new();
        let mut bytes = Cursor::new(Vec::new());
        let summary = renderer
            .render(&mut bytes, 1.0, &mut sequencer, &mut mixer, &clock)
            .unwrap();

        // 1s at 44.1 kHz rounds up to 87 blocks of 512
        assert_eq!(summary.blocks, 87);
        assert_eq!(summary.frames, 87 * 512);
        // steps 0 and 4 are crossed inside the first second
        assert!(summary.notes >= 2);

        bytes.set_position(0);
        let reader = hound::WavReader::new(bytes).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.len() as u64, summary.frames);
        let peak = reader
            .into_samples::<i16>()
            .map(|s| s.unwrap().unsigned_abs())
            .max()
            .unwrap();
        assert!(peak > 0);
    }
}
