//! Block-based audio output: the sample source contract, the block ring
//! shared with the hardware, the worker that keeps it full and the sinks
//! that consume it.

mod driver;
mod handoff;
mod output;
mod ring;
mod wav;

pub use self::driver::{AudioDriver, BlockSink};
pub use self::handoff::{BlockPlayer, ChannelSink};
pub use self::output::{list_output_devices, CpalOutput, DeviceSelector};
pub use self::ring::{Block, BlockRing, BlockState};
pub use self::wav::{RenderSummary, WavRenderer};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// Produces one output sample per call. The driver calls it once per sample
/// per channel, in channel order within each frame.
pub trait SampleSource: Send {
    fn next_sample(&mut self, channel: usize, time: f64) -> f64;
}

impl<F> SampleSource for F
where
    F: FnMut(usize, f64) -> f64 + Send,
{
    fn next_sample(&mut self, channel: usize, time: f64) -> f64 {
        self(channel, time)
    }
}

/// Integer or float sample type a block can hold.
pub trait PcmSample: Copy + Send + 'static {
    const SILENCE: Self;

    /// Hard-clip `value` to [-1, 1] and scale it to the full range of the
    /// type. Non-finite input becomes silence.
    fn from_clipped(value: f64) -> Self;
}

fn clip(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

impl PcmSample for i16 {
    const SILENCE: Self = 0;

    fn from_clipped(value: f64) -> Self {
        (clip(value) * f64::from(i16::MAX)) as i16
    }
}

impl PcmSample for i32 {
    const SILENCE: Self = 0;

    fn from_clipped(value: f64) -> Self {
        (clip(value) * f64::from(i32::MAX)) as i32
    }
}

impl PcmSample for f32 {
    const SILENCE: Self = 0.0;

    fn from_clipped(value: f64) -> Self {
        clip(value) as f32
    }
}

/// Everything the output side needs to know about the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Blocks in the ring, at least two.
    pub block_count: usize,
    /// Samples per block across all channels.
    pub block_samples: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            block_count: 8,
            block_samples: 512,
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SynthError::InvalidDeviceConfig(msg));

        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return invalid("at least one channel is required".into());
        }
        if self.block_count < 2 {
            return invalid(format!("need at least 2 blocks, got {}", self.block_count));
        }
        if self.block_samples == 0 || self.block_samples % self.channels as usize != 0 {
            return invalid(format!(
                "block size {} is not a positive multiple of {} channels",
                self.block_samples, self.channels
            ));
        }
        Ok(())
    }

    /// Frames (one sample per channel) in a block.
    pub fn block_frames(&self) -> usize {
        self.block_samples / self.channels as usize
    }

    /// Seconds covered by one frame.
    pub fn time_step(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    /// Seconds covered by one block.
    pub fn block_duration(&self) -> f64 {
        self.block_frames() as f64 * self.time_step()
    }
}

/// Seconds of audio produced so far. Written by the audio worker only,
/// read by the control thread to stamp notes.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    bits: Arc<AtomicU64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    // single writer, so load + store is enough
    pub fn advance(&self, delta: f64) -> f64 {
        let next = self.time() + delta;
        self.set(next);
        next
    }
}

/// Fill `samples` frame by frame from `source`, starting at the clock's
/// current time and advancing it one `time_step` per frame.
pub fn fill_block<S, Src>(
    samples: &mut [S],
    channels: usize,
    source: &mut Src,
    clock: &PlaybackClock,
    time_step: f64,
) where
    S: PcmSample,
    Src: SampleSource + ?Sized,
{
    for frame in samples.chunks_mut(channels) {
        let time = clock.time();
        for (channel, slot) in frame.iter_mut().enumerate() {
            *slot = S::from_clipped(source.next_sample(channel, time));
        }
        clock.advance(time_step);
    }
}
