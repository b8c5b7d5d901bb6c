use std::fmt;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::Receiver;
use log::{error, info, warn};

use super::handoff::{BlockPlayer, ChannelSink};
use super::ring::{Block, BlockRing};
use super::DeviceConfig;
use crate::error::{Result, SynthError};

/// Names of the output devices the default host can see, in host order.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| SynthError::DeviceOpen(e.to_string()))?;

    Ok(devices
        .map(|device| device.name().unwrap_or_else(|_| "<unnamed>".to_string()))
        .collect())
}

/// Which output device to open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    #[default]
    Default,
    Index(usize),
    Name(String),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Default => f.write_str("default output"),
            DeviceSelector::Index(i) => write!(f, "output #{i}"),
            DeviceSelector::Name(name) => write!(f, "output {name:?}"),
        }
    }
}

fn select_device(host: &cpal::Host, selector: &DeviceSelector) -> Result<cpal::Device> {
    let not_found = || SynthError::DeviceNotFound(selector.to_string());

    match selector {
        DeviceSelector::Default => host.default_output_device().ok_or_else(not_found),
        DeviceSelector::Index(index) => host
            .output_devices()
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?
            .nth(*index)
            .ok_or_else(not_found),
        DeviceSelector::Name(name) => host
            .output_devices()
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?
            .find(|device| device.name().map(|n| n == *name).unwrap_or(false))
            .ok_or_else(not_found),
    }
}

/// An open, playing hardware stream fed from a [`BlockRing`].
///
/// The stream stops when this value is dropped. `cpal::Stream` is not `Send`
/// on every platform, so keep it on the thread that opened it.
pub struct CpalOutput {
    stream: Stream,
    device_name: String,
}

impl CpalOutput {
    /// Open the selected device with `config` and start playback. Blocks
    /// submitted to the returned sink are played in order and handed back
    /// to `ring` when done.
    pub fn open(
        selector: &DeviceSelector,
        config: &DeviceConfig,
        ring: Arc<BlockRing<i16>>,
    ) -> Result<(Self, ChannelSink<i16>)> {
        config.validate()?;

        let host = cpal::default_host();
        let device = select_device(&host, selector)?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let sample_format = device
            .default_output_config()
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?
            .sample_format();

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sink, rx) = ChannelSink::new(config.block_count);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, rx, ring)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, rx, ring)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, rx, ring)?,
            other => {
                return Err(SynthError::UnsupportedSampleFormat(format!("{other:?}")));
            }
        };

        stream
            .play()
            .map_err(|e| SynthError::DeviceOpen(e.to_string()))?;

        info!(
            "opened {device_name} ({sample_format:?}, {} Hz, {} channel(s))",
            config.sample_rate, config.channels
        );

        Ok((
            Self {
                stream,
                device_name,
            },
            sink,
        ))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn pause(&self) {
        if let Err(e) = self.stream.pause() {
            warn!("failed to pause {}: {e}", self.device_name);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    rx: Receiver<Block<i16>>,
    ring: Arc<BlockRing<i16>>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<i16> + Send + 'static,
{
    let mut player = BlockPlayer::new(rx, ring);
    let err_fn = |err: cpal::StreamError| error!("an error occurred on the audio stream: {err}");

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| player.play(data),
            err_fn,
            None,
        )
        .map_err(|e| SynthError::DeviceOpen(e.to_string()))
}
