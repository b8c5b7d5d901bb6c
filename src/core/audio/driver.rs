use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use super::ring::{Block, BlockRing, BlockState};
use super::{fill_block, DeviceConfig, PcmSample, PlaybackClock, SampleSource};
use crate::error::{Result, SynthError};

/// Where filled blocks go. The sink owns the block until it hands it back
/// to the ring through [`BlockRing::complete`].
pub trait BlockSink<S>: Send {
    fn submit(&mut self, block: Block<S>) -> Result<()>;
}

/// Background worker that keeps the ring's free blocks filled from a
/// [`SampleSource`] and pushes them to a [`BlockSink`].
pub struct AudioDriver<S> {
    ring: Arc<BlockRing<S>>,
    clock: PlaybackClock,
    handle: Option<JoinHandle<()>>,
}

impl<S: PcmSample> AudioDriver<S> {
    /// Spawn the worker. It runs until [`stop`](Self::stop), until the
    /// driver is dropped, or until the sink refuses a block.
    pub fn start<Src, K>(
        config: &DeviceConfig,
        ring: Arc<BlockRing<S>>,
        source: Src,
        sink: K,
        clock: PlaybackClock,
    ) -> Result<Self>
    where
        Src: SampleSource + 'static,
        K: BlockSink<S> + 'static,
    {
        config.validate()?;
        if ring.block_samples() != config.block_samples {
            return Err(SynthError::InvalidDeviceConfig(format!(
                "ring blocks hold {} samples, config expects {}",
                ring.block_samples(),
                config.block_samples
            )));
        }
        if ring.block_count() != config.block_count {
            return Err(SynthError::InvalidDeviceConfig(format!(
                "ring has {} blocks, config expects {}",
                ring.block_count(),
                config.block_count
            )));
        }

        let worker = Worker {
            ring: Arc::clone(&ring),
            source,
            sink,
            clock: clock.clone(),
            channels: config.channels as usize,
            time_step: config.time_step(),
        };

        let handle = thread::Builder::new()
            .name("moodsynth-audio".into())
            .spawn(move || worker.run())
            .map_err(|e| SynthError::DeviceOpen(format!("failed to spawn audio worker: {e}")))?;

        info!(
            "audio driver started: {} Hz, {} channel(s), {} blocks of {} samples",
            config.sample_rate, config.channels, config.block_count, config.block_samples
        );

        Ok(Self {
            ring,
            clock,
            handle: Some(handle),
        })
    }

    /// Seconds of audio produced so far.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Shut the ring down and wait for the worker to exit.
    pub fn stop(&mut self) {
        self.ring.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("audio worker panicked");
            }
            debug!("audio driver joined");
        }
    }
}

impl<S> Drop for AudioDriver<S> {
    fn drop(&mut self) {
        self.ring.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("audio worker panicked");
            }
        }
    }
}

struct Worker<S, Src, K> {
    ring: Arc<BlockRing<S>>,
    source: Src,
    sink: K,
    clock: PlaybackClock,
    channels: usize,
    time_step: f64,
}

impl<S, Src, K> Worker<S, Src, K>
where
    S: PcmSample,
    Src: SampleSource,
    K: BlockSink<S>,
{
    fn run(mut self) {
        debug!("audio worker running");
        let mut cursor = 0usize;
        let mut submitted = 0u64;

        while let Some(mut block) = self.ring.acquire() {
            fill_block(
                &mut block.samples,
                self.channels,
                &mut self.source,
                &self.clock,
                self.time_step,
            );

            // never hand the device a block after shutdown was requested
            if self.ring.is_shut_down() {
                self.ring.complete(block);
                break;
            }

            if block.index() != cursor {
                debug!("block {} returned out of order, expected {cursor}", block.index());
            }
            cursor = (block.index() + 1) % self.ring.block_count();

            block.state = BlockState::Queued;
            if let Err(err) = self.sink.submit(block) {
                error!("audio sink rejected a block: {err}");
                self.ring.shutdown();
                break;
            }
            submitted += 1;
        }

        info!(
            "audio worker stopped after {submitted} blocks at t={:.3}s",
            self.clock.time()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Sender};
    use std::time::Duration;

    /// Sink that plays instantly: records the block and hands it straight back.
    struct EchoSink {
        ring: Arc<BlockRing<i16>>,
        seen: Sender<(usize, i16, BlockState)>,
    }

    impl BlockSink<i16> for EchoSink {
        fn submit(&mut self, block: Block<i16>) -> Result<()> {
            let _ = self.seen.send((block.index(), block.samples[0], block.state));
            self.ring.complete(block);
            Ok(())
        }
    }

    struct RefusingSink;

    impl BlockSink<i16> for RefusingSink {
        fn submit(&mut self, _block: Block<i16>) -> Result<()> {
            Err(SynthError::DeviceUnavailable)
        }
    }

    fn config() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 1000,
            channels: 1,
            block_count: 2,
            block_samples: 10,
        }
    }

    #[test]
    fn worker_fills_and_submits_round_robin() {
        let config = config();
        let ring = Arc::new(BlockRing::new(config.block_count, config.block_samples));
        let (tx, rx) = unbounded();
        let sink = EchoSink {
            ring: Arc::clone(&ring),
            seen: tx,
        };

        let source = |_channel: usize, _time: f64| 0.5;
        let mut driver =
            AudioDriver::start(&config, Arc::clone(&ring), source, sink, PlaybackClock::new())
                .unwrap();

        let mut indices = Vec::new();
        for _ in 0..6 {
            let (index, first, state) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(first, i16::from_clipped(0.5));
            assert_eq!(state, BlockState::Queued);
            indices.push(index);
        }
        assert_eq!(indices, vec![0, 1, 0, 1, 0, 1]);

        driver.stop();
        assert!(!driver.is_running());
        // 10 frames per block at 1 kHz
        assert!(driver.time() >= 0.06 - 1e-9);
    }

    #[test]
    fn refused_block_stops_the_worker() {
        let config = config();
        let ring = Arc::new(BlockRing::new(config.block_count, config.block_samples));
        let source = |_channel: usize, _time: f64| 0.0;
        let mut driver =
            AudioDriver::start(&config, Arc::clone(&ring), source, RefusingSink, PlaybackClock::new())
                .unwrap();

        for _ in 0..200 {
            if !driver.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!driver.is_running());
        assert!(ring.is_shut_down());
        driver.stop();
    }

    #[test]
    fn mismatched_ring_is_rejected() {
        let config = config();
        let ring = Arc::new(BlockRing::<i16>::new(2, 7));
        let source = |_channel: usize, _time: f64| 0.0;
        let result = AudioDriver::start(&config, ring, source, RefusingSink, PlaybackClock::new());
        assert!(matches!(result, Err(SynthError::InvalidDeviceConfig(_))));
    }

    #[test]
    fn ring_with_the_wrong_block_count_is_rejected() {
        let config = config();
        for blocks in [1, 3] {
            let ring = Arc::new(BlockRing::<i16>::new(blocks, config.block_samples));
            let source = |_channel: usize, _time: f64| 0.0;
            let result =
                AudioDriver::start(&config, ring, source, RefusingSink, PlaybackClock::new());
            assert!(
                matches!(result, Err(SynthError::InvalidDeviceConfig(_))),
                "{blocks} blocks"
            );
        }
    }
}
