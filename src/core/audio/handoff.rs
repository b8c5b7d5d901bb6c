use std::sync::Arc;

use cpal::{FromSample, Sample};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use super::driver::BlockSink;
use super::ring::{Block, BlockRing, BlockState};
use crate::error::{Result, SynthError};

/// Sink that queues blocks on a bounded channel for the playback side.
pub struct ChannelSink<S> {
    tx: Sender<Block<S>>,
}

impl<S: Send> ChannelSink<S> {
    /// A sink and the receiving end a [`BlockPlayer`] reads from. Capacity
    /// should be the ring's block count so a submit never blocks.
    pub fn new(capacity: usize) -> (Self, Receiver<Block<S>>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl<S: Send> BlockSink<S> for ChannelSink<S> {
    fn submit(&mut self, block: Block<S>) -> Result<()> {
        self.tx.send(block).map_err(|_| SynthError::DeviceUnavailable)
    }
}

/// Playback end of the hand-off, driven by the device callback. Copies
/// queued blocks into whatever buffer the device asks for and returns each
/// block to the ring once its last sample has been copied.
pub struct BlockPlayer<S> {
    rx: Receiver<Block<S>>,
    ring: Arc<BlockRing<S>>,
    current: Option<Block<S>>,
    position: usize,
    underruns: u64,
}

impl<S: Copy> BlockPlayer<S> {
    pub fn new(rx: Receiver<Block<S>>, ring: Arc<BlockRing<S>>) -> Self {
        Self {
            rx,
            ring,
            current: None,
            position: 0,
            underruns: 0,
        }
    }

    /// Fill `out` from the queued blocks. Missing data is written as the
    /// output format's equilibrium value.
    pub fn play<T>(&mut self, out: &mut [T])
    where
        T: Sample + FromSample<S>,
    {
        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() && !self.next_block() {
                out[written..].fill(T::EQUILIBRIUM);
                self.underruns += 1;
                return;
            }

            let Some(block) = self.current.as_ref() else {
                break;
            };
            let remaining = &block.samples[self.position..];
            let n = remaining.len().min(out.len() - written);
            for (dst, &src) in out[written..written + n].iter_mut().zip(remaining) {
                *dst = T::from_sample(src);
            }
            written += n;
            self.position += n;

            if self.position >= block.samples.len() {
                self.finish_block();
            }
        }
    }

    fn next_block(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(mut block) => {
                block.state = BlockState::Playing;
                self.current = Some(block);
                self.position = 0;
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    fn finish_block(&mut self) {
        if let Some(block) = self.current.take() {
            self.ring.complete(block);
        }
        self.position = 0;
    }

    /// Callbacks that ran out of queued audio.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}
