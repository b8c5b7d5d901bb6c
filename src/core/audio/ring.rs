use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::PcmSample;

/// Where a block is in its trip between the worker and the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Filling,
    Queued,
    Playing,
}

/// A fixed run of interleaved samples. Ownership of the block moves with it
/// through the ring, so only one side can touch its samples at a time.
#[derive(Debug)]
pub struct Block<S> {
    index: usize,
    pub state: BlockState,
    pub samples: Box<[S]>,
}

impl<S> Block<S> {
    pub fn index(&self) -> usize {
        self.index
    }
}

struct RingState<S> {
    free: VecDeque<Block<S>>,
    shutdown: bool,
}

/// The set of blocks shared by the filling worker and the hardware
/// completion path. Free blocks wait in a queue in the order they came back,
/// which for a device that plays in order is plain round-robin.
pub struct BlockRing<S> {
    state: Mutex<RingState<S>>,
    freed: Condvar,
    block_count: usize,
    block_samples: usize,
}

impl<S: PcmSample> BlockRing<S> {
    /// Allocate `block_count` silent blocks of `block_samples` samples each,
    /// all starting free.
    pub fn new(block_count: usize, block_samples: usize) -> Self {
        let free = (0..block_count)
            .map(|index| Block {
                index,
                state: BlockState::Free,
                samples: vec![S::SILENCE; block_samples].into_boxed_slice(),
            })
            .collect();

        Self {
            state: Mutex::new(RingState {
                free,
                shutdown: false,
            }),
            freed: Condvar::new(),
            block_count,
            block_samples,
        }
    }
}

impl<S> BlockRing<S> {
    fn lock(&self) -> MutexGuard<'_, RingState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for a free block and claim it for filling. Returns `None` once
    /// the ring is shut down.
    pub fn acquire(&self) -> Option<Block<S>> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(mut block) = state.free.pop_front() {
                block.state = BlockState::Filling;
                return Some(block);
            }
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Hand a block back once the hardware is done with it.
    pub fn complete(&self, mut block: Block<S>) {
        block.state = BlockState::Free;
        self.lock().free.push_back(block);
        self.freed.notify_one();
    }

    /// Wake every waiter and refuse further acquires.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if !state.shutdown {
            debug!("block ring shutting down");
            state.shutdown = true;
        }
        drop(state);
        self.freed.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shutdown
    }

    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn block_samples(&self) -> usize {
        self.block_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn blocks_come_round_in_order() {
        let ring = BlockRing::<i16>::new(3, 4);
        assert_eq!(ring.free_count(), 3);

        let mut seen = Vec::new();
        for _ in 0..6 {
            let block = ring.acquire().unwrap();
            assert_eq!(block.state, BlockState::Filling);
            assert_eq!(block.samples.len(), 4);
            seen.push(block.index());
            ring.complete(block);
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn acquire_waits_for_completion() {
        let ring = Arc::new(BlockRing::<i16>::new(2, 4));
        let a = ring.acquire().unwrap();
        let b = ring.acquire().unwrap();
        assert_eq!(ring.free_count(), 0);

        let waiter = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.acquire().map(|block| block.index()))
        };

        thread::sleep(Duration::from_millis(20));
        ring.complete(b);
        assert_eq!(waiter.join().unwrap(), Some(1));
        drop(a);
    }

    #[test]
    fn shutdown_releases_a_blocked_worker() {
        let ring = Arc::new(BlockRing::<f32>::new(2, 2));
        let _held = (ring.acquire().unwrap(), ring.acquire().unwrap());

        let waiter = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.acquire().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        ring.shutdown();
        assert!(waiter.join().unwrap());
        assert!(ring.is_shut_down());
    }
}
