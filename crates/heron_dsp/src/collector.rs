//! Single-Channel Sample Collector
//!
//! Cuts the host's arbitrarily sized audio callbacks into fixed-size blocks
//! for the analyzer.
//!
//! The audio thread may not allocate or free, so blocks are never created on
//! the fly. A fixed pool of buffers circulates between two Fifos:
//!
//! ```text
//!   SampleCollector ──filled──▶ CollectedBlocks (analyzer thread)
//!         ▲                           │
//!         └──────────returned─────────┘
//! ```
//!
//! When no empty buffer is available the completed block is dropped and
//! counted; the next block starts empty either way.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::fifo::{fifo, FifoConsumer, FifoProducer};

type Block = Box<[f32]>;

/// Create a collector pair producing blocks of `block_size` samples
///
/// `capacity` buffers are preallocated here, up front, so the audio side
/// never touches the allocator.
pub fn sample_collector(block_size: usize, capacity: usize) -> (SampleCollector, CollectedBlocks) {
    let block_size = block_size.max(1);
    let capacity = capacity.max(1);

    let (filled_tx, filled_rx) = fifo::<Block>(capacity);
    let (mut returned_tx, returned_rx) = fifo::<Block>(capacity);
    for _ in 0..capacity {
        returned_tx.push(vec![0.0; block_size].into_boxed_slice());
    }

    let dropped = Arc::new(AtomicU64::new(0));

    let collector = SampleCollector {
        fill: vec![0.0; block_size].into_boxed_slice(),
        cursor: 0,
        spare: None,
        filled: filled_tx,
        returned: returned_rx,
        dropped: Arc::clone(&dropped),
    };

    let output = CollectedBlocks {
        filled: filled_rx,
        returned: returned_tx,
        dropped,
        block_size,
    };

    (collector, output)
}

/// Audio-thread side: accumulates samples into blocks
pub struct SampleCollector {
    fill: Block,
    cursor: usize,
    spare: Option<Block>,
    filled: FifoProducer<Block>,
    returned: FifoConsumer<Block>,
    dropped: Arc<AtomicU64>,
}

impl SampleCollector {
    pub fn block_size(&self) -> usize {
        self.fill.len()
    }

    /// Samples currently waiting in the partial block
    pub fn pending(&self) -> usize {
        self.cursor
    }

    /// Append samples, publishing every block that fills up
    ///
    /// # Real-time Safety
    /// No allocations, no locks. O(n) where n = `samples.len()`.
    pub fn update(&mut self, samples: &[f32]) {
        let block_size = self.fill.len();
        let mut remaining = samples;

        while !remaining.is_empty() {
            let n = (block_size - self.cursor).min(remaining.len());
            self.fill[self.cursor..self.cursor + n].copy_from_slice(&remaining[..n]);
            self.cursor += n;
            remaining = &remaining[n..];

            if self.cursor == block_size {
                self.publish();
                self.cursor = 0;
            }
        }
    }

    fn publish(&mut self) {
        match self.spare.take().or_else(|| self.returned.pull()) {
            Some(next) => {
                let full = std::mem::replace(&mut self.fill, next);
                if let Err(full) = self.filled.try_push(full) {
                    self.spare = Some(full);
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Forget the partial block
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Consumer side: completed blocks for the analyzer
pub struct CollectedBlocks {
    filled: FifoConsumer<Block>,
    returned: FifoProducer<Block>,
    dropped: Arc<AtomicU64>,
    block_size: usize,
}

impl CollectedBlocks {
    /// Copy the oldest completed block into `out`
    ///
    /// Returns false, leaving `out` untouched, when nothing is ready. The
    /// buffer goes straight back to the collector's pool.
    pub fn pull(&mut self, out: &mut Vec<f32>) -> bool {
        match self.filled.pull() {
            Some(block) => {
                out.clear();
                out.extend_from_slice(&block);
                // Pool never holds more buffers than the queue has slots
                let _ = self.returned.push(block);
                true
            }
            None => false,
        }
    }

    /// Completed blocks waiting (advisory)
    pub fn num_complete_blocks_available(&self) -> usize {
        self.filled.num_available_for_reading()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Blocks lost because the analyzer fell behind
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
