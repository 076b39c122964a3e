//! Stereo EQ Processor
//!
//! The audio-thread entry point. Each callback runs the update protocol
//! (snapshot parameters, design coefficients, install them), filters both
//! channels in place, then copies the processed output into the sample
//! collectors feeding the analyzer.
//!
//! # Real-time Safety
//!
//! `process` and `process_interleaved` never allocate, lock or log. Every
//! buffer they touch is created in `prepare`.

use std::sync::Arc;

use heron_dsp::{
    design_chain, sample_collector, ChainSettings, CollectedBlocks, MonoChain, SampleCollector,
};
use tracing::info;

use crate::config::{EngineConfig, StreamConfig, UpdateMode};
use crate::error::{EngineError, EngineResult};
use crate::params::ParameterStore;

/// Channel index of the left chain
pub const LEFT: usize = 0;
/// Channel index of the right chain
pub const RIGHT: usize = 1;

/// Consumer ends of the processor's sample collectors
///
/// Hand these to the analyzer. A new set is created on every `prepare`.
pub struct AnalysisTaps {
    pub left: CollectedBlocks,
    pub right: CollectedBlocks,
    sample_rate: f32,
}

impl AnalysisTaps {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Blocks dropped on either channel because the analyzer fell behind
    pub fn dropped_blocks(&self) -> u64 {
        self.left.dropped_blocks() + self.right.dropped_blocks()
    }

    pub fn into_channels(self) -> [CollectedBlocks; 2] {
        [self.left, self.right]
    }
}

/// Everything that only exists between `prepare` and the next `prepare`
struct Prepared {
    sample_rate: f32,
    max_block_size: usize,
    collectors: [SampleCollector; 2],
    scratch: [Vec<f32>; 2],
}

pub struct EqProcessor {
    params: Arc<ParameterStore>,
    update_mode: UpdateMode,
    fifo_capacity: usize,
    chains: [MonoChain; 2],
    prepared: Option<Prepared>,
    settings: ChainSettings,
    last_generation: Option<u64>,
}

impl EqProcessor {
    pub fn new(params: Arc<ParameterStore>, config: &EngineConfig) -> Self {
        Self {
            params,
            update_mode: config.update_mode,
            fifo_capacity: config.analyzer.fifo_capacity,
            chains: [MonoChain::new(), MonoChain::new()],
            prepared: None,
            settings: ChainSettings::default(),
            last_generation: None,
        }
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Start a session
    ///
    /// Designs every coefficient for the current parameters, clears filter
    /// state and rebuilds the sample collectors with a block size of
    /// `max_block_size`.
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: u32) -> EngineResult<AnalysisTaps> {
        let stream = StreamConfig {
            sample_rate,
            max_block_size,
        };
        stream.validate().map_err(EngineError::ConfigError)?;

        let sample_rate = sample_rate as f32;
        let block_size = max_block_size as usize;

        let (left_collector, left_tap) = sample_collector(block_size, self.fifo_capacity);
        let (right_collector, right_tap) = sample_collector(block_size, self.fifo_capacity);

        self.prepared = Some(Prepared {
            sample_rate,
            max_block_size: block_size,
            collectors: [left_collector, right_collector],
            scratch: [vec![0.0; block_size], vec![0.0; block_size]],
        });

        self.reset();
        self.last_generation = None;
        self.update_filters();

        info!(
            sample_rate,
            max_block_size,
            update_mode = ?self.update_mode,
            "EQ processor prepared"
        );

        Ok(AnalysisTaps {
            left: left_tap,
            right: right_tap,
            sample_rate,
        })
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.prepared.as_ref().map(|p| p.sample_rate)
    }

    pub fn max_block_size(&self) -> Option<usize> {
        self.prepared.as_ref().map(|p| p.max_block_size)
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
        self.last_generation = None;
    }

    /// The chain of `channel` (`LEFT` or `RIGHT`)
    pub fn chain(&self, channel: usize) -> Option<&MonoChain> {
        self.chains.get(channel)
    }

    /// Snapshot the parameters and install fresh coefficients in both chains
    ///
    /// Runs unconditionally in `UpdateMode::Always`; in `OnChange` only when
    /// the store's generation moved. Both modes leave identical coefficients.
    fn update_filters(&mut self) {
        let Some(sample_rate) = self.prepared.as_ref().map(|p| p.sample_rate) else {
            return;
        };

        let generation = self.params.generation();
        if self.update_mode == UpdateMode::OnChange && self.last_generation == Some(generation) {
            return;
        }

        // A writer holding the store keeps the last good snapshot in use;
        // the generation stays unrecorded so OnChange retries next block.
        match self.params.try_chain_settings() {
            Some(settings) => {
                self.settings = settings;
                self.last_generation = Some(generation);
            }
            None if self.update_mode == UpdateMode::OnChange => return,
            None => {}
        }

        let design = design_chain(&self.settings, sample_rate);
        for chain in self.chains.iter_mut() {
            chain.apply(&design);
        }
    }

    /// Process one stereo block in place
    ///
    /// A mono host passes an empty `right`; only the left chain runs then.
    /// Before `prepare` audio passes through untouched.
    ///
    /// # Real-time Safety
    /// No allocations, no locks. O(n) where n = block length.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.prepared.is_none() {
            return;
        }
        self.update_filters();

        let Some(prepared) = self.prepared.as_mut() else {
            return;
        };
        let [left_chain, right_chain] = &mut self.chains;
        let [left_collector, right_collector] = &mut prepared.collectors;

        left_chain.process(left);
        left_collector.update(left);

        if !right.is_empty() {
            right_chain.process(right);
            right_collector.update(right);
        }
    }

    /// Process an interleaved stereo buffer in place
    ///
    /// Deinterleaves through the scratch buffers in chunks of at most
    /// `max_block_size` frames; a trailing odd sample is left untouched.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let Some(chunk_frames) = self.prepared.as_ref().map(|p| p.max_block_size) else {
            return;
        };

        for chunk in buffer.chunks_mut(chunk_frames * 2) {
            let frames = chunk.len() / 2;
            if frames == 0 {
                continue;
            }

            // Take the scratch out so `process` can borrow self mutably
            let Some(prepared) = self.prepared.as_mut() else {
                return;
            };
            let [mut left, mut right] = std::mem::take(&mut prepared.scratch);

            for (i, frame) in chunk.chunks_exact(2).enumerate() {
                left[i] = frame[0];
                right[i] = frame[1];
            }

            self.process(&mut left[..frames], &mut right[..frames]);

            for (i, frame) in chunk.chunks_exact_mut(2).enumerate() {
                frame[0] = left[i];
                frame[1] = right[i];
            }

            if let Some(prepared) = self.prepared.as_mut() {
                prepared.scratch = [left, right];
            }
        }
    }

    /// Flush all filter delay registers and partial collector blocks
    pub fn reset(&mut self) {
        for chain in self.chains.iter_mut() {
            chain.reset();
        }
        if let Some(prepared) = self.prepared.as_mut() {
            for collector in prepared.collectors.iter_mut() {
                collector.reset();
            }
        }
    }
}
