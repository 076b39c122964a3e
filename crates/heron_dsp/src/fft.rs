//! FFT Spectrum Analyzer
//!
//! Turns fixed-size sample blocks into decibel spectra.
//!
//! # Pipeline
//!
//! ```text
//! block ──▶ sliding mono buffer ──▶ window ──▶ FFT ──▶ |X| / (N/2) ──▶ dB ──▶ spectrum fifo
//! ```
//!
//! The mono buffer always holds exactly `fft_size` samples. Each incoming
//! block shifts it left by the block length and fills the freed tail, so the
//! hop size equals the collector's block size.
//!
//! Runs on the analyzer thread. It allocates one `Vec` per spectrum, which is
//! fine off the audio thread.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::DspError;
use crate::fifo::{fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};

/// Default analyzer floor in dBFS
pub const DEFAULT_FLOOR_DB: f32 = -48.0;

/// Transform size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FftOrder {
    /// 2048 samples at 48kHz = ~42ms window, ~23Hz resolution
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    pub const ALL: [FftOrder; 3] = [FftOrder::Order2048, FftOrder::Order4096, FftOrder::Order8192];

    /// log2 of the transform size
    pub fn order(self) -> u32 {
        match self {
            FftOrder::Order2048 => 11,
            FftOrder::Order4096 => 12,
            FftOrder::Order8192 => 13,
        }
    }

    pub fn size(self) -> usize {
        1 << self.order()
    }

    /// Bins kept per spectrum (positive frequencies only)
    pub fn num_bins(self) -> usize {
        self.size() / 2
    }

    pub fn from_size(size: usize) -> Result<Self, DspError> {
        Self::ALL
            .into_iter()
            .find(|o| o.size() == size)
            .ok_or(DspError::InvalidFftSize(size))
    }

    /// Spacing between bins in Hz
    pub fn bin_width(self, sample_rate: f64) -> f64 {
        sample_rate / self.size() as f64
    }
}

/// 4-term Blackman-Harris, symmetric
fn blackman_harris(n: usize, size: usize) -> f32 {
    const A0: f64 = 0.35875;
    const A1: f64 = 0.48829;
    const A2: f64 = 0.14128;
    const A3: f64 = 0.01168;

    let phase = 2.0 * std::f64::consts::PI * n as f64 / (size - 1) as f64;
    (A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos() - A3 * (3.0 * phase).cos()) as f32
}

/// Linear gain to decibels, never below `floor_db`
///
/// Zero and non-finite gains map to the floor.
#[inline]
pub fn gain_to_db(gain: f32, floor_db: f32) -> f32 {
    if gain > 0.0 && gain.is_finite() {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// Sliding-window FFT producing decibel spectra
pub struct SpectrumAnalyzer {
    order: FftOrder,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    mono: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    floor_db: f32,
    spectra_in: FifoProducer<Vec<f32>>,
    spectra_out: FifoConsumer<Vec<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer with the default spectrum queue capacity
    pub fn new(order: FftOrder, floor_db: f32) -> Self {
        Self::with_capacity(order, floor_db, FIFO_CAPACITY)
    }

    pub fn with_capacity(order: FftOrder, floor_db: f32, capacity: usize) -> Self {
        let size = order.size();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        let (spectra_in, spectra_out) = fifo(capacity);

        Self {
            order,
            fft,
            window: (0..size).map(|i| blackman_harris(i, size)).collect(),
            mono: vec![0.0; size],
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            floor_db,
            spectra_in,
            spectra_out,
        }
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.order.size()
    }

    pub fn num_bins(&self) -> usize {
        self.order.num_bins()
    }

    pub fn floor_db(&self) -> f32 {
        self.floor_db
    }

    /// Current contents of the sliding buffer, oldest sample first
    pub fn mono_buffer(&self) -> &[f32] {
        &self.mono
    }

    /// Shift `block` into the tail of the sliding buffer
    pub fn push_block(&mut self, block: &[f32]) {
        let size = self.mono.len();
        if block.len() >= size {
            self.mono.copy_from_slice(&block[block.len() - size..]);
        } else {
            let n = block.len();
            self.mono.copy_within(n.., 0);
            self.mono[size - n..].copy_from_slice(block);
        }
    }

    /// Transform the sliding buffer and queue the result
    ///
    /// Returns false if the spectrum queue was full and the result dropped.
    pub fn produce(&mut self) -> bool {
        let spectrum = self.transform();
        self.spectra_in.push(spectrum)
    }

    /// Shift in a block and transform in one step
    pub fn produce_from_block(&mut self, block: &[f32]) -> bool {
        self.push_block(block);
        self.produce()
    }

    fn transform(&mut self) -> Vec<f32> {
        for ((out, &sample), &w) in self.buffer.iter_mut().zip(&self.mono).zip(&self.window) {
            *out = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.order.num_bins();
        let norm = num_bins as f32;
        let floor_db = self.floor_db;

        self.buffer[..num_bins]
            .iter()
            .map(|c| {
                let magnitude = c.norm() / norm;
                let magnitude = if magnitude.is_finite() { magnitude } else { 0.0 };
                gain_to_db(magnitude, floor_db)
            })
            .collect()
    }

    /// Take the oldest queued spectrum into `out`
    pub fn pull(&mut self, out: &mut Vec<f32>) -> bool {
        self.spectra_out.pull_into(out)
    }

    /// Spectra waiting (advisory)
    pub fn num_available(&self) -> usize {
        self.spectra_out.num_available_for_reading()
    }

    /// Switch transform size
    ///
    /// Replans the FFT, rebuilds the window and clears the sliding buffer and
    /// any queued spectra of the old size.
    pub fn change_order(&mut self, order: FftOrder) {
        if order == self.order {
            return;
        }
        let capacity = self.spectra_in.capacity();
        *self = Self::with_capacity(order, self.floor_db, capacity);
    }

    /// Zero the sliding buffer and drop queued spectra
    pub fn reset(&mut self) {
        self.mono.fill(0.0);
        self.spectra_out.clear();
    }
}
