//! Heron DSP - Digital Signal Processing Module
//!
//! This crate provides the signal path for Heron EQ, including:
//! - Three-band parametric EQ (peak or shelf) between two Butterworth cut filters
//! - 12/24/36/48 dB/octave cut slopes built from cascaded biquad sections
//! - Lock-free SPSC Fifos for handing data between threads
//! - Sample collection and FFT spectrum analysis for visualization
//! - Response curve and spectrum path generation in pixel space
//!
//! # Architecture
//!
//! Nothing here spawns threads or logs. The processing path follows a strict
//! "no allocation in audio callback" rule: coefficients are designed into
//! plain `Copy` values and swapped into each stage on the thread that owns
//! the chain, and analysis data leaves the audio thread only through Fifos.

mod chain;
mod collector;
mod curve;
mod cut;
mod design;
mod error;
mod fft;
mod fifo;
mod path;
mod settings;
mod stage;

pub use chain::{ChainPosition, MonoChain};
pub use collector::{sample_collector, CollectedBlocks, SampleCollector};
pub use curve::{response_curve, response_magnitudes, CURVE_RANGE_DB};
pub use cut::CutFilter;
pub use design::{
    band_coefficients, butterworth_q, coefficient_bits, cut_coefficients, design_chain,
    magnitude_for_frequency, BandDesign, ChainDesign, CutDesign, CutKind, IDENTITY,
    MAX_CUT_STAGES,
};
pub use error::DspError;
pub use fft::{gain_to_db, FftOrder, SpectrumAnalyzer, DEFAULT_FLOOR_DB};
pub use fifo::{fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};
pub use path::{
    jmap, map_from_log10, map_to_log10, spectrum_path, PathBounds, PathGenerator, Point,
    SpectrumPath, DEFAULT_PATH_RESOLUTION,
};
pub use settings::{
    max_frequency, BandSettings, BandType, ChainSettings, CutSettings, Slope, MAX_FREQUENCY,
    MAX_GAIN_DB, MAX_QUALITY, MIN_FREQUENCY, MIN_QUALITY, NUM_BANDS,
};
pub use stage::{AudioStage, FilterStage};

/// Re-exported so callers can name coefficient values without depending on biquad
pub use biquad::Coefficients;
