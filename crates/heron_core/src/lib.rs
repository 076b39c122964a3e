//! Heron Core - EQ Engine
//!
//! This crate provides the engine surface around the Heron DSP chain:
//! - Named, range-checked parameters in a lock-free store
//! - Stereo processor with the per-block coefficient update protocol
//! - Timer-driven analyzer thread producing spectrum paths per channel
//! - Response curve monitor for the UI timer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │  ParameterStore::set ──▶ atomics ◀── CurveMonitor::poll     │
//! │  AnalyzerHandle ──commands──▶ (crossbeam-channel)           │
//! └─────────────────────────────────────────────────────────────┘
//!            │ atomics                          ▲ paths (rtrb)
//!            ▼                                  │
//! ┌──────────────────────────────┐   ┌──────────────────────────┐
//! │         Audio Thread         │   │     Analyzer Thread      │
//! │ snapshot ─▶ design ─▶ chains │   │ blocks ─▶ FFT ─▶ paths   │
//! │   └──▶ collectors ──rtrb─────┼──▶│                          │
//! │ (zero allocation here)       │   │                          │
//! └──────────────────────────────┘   └──────────────────────────┘
//! ```

mod analyzer;
mod config;
mod curve;
mod error;
mod message;
mod params;
mod processor;

pub use analyzer::{AnalyzerHandle, AnalyzerPaths, ChannelPathProducer};
pub use config::{AnalyzerConfig, EngineConfig, StreamConfig, UpdateMode};
pub use curve::CurveMonitor;
pub use error::{EngineError, EngineResult};
pub use message::{Command, Event};
pub use params::{
    BandControl, ParameterId, ParameterKind, ParameterRange, ParameterStore, BAND_TYPE_CHOICES,
    NUM_PARAMETERS, SLOPE_CHOICES, SNAPSHOT_RETRIES,
};
pub use processor::{AnalysisTaps, EqProcessor, LEFT, RIGHT};

// Re-export DSP types the engine surface hands out
pub use heron_dsp::{
    ChainSettings, FftOrder, FifoConsumer, PathBounds, Point, SpectrumPath,
};
