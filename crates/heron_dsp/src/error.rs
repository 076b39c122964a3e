//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Invalid slope index: {0} (must be 0-3)")]
    InvalidSlope(u8),

    #[error("Invalid FFT size: {0} (must be 2048, 4096 or 8192)")]
    InvalidFftSize(usize),
}
