//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the EQ engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Failed to spawn analyzer thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("DSP error: {0}")]
    DspError(#[from] heron_dsp::DspError),

    #[error("Channel send error - analyzer thread gone")]
    ChannelSendError,

    #[error("Analyzer thread panicked")]
    ThreadPanicked,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::ConfigError("Invalid sample rate: 4000".into());
        assert!(err.to_string().contains("4000"));

        let err = EngineError::UnknownParameter("Band9 Gain".into());
        assert!(err.to_string().contains("Band9 Gain"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = heron_dsp::DspError::InvalidSlope(9);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::DspError(_)));
    }
}
