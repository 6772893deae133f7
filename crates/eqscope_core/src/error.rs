//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the eqscope engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to spawn analysis thread: {0}")]
    ThreadSpawn(String),

    #[error("DSP error: {0}")]
    DspError(#[from] eqscope_dsp::DspError),

    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::ConfigError("Invalid sample rate: 100".into());
        assert!(err.to_string().contains("Invalid sample rate"));

        let err = EngineError::ThreadSpawn("out of resources".into());
        assert!(err.to_string().contains("out of resources"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = eqscope_dsp::DspError::InvalidSampleRate(0.0);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::DspError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::ParseError(_)));
    }
}
