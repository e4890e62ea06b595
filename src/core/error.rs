//! Error types for a running stage

use crate::core::SampleFormat;

/// Fatal conditions that terminate a stage
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid buffer size: {0}")]
    InvalidBufferSize(i64),

    #[error("transform made no progress in {calls} consecutive calls (consumed {total_consumed} samples so far)")]
    StuckTransform { calls: u32, total_consumed: u64 },

    #[error("sample format mismatch: expected {expected:?}, found {found:?}")]
    FormatMismatch {
        expected: SampleFormat,
        found: SampleFormat,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Process exit code for this condition
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::Usage(_) | StageError::InvalidParameter(_) => -1,
            StageError::InvalidBufferSize(_) => -2,
            StageError::StuckTransform { .. } => -3,
            StageError::FormatMismatch { .. } => -4,
            StageError::Io(_) => -1,
        }
    }
}

/// Result type for stage operations
pub type StageResult<T = ()> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StageError::Usage("x".into()).exit_code(), -1);
        assert_eq!(StageError::InvalidBufferSize(0).exit_code(), -2);
        let stuck = StageError::StuckTransform {
            calls: 2,
            total_consumed: 0,
        };
        assert_eq!(stuck.exit_code(), -3);
    }
}
