//! Error types for the measurement core

use thiserror::Error;

/// Failures raised while building or timing a chase buffer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// Buffer allocation failed; the measurement cannot proceed without it
    #[error("{operation}: failed to allocate {bytes} bytes aligned to {align}")]
    Allocation {
        operation: &'static str,
        bytes: usize,
        align: usize,
    },

    #[error("iteration count must be greater than zero")]
    ZeroIterations,

    #[error("stride of {stride} bytes is not a positive multiple of {element} bytes")]
    InvalidStride { stride: usize, element: usize },

    #[error("buffer of {size} bytes cannot hold a single {element}-byte element")]
    BufferTooSmall { size: usize, element: usize },
}

pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_message_names_operation() {
        let err = ProbeError::Allocation {
            operation: "flush_cache",
            bytes: 16,
            align: 64,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("flush_cache:"));
        assert!(msg.contains("16 bytes"));
    }
}
