//! Error types.
//!
//! Integration and trap errors are carried as values up to the runtime
//! boundary, which decides whether they terminate the process. Outcomes the
//! caller is expected to handle (version mismatch, unsupported formats,
//! backend creation failures) are `None`, not errors.

use std::path::PathBuf;

use crate::id::RenderletId;

#[derive(Debug, thiserror::Error)]
pub enum WanderError {
    #[error("failed to read renderlet module {}: {error}", path.display())]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("failed to create bytecode engine: {0:#}")]
    Engine(wasmtime::Error),

    #[error("failed to compile renderlet module: {0:#}")]
    Compile(wasmtime::Error),

    #[error("failed to instantiate renderlet module: {0:#}")]
    Instantiate(wasmtime::Error),

    #[error("renderlet does not export `{0}`")]
    MissingExport(String),

    #[error("call to `{export}` failed: {error:#}")]
    Call {
        export: String,
        error: wasmtime::Error,
    },

    #[error("`{export}` returned {found} instead of a single i32 offset")]
    UnexpectedResult { export: String, found: String },

    #[error("{0} is not loaded")]
    UnknownRenderlet(RenderletId),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("staging arena overflow: {requested} bytes requested, {available} of {capacity} left")]
    PoolOverflow {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    #[error("element stride must be non-zero")]
    ZeroStride,
}

/// Malformed renderlet output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated output: needed {needed} bytes at offset {offset}, memory holds {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("material line {line}: {reason}")]
    MalformedMaterial { line: usize, reason: String },
}

pub type Result<T, E = WanderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_convert() {
        let err: WanderError = ProtocolError::MalformedMaterial {
            line: 2,
            reason: "expected 5 fields, found 3".into(),
        }
        .into();
        assert_eq!(err.to_string(), "material line 2: expected 5 fields, found 3");
    }

    #[test]
    fn overflow_message_reports_sizes() {
        let err = WanderError::PoolOverflow {
            requested: 64,
            available: 16,
            capacity: 128,
        };
        let msg = err.to_string();
        assert!(msg.contains("64 bytes requested"));
        assert!(msg.contains("16 of 128"));
    }
}
