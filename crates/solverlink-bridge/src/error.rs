//! Bridge error taxonomy
//!
//! Marshaling-side errors (`InvalidHandle`, `InvalidArgument`, `OutOfMemory`)
//! are raised before any native function runs. `NativeOperation` is raised
//! right after a native call reports failure. `Callback` carries an error
//! raised by host callback code back to the dispatched call's caller.

use crate::handle::HandleKind;
use thiserror::Error;

/// Errors surfaced to host callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid {kind} handle: {reason}")]
    InvalidHandle { kind: HandleKind, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of memory while marshaling {0}")]
    OutOfMemory(String),

    #[error("{symbol} failed: {message}")]
    NativeOperation {
        symbol: &'static str,
        message: String,
    },

    #[error("Callback raised: {0}")]
    Callback(String),
}

impl BridgeError {
    pub(crate) fn null_handle(kind: HandleKind) -> Self {
        BridgeError::InvalidHandle {
            kind,
            reason: "null handle".to_string(),
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        BridgeError::InvalidArgument(msg.into())
    }

    /// Error for host callback code to raise from inside a callback
    pub fn callback(msg: impl Into<String>) -> Self {
        BridgeError::Callback(msg.into())
    }

    /// True for errors detected before reaching native code
    pub fn is_marshaling(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidHandle { .. }
                | BridgeError::InvalidArgument(_)
                | BridgeError::OutOfMemory(_)
        )
    }
}

/// Result type for bridged operations
pub type BridgeResult<T> = Result<T, BridgeError>;
