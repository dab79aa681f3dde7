//! Error types for the request queue.

use thiserror::Error;

use crate::request::RequestId;

/// Result type alias for queue operations.
pub type BufqResult<T> = Result<T, BufqError>;

/// Error variants for queue construction and request completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufqError {
    /// An exact strategy name was required and nothing by that name is registered.
    #[error("No such strategy: {name}")]
    NoSuchStrategy {
        /// The requested strategy name.
        name: String,
    },

    /// The registry holds no strategy eligible for selection.
    #[error("No strategies registered")]
    NoStrategies,

    /// A strategy with this name is already registered.
    #[error("Duplicate strategy: {name}")]
    DuplicateStrategy {
        /// The conflicting strategy name.
        name: String,
    },

    /// Backing storage for a strategy could not be reserved.
    #[error("Allocation failure: {reason}")]
    AllocationFailure {
        /// Description of the failed reservation.
        reason: String,
    },

    /// Raw queue flag bits do not describe a valid configuration.
    #[error("Invalid queue flags: {bits:#x}")]
    InvalidFlags {
        /// The rejected flag word.
        bits: u32,
    },

    /// Strategy tuning parameters are out of range.
    #[error("Invalid tuning: {reason}")]
    InvalidTuning {
        /// Description of the invalid parameter.
        reason: String,
    },

    /// The request was discarded without being dispatched (queue drained).
    #[error("I/O aborted: request {id} discarded from queue")]
    Aborted {
        /// The discarded request.
        id: RequestId,
    },

    /// Queue configuration could not be parsed.
    #[error("Config error: {reason}")]
    ConfigError {
        /// Description of the parse failure.
        reason: String,
    },
}

impl From<std::collections::TryReserveError> for BufqError {
    fn from(err: std::collections::TryReserveError) -> Self {
        BufqError::AllocationFailure {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BufqError {
    fn from(err: serde_json::Error) -> Self {
        BufqError::ConfigError {
            reason: err.to_string(),
        }
    }
}
