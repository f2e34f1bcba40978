//! Unified error types for adapter operations.
//!
//! Translation-layer errors are never silently swallowed; the one deliberate
//! exception is `call` dispatch, which collapses "no such method on either
//! path" into [`ApiError::UnsupportedMethod`] so callers see a uniform error
//! kind.

use thiserror::Error;

/// Errors surfaced by adapter operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An operation was addressed at a bot with no live backend session.
    #[error("no active session for {uin}")]
    NoSession {
        /// The addressed account.
        uin: i64,
    },

    /// `call` dispatch found neither a local method nor a backend one.
    #[error("unsupported method: {method}")]
    UnsupportedMethod {
        /// The requested method name.
        method: String,
    },

    /// A legacy integer message id was never allocated by the registry.
    #[error("unknown legacy message id: {id}")]
    UnknownMessageId {
        /// The unmapped integer.
        id: i32,
    },

    /// An opaque message id failed to parse.
    #[error("malformed message id: {reason}")]
    MalformedMessageId {
        /// Why the id was rejected.
        reason: String,
    },

    /// An entry-point argument did not have the expected shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Backend call failure (network, auth, not-found), propagated unchanged.
    #[error("backend error: {0}")]
    Backend(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Creates a backend failure error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates an invalid-argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for adapter operations.
pub type ApiResult<T> = Result<T, ApiError>;
