//! Error types for remote analysis and publication calls.

use std::error::Error;

use thiserror::Error;

/// Primary error type for remote analysis operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Operation is not supported by the configured backend.
    #[error("remote operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Backend processed the request and rejected it.
    #[error("backend rejected the request")]
    Backend {
        /// Human-readable detail supplied by the backend, when present.
        detail: Option<String>,
    },
    /// Request never produced a backend response.
    #[error("transport failure")]
    Transport {
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl RemoteError {
    /// Backend-supplied human-readable detail, when present.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Backend { detail } => detail.as_deref(),
            Self::Unsupported { .. } | Self::Transport { .. } => None,
        }
    }
}

/// Convenience alias for remote operation results.
pub type RemoteResult<T> = Result<T, RemoteError>;
