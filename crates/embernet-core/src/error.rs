//! Shared error type for the ambient (non-decoder) crates of the workspace.
//!
//! The HTTP/1.1 decoder in `embernet-http1` never returns a `Result` — see its
//! own module docs for why — so this type is only used by `embernet-net`,
//! where real I/O and allocation make `thiserror` the right vocabulary.

use thiserror::Error;

/// Workspace-wide error type for the networking and persistence layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O operation failed (socket read/write, persistence backend).
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A stored address record failed validation or was absent.
    #[error("address storage error: {message}")]
    AddressStorage { message: String },

    /// A server-socket lifecycle method was called in a state that forbids it.
    #[error("invalid server socket transition: {message}")]
    InvalidSocketTransition { message: String },

    /// A write-buffered connection could not flush within its retry budget.
    #[error("write buffer flush failed after {attempts} attempts")]
    FlushExhausted { attempts: u32 },

    /// The request-header decoder rejected the input as malformed.
    #[error("malformed request: {reason}")]
    RequestRejected { reason: &'static str },

    /// The request's headers did not fit within the configured limit.
    #[error("request headers exceeded the {limit}-byte limit")]
    HeaderTooLarge { limit: usize },
}

impl Error {
    /// Construct an [`Error::AddressStorage`] from any displayable message.
    pub fn address_storage(message: impl Into<String>) -> Self {
        Self::AddressStorage {
            message: message.into(),
        }
    }

    /// Construct an [`Error::InvalidSocketTransition`] from any displayable message.
    pub fn invalid_socket_transition(message: impl Into<String>) -> Self {
        Self::InvalidSocketTransition {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout `embernet-net`.
pub type Result<T> = std::result::Result<T, Error>;
