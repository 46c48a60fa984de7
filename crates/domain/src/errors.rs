//! Error taxonomy used throughout the SDK.
//!
//! Every failure surfaces to the caller through these types; nothing is
//! swallowed or retried internally. The classification helpers
//! ([`QuillpadError::is_retryable`], [`QuillpadError::retry_after`],
//! [`QuillpadError::requires_reauthentication`]) exist so callers can build
//! their own retry and re-login policies without string matching.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an authentication attempt did not produce a token.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFailure {
    /// The user dismissed the authorization page without granting access.
    #[error("user cancelled authorization")]
    Cancelled,

    /// The service rejected the consumer key/secret pair.
    #[error("consumer credentials rejected")]
    InvalidConsumerCredentials,

    /// The account lives on the other service family; the caller of record
    /// may retry against the next bootstrap profile.
    #[error("account belongs to a different service family")]
    WrongServiceFamily,

    /// The OAuth handshake failed for another reason.
    #[error("authorization handshake failed: {0}")]
    HandshakeFailed(String),
}

/// A fault reported by the remote service for an otherwise well-formed call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerFault {
    /// The caller exceeded its request quota. `retry_after` is the wait the
    /// server asked for, when it provided one.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Server-suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The token does not grant access to the requested object.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The authentication token has expired or been revoked; the caller
    /// should re-authenticate.
    #[error("authentication token expired")]
    AuthExpired,

    /// The server rejected the request as malformed or inconsistent.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The server failed internally.
    #[error("server error: {0}")]
    Internal(String),
}

/// Main error type for the Quillpad SDK.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuillpadError {
    /// Missing or invalid local configuration (consumer key/secret, host).
    #[error("configuration error: {0}")]
    Config(String),

    /// The authentication handshake did not complete.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    /// A client factory or store operation was invoked before a token exists.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// Network or IO failure, including dispatch-worker faults.
    #[error("transport fault: {0}")]
    Transport(String),

    /// The remote service rejected the call.
    #[error("server fault: {0}")]
    Server(#[from] ServerFault),

    /// A response broke the USN ordering/range contract. Fatal to the
    /// current sync loop; must not be blindly retried.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Credential persistence failed (keychain or backing store).
    #[error("credential storage error: {0}")]
    Storage(String),
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, QuillpadError>;

impl QuillpadError {
    /// Whether the operation may be retried as-is.
    ///
    /// Only transient conditions qualify: transport faults, rate limits and
    /// server-internal errors. Protocol violations and authentication
    /// failures never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server(fault) => {
                matches!(fault, ServerFault::RateLimited { .. } | ServerFault::Internal(_))
            }
            _ => false,
        }
    }

    /// Server-suggested wait before retrying, if one was reported.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Server(ServerFault::RateLimited { retry_after }) => *retry_after,
            _ => None,
        }
    }

    /// Whether the caller should run the authentication flow again before
    /// retrying anything else.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::Unauthenticated(_) | Self::Server(ServerFault::AuthExpired))
    }
}
