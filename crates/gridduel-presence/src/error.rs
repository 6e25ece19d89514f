//! Error types for the presence layer.

/// Errors that can occur while authenticating a connection.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// The token was malformed, badly signed, or rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The token was valid once but its `exp` has passed.
    #[error("token expired")]
    TokenExpired,
}
