//! Error types for rules-service calls.

/// Errors returned by a [`RulesService`](crate::RulesService).
///
/// All of them are transient from a battle's point of view: a failed
/// step is retried by the client, a failed concede finishes the game
/// without rewards, a failed placement is only logged.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The configured base URL can't carry `/games/...` paths.
    #[error("invalid rules service url: {0}")]
    InvalidUrl(String),

    /// The request never got a response (connect, timeout, TLS).
    #[error("rules service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("rules service {action} failed: status {status} body {body}")]
    Status {
        action: &'static str,
        status: u16,
        body: String,
    },

    /// The response body was not the JSON we expected.
    #[error("rules service {action} returned malformed body: {source}")]
    Decode {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The caller gave up waiting for the reply.
    #[error("rules service {action} timed out")]
    TimedOut { action: &'static str },
}
