//! Error types for the protocol layer.
//!
//! Each gridduel crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in serialization or message shape,
//! not in networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// required fields, or wrong field types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// `hello` that arrives after the handshake already completed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
