//! Unified error type for gridduel.

use gridduel_battle::BattleError;
use gridduel_presence::PresenceError;
use gridduel_protocol::ProtocolError;
use gridduel_rules::RulesError;
use gridduel_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GridduelError {
    /// Socket-level failure (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or broke the handshake.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Token rejected.
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// The rules service client could not be built.
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// A battle session refused a command.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// Bad or missing configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
