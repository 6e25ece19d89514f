//! Wire protocol for gridduel.
//!
//! This crate defines the "language" that battle clients and the
//! coordinator speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`StateView`], etc.):
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the
//! battle/presence layers. It doesn't know about connections or sessions,
//! only how to serialize messages and a handful of shared value types
//! ([`GameId`], [`Role`], [`Phase`], [`Cell`]).
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Battle session
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Cell, ClientMessage, ConnectionId, ErrorCode, GRID_CELLS, GameId,
    GameOverReason, Identity, PROTOCOL_VERSION, Phase, PlayerView, Players, Rewards,
    Role, ServerMessage, StateView, UserId,
};
