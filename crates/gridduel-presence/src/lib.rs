//! Player presence and authentication for gridduel.
//!
//! This crate is the gateway's view of who is connected:
//!
//! 1. **Authentication**: turning a client token into an [`Identity`]
//!    ([`Authenticator`] trait, [`JwtAuthenticator`])
//! 2. **Presence**: at most one live connection per user, with
//!    evict-and-notify on replacement and idle sweeps ([`PresenceTable`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway handler (above)  ← authenticates, registers, listens for eviction
//!     ↕
//! Presence layer (this crate)  ← user → live connection
//!     ↕
//! Protocol layer (below)  ← UserId, ConnectionId, Identity
//! ```
//!
//! Battle sessions never talk to this crate; they only see the identity
//! the gateway resolved.
//!
//! [`Identity`]: gridduel_protocol::Identity

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod jwt;
mod presence;

pub use auth::Authenticator;
pub use error::PresenceError;
pub use jwt::{JwtAuthenticator, TokenClaims};
pub use presence::{EvictReason, EvictionNotice, PresenceConfig, PresenceTable};
