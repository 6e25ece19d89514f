//! # gridduel
//!
//! Real-time coordinator for two-player grid duels.
//!
//! Players connect over WebSocket, authenticate with a signed token, and
//! join a battle by id. Each battle runs as its own actor: it seats the
//! two players, collects their secret cells, tosses a coin for the first
//! turn, runs the turn countdown, and asks the rules service to resolve
//! every shot. Rewards come from the rules service and are forwarded
//! untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gridduel::prelude::*;
//!
//! # async fn boot() -> Result<(), GridduelError> {
//! let auth = JwtAuthenticator::new(b"shared-secret");
//! let rules = Arc::new(HttpRulesService::new(RulesConfig::default())?);
//!
//! let server = GridduelServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(auth, rules)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, GridduelConfig, ServerConfig};
pub use error::GridduelError;
pub use server::{GridduelServer, GridduelServerBuilder};

/// Everything needed to boot a server or talk to one in tests.
pub mod prelude {
    pub use crate::{
        ConfigError, GridduelConfig, GridduelError, GridduelServer, GridduelServerBuilder,
        ServerConfig,
    };
    pub use gridduel_battle::{BattleConfig, BattleError, SessionRegistry};
    pub use gridduel_presence::{Authenticator, JwtAuthenticator, PresenceError, TokenClaims};
    pub use gridduel_protocol::{
        Cell, ClientMessage, ErrorCode, GameId, GameOverReason, Identity, PROTOCOL_VERSION,
        Phase, Rewards, Role, ServerMessage, StateView, UserId,
    };
    pub use gridduel_rules::{HttpRulesService, RulesConfig, RulesError, RulesService, StepOutcome};
}
