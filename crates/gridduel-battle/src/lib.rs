//! Battle sessions for gridduel.
//!
//! Each battle runs as an isolated Tokio task (actor model) that owns
//! the two player slots, the phase machine, the turn countdown, and all
//! traffic with the rules service.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: finds or creates the session for a game id
//! - [`SessionHandle`]: sends commands to a running session
//! - [`SessionInfo`]: a point-in-time snapshot of a session
//! - [`BattleConfig`]: budgets, bonuses, and delays
//!
//! # Phases
//!
//! ```text
//! WaitingPlayers → Placing → Toss → TurnA ⇄ TurnB → Finished
//! ```
//!
//! Invalid actions (wrong turn, off-grid cells, repeated move ids,
//! anything after the battle ended) are dropped without a reply. Only
//! room-level rejections ([`BattleError`]) and failed shots
//! (`STEP_FAILED`) reach clients as errors.

mod config;
mod error;
mod registry;
mod session;
mod slot;

pub use config::BattleConfig;
pub use error::BattleError;
pub use registry::SessionRegistry;
pub use session::{SessionHandle, SessionInfo, SlotInfo};
pub use slot::PlayerSender;
