//! Client side of the rules/economy service.
//!
//! gridduel never decides whether a shot hits or what a win is worth.
//! Secrets live with the rules service; battle sessions forward
//! placements, ask it to resolve each shot, and ask it to settle a
//! timeout. This crate is the seam:
//!
//! - [`RulesService`]: the three calls a battle makes
//! - [`HttpRulesService`]: the production implementation over `reqwest`
//! - [`StepOutcome`] / [`RulesError`]: what comes back
//!
//! Every call carries the acting player's [`Identity`]; its credential
//! is sent as the bearer token so the service can authorize the player
//! itself.
//!
//! [`Identity`]: gridduel_protocol::Identity

#![allow(async_fn_in_trait)]

mod error;
mod http;
mod service;

pub use error::RulesError;
pub use http::{HttpRulesService, RulesConfig};
pub use service::{RulesService, StepOutcome};
