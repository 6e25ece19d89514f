//! The rules-service contract.

use gridduel_protocol::{Cell, GameId, Identity, Rewards, UserId};

use crate::RulesError;

/// How the rules service resolved a shot.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The shot found the opponent's secret. Carries the reward payload,
    /// which is never empty.
    Hit(Rewards),
    /// Nothing there.
    Miss,
}

impl StepOutcome {
    /// A non-empty reward list means the shot hit.
    pub fn from_rewards(rewards: Rewards) -> Self {
        if rewards.is_empty() {
            Self::Miss
        } else {
            Self::Hit(rewards)
        }
    }

    /// Returns `true` for [`StepOutcome::Hit`].
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// The calls a battle session makes to the rules service.
///
/// Sessions spawn these futures onto their own tasks, so they must be
/// `Send`; implementations are shared behind an `Arc`.
pub trait RulesService: Send + Sync + 'static {
    /// Records `identity`'s secret cell. Success carries no data.
    fn place(
        &self,
        identity: &Identity,
        game_id: &GameId,
        cell: Cell,
    ) -> impl std::future::Future<Output = Result<(), RulesError>> + Send;

    /// Resolves a shot by `identity` at `cell`.
    fn step(
        &self,
        identity: &Identity,
        game_id: &GameId,
        cell: Cell,
    ) -> impl std::future::Future<Output = Result<StepOutcome, RulesError>> + Send;

    /// Concedes the game on behalf of `loser`, naming `winner`, and
    /// returns the winner's reward payload.
    fn concede(
        &self,
        loser: &Identity,
        game_id: &GameId,
        winner: &UserId,
    ) -> impl std::future::Future<Output = Result<Rewards, RulesError>> + Send;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_rewards_empty_is_miss() {
        assert_eq!(StepOutcome::from_rewards(vec![]), StepOutcome::Miss);
    }

    #[test]
    fn test_from_rewards_non_empty_is_hit_with_payload() {
        let rewards = vec![json!({"item": "gold", "amount": 50})];

        let outcome = StepOutcome::from_rewards(rewards.clone());

        assert!(outcome.is_hit());
        assert_eq!(outcome, StepOutcome::Hit(rewards));
    }
}
