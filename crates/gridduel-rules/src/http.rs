//! `reqwest`-backed [`RulesService`].
//!
//! Endpoints, all `POST` with a JSON body and the player's credential as
//! bearer token:
//!
//! ```text
//! {base}/games/{gameId}/place    {"cell": n}          → ignored
//! {base}/games/{gameId}/step     {"cell": n}          → {"rewards": [...]}
//! {base}/games/{gameId}/concede  {"winner": "<id>"}   → {"rewards": [...]}
//! ```

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use gridduel_protocol::{Cell, GameId, Identity, Rewards, UserId};

use crate::{RulesError, RulesService, StepOutcome};

/// Where the rules service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Base URL, e.g. `http://rules.internal:8081/v1`.
    pub base_url: String,
    /// Whole-request timeout, connect included.
    pub timeout: Duration,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Response shape shared by `step` and `concede`.
#[derive(Debug, Deserialize)]
struct RewardsBody {
    #[serde(default)]
    rewards: Option<Rewards>,
}

/// HTTP client for the rules service.
///
/// Cheap to share: wrap it in an `Arc` and hand it to the session
/// registry.
#[derive(Debug, Clone)]
pub struct HttpRulesService {
    http: reqwest::Client,
    base: Url,
}

impl HttpRulesService {
    /// Builds a client for `config.base_url`.
    ///
    /// Fails if the URL doesn't parse or can't have path segments
    /// appended (`mailto:` and friends).
    pub fn new(config: RulesConfig) -> Result<Self, RulesError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| RulesError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(RulesError::InvalidUrl(config.base_url));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RulesError::Transport)?;
        Ok(Self { http, base })
    }

    /// `{base}/games/{game_id}/{action}`, with the game id percent-encoded
    /// as a single path segment.
    pub fn endpoint(&self, game_id: &GameId, action: &str) -> Result<Url, RulesError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RulesError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(["games", game_id.as_str(), action]);
        Ok(url)
    }

    async fn post(
        &self,
        action: &'static str,
        identity: &Identity,
        game_id: &GameId,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, RulesError> {
        let url = self.endpoint(game_id, action)?;
        debug!(%game_id, user_id = %identity.user_id, action, "rules request");

        let response = self
            .http
            .post(url)
            .bearer_auth(&identity.credential)
            .json(&body)
            .send()
            .await
            .map_err(RulesError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RulesError::Status {
                action,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn rewards(
        &self,
        action: &'static str,
        identity: &Identity,
        game_id: &GameId,
        body: serde_json::Value,
    ) -> Result<Rewards, RulesError> {
        let response = self.post(action, identity, game_id, body).await?;
        let payload: RewardsBody = response
            .json()
            .await
            .map_err(|source| RulesError::Decode { action, source })?;
        Ok(payload.rewards.unwrap_or_default())
    }
}

impl RulesService for HttpRulesService {
    async fn place(
        &self,
        identity: &Identity,
        game_id: &GameId,
        cell: Cell,
    ) -> Result<(), RulesError> {
        self.post("place", identity, game_id, json!({ "cell": cell.value() }))
            .await?;
        Ok(())
    }

    async fn step(
        &self,
        identity: &Identity,
        game_id: &GameId,
        cell: Cell,
    ) -> Result<StepOutcome, RulesError> {
        let rewards = self
            .rewards("step", identity, game_id, json!({ "cell": cell.value() }))
            .await?;
        Ok(StepOutcome::from_rewards(rewards))
    }

    async fn concede(
        &self,
        loser: &Identity,
        game_id: &GameId,
        winner: &UserId,
    ) -> Result<Rewards, RulesError> {
        self.rewards("concede", loser, game_id, json!({ "winner": winner }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpRulesService {
        HttpRulesService::new(RulesConfig {
            base_url: base.to_string(),
            ..RulesConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_appends_game_and_action() {
        let svc = service("http://rules.local:8081");

        let url = svc.endpoint(&GameId::new("g-1"), "step").unwrap();

        assert_eq!(url.as_str(), "http://rules.local:8081/games/g-1/step");
    }

    #[test]
    fn test_endpoint_keeps_base_path_with_trailing_slash() {
        let svc = service("http://rules.local/v1/");

        let url = svc.endpoint(&GameId::new("g-1"), "place").unwrap();

        assert_eq!(url.as_str(), "http://rules.local/v1/games/g-1/place");
    }

    #[test]
    fn test_endpoint_encodes_game_id_as_one_segment() {
        let svc = service("http://rules.local");

        let url = svc.endpoint(&GameId::new("a/b c"), "concede").unwrap();

        assert_eq!(url.as_str(), "http://rules.local/games/a%2Fb%20c/concede");
    }

    #[test]
    fn test_new_rejects_unparseable_url() {
        let result = HttpRulesService::new(RulesConfig {
            base_url: "not a url".into(),
            ..RulesConfig::default()
        });

        assert!(matches!(result, Err(RulesError::InvalidUrl(_))));
    }

    #[test]
    fn test_new_rejects_cannot_be_a_base_url() {
        let result = HttpRulesService::new(RulesConfig {
            base_url: "mailto:rules@example.com".into(),
            ..RulesConfig::default()
        });

        assert!(matches!(result, Err(RulesError::InvalidUrl(_))));
    }

    #[test]
    fn test_rewards_body_missing_or_null_is_empty() {
        let absent: RewardsBody = serde_json::from_str("{}").unwrap();
        let null: RewardsBody = serde_json::from_str(r#"{"rewards":null}"#).unwrap();

        assert!(absent.rewards.unwrap_or_default().is_empty());
        assert!(null.rewards.unwrap_or_default().is_empty());
    }
}
