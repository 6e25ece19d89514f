//! Server configuration and environment loading.

use std::time::Duration;

use gridduel_battle::BattleConfig;
use gridduel_rules::RulesConfig;

/// Environment variable names read by [`GridduelConfig::from_env`].
pub(crate) mod keys {
    pub const BIND: &str = "GRIDDUEL_BIND";
    pub const RULES_URL: &str = "GRIDDUEL_RULES_URL";
    pub const RULES_TIMEOUT_MS: &str = "GRIDDUEL_RULES_TIMEOUT_MS";
    pub const JWT_SECRET: &str = "GRIDDUEL_JWT_SECRET";
    pub const JWT_ISSUER: &str = "GRIDDUEL_JWT_ISSUER";
    pub const IDLE_TIMEOUT_SECS: &str = "GRIDDUEL_IDLE_TIMEOUT_SECS";
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send `hello`.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is evicted.
    pub idle_timeout: Duration,

    /// How often the idle sweep runs.
    pub idle_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            idle_sweep_interval: Duration::from_secs(5),
        }
    }
}

/// Everything the `gridduel` binary needs to boot.
#[derive(Debug, Clone)]
pub struct GridduelConfig {
    pub server: ServerConfig,
    pub battle: BattleConfig,
    pub rules: RulesConfig,
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    /// Expected `iss` claim, if tokens carry one.
    pub jwt_issuer: Option<String>,
}

impl GridduelConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// Only `GRIDDUEL_JWT_SECRET` is required; everything else falls back
    /// to its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut server = ServerConfig::default();
        let mut rules = RulesConfig::default();

        if let Some(bind) = lookup(keys::BIND) {
            server.bind_addr = bind;
        }
        if let Some(url) = lookup(keys::RULES_URL) {
            rules.base_url = url;
        }
        if let Some(raw) = lookup(keys::RULES_TIMEOUT_MS) {
            rules.timeout = Duration::from_millis(parse_positive(keys::RULES_TIMEOUT_MS, raw)?);
        }
        if let Some(raw) = lookup(keys::IDLE_TIMEOUT_SECS) {
            server.idle_timeout = Duration::from_secs(parse_positive(keys::IDLE_TIMEOUT_SECS, raw)?);
        }

        let jwt_secret = lookup(keys::JWT_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(keys::JWT_SECRET))?;
        let jwt_issuer = lookup(keys::JWT_ISSUER).filter(|s| !s.is_empty());

        Ok(Self {
            server,
            battle: BattleConfig::default(),
            rules,
            jwt_secret,
            jwt_issuer,
        })
    }
}

fn parse_positive(key: &'static str, raw: String) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
