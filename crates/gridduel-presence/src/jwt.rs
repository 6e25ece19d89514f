//! HS256 JWT authenticator.
//!
//! Validates tokens minted by the lobby's auth provider with a shared
//! secret. The `sub` claim becomes the [`UserId`]; the token itself is
//! kept as the credential forwarded to the rules service.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use gridduel_protocol::{Identity, UserId};

use crate::{Authenticator, PresenceError};

/// Claims we read from the token. Anything else is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the stable user id.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    pub exp: u64,
    /// Issuer, checked only when the authenticator is configured with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Validates HS256 tokens against a shared secret.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates an authenticator for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Only accept tokens whose `iss` matches.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    fn validate(&self, token: &str) -> Result<TokenClaims, PresenceError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => PresenceError::TokenExpired,
                _ => PresenceError::AuthFailed(e.to_string()),
            }
        })?;
        if data.claims.sub.is_empty() {
            return Err(PresenceError::AuthFailed("empty sub claim".into()));
        }
        Ok(data.claims)
    }
}

impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, PresenceError> {
        let claims = self.validate(token)?;
        tracing::debug!(user_id = %claims.sub, "token validated");
        Ok(Identity {
            user_id: UserId::new(claims.sub),
            credential: token.to_string(),
        })
    }
}
