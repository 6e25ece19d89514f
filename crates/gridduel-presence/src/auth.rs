//! Authentication hook for resolving who a connection belongs to.
//!
//! gridduel doesn't issue tokens. Whatever the lobby front-end logged the
//! player in with arrives in the `hello` frame, and an [`Authenticator`]
//! turns it into an [`Identity`]. The raw token is kept as the identity's
//! credential because the rules service expects the same bearer token.
//!
//! A trait keeps the choice open: [`JwtAuthenticator`](crate::JwtAuthenticator)
//! in production, scripted authenticators in tests.

use gridduel_protocol::Identity;

use crate::PresenceError;

/// Validates a client's token and returns their identity.
///
/// # Example
///
/// ```rust
/// use gridduel_presence::{Authenticator, PresenceError};
/// use gridduel_protocol::Identity;
///
/// /// Treats `user:<id>` tokens as valid. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Identity, PresenceError> {
///         let user = token
///             .strip_prefix("user:")
///             .ok_or_else(|| PresenceError::AuthFailed("expected user:<id>".into()))?;
///         Ok(Identity::new(user, token))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the player's identity.
    ///
    /// Called once per connection, when the client sends its `hello`.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, PresenceError>> + Send;
}
