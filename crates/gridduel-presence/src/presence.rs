//! The presence table: which connection is live for each user.
//!
//! A user may hold at most one live connection. When the same user
//! authenticates again (second tab, reconnect after a network switch),
//! the newer connection wins: the old one is evicted and its handler is
//! notified through a oneshot channel so it can tell the client and
//! close.
//!
//! The table also remembers when each connection last sent a frame, so a
//! periodic sweep can evict connections that went silent without closing.
//!
//! # Concurrency note
//!
//! Like the rest of the gateway state, `PresenceTable` is a plain
//! `HashMap` and is NOT thread-safe by itself. The server owns it behind
//! a mutex and never holds that lock across network I/O.

use std::collections::HashMap;
use std::time::Duration;

use gridduel_protocol::{ConnectionId, UserId};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Why a connection was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// The same user connected again elsewhere.
    Replaced,
    /// No frame arrived within the idle timeout.
    Idle,
}

/// Resolves when the registered connection is evicted.
///
/// If the table entry is removed normally (via
/// [`PresenceTable::unregister`]) the sender is dropped and the receiver
/// resolves with an error, which handlers treat as "not evicted".
pub type EvictionNotice = oneshot::Receiver<EvictReason>;

/// Configuration for presence tracking.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// How long a connection may stay silent before the idle sweep
    /// evicts it. Clients heartbeat well within this.
    pub idle_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// One user's live connection.
struct Presence {
    conn_id: ConnectionId,
    last_seen: Instant,
    notify: oneshot::Sender<EvictReason>,
}

/// Tracks the single live connection of every authenticated user.
pub struct PresenceTable {
    entries: HashMap<UserId, Presence>,
    config: PresenceConfig,
}

impl PresenceTable {
    /// Creates an empty table.
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    /// Records `conn_id` as the live connection for `user_id`.
    ///
    /// Any previous connection for the same user is evicted with
    /// [`EvictReason::Replaced`] and its id returned.
    pub fn register(
        &mut self,
        user_id: UserId,
        conn_id: ConnectionId,
    ) -> (EvictionNotice, Option<ConnectionId>) {
        let (notify, notice) = oneshot::channel();
        let entry = Presence {
            conn_id,
            last_seen: Instant::now(),
            notify,
        };

        let replaced = self.entries.insert(user_id.clone(), entry).map(|old| {
            // The old handler may already be gone; nothing to do then.
            let _ = old.notify.send(EvictReason::Replaced);
            old.conn_id
        });

        match replaced {
            Some(old) => {
                tracing::info!(%user_id, %conn_id, evicted = %old, "connection replaced");
            }
            None => tracing::debug!(%user_id, %conn_id, "presence registered"),
        }
        (notice, replaced)
    }

    /// Marks the connection as active now. Returns `false` if `conn_id`
    /// is no longer the user's live connection.
    pub fn touch(&mut self, user_id: &UserId, conn_id: ConnectionId) -> bool {
        match self.entries.get_mut(user_id) {
            Some(p) if p.conn_id == conn_id => {
                p.last_seen = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Removes the entry, but only if `conn_id` is still the live
    /// connection. A handler cleaning up after being replaced must not
    /// remove its successor.
    pub fn unregister(&mut self, user_id: &UserId, conn_id: ConnectionId) -> bool {
        match self.entries.get(user_id) {
            Some(p) if p.conn_id == conn_id => {
                self.entries.remove(user_id);
                tracing::debug!(%user_id, %conn_id, "presence removed");
                true
            }
            _ => false,
        }
    }

    /// Evicts every connection silent for longer than the idle timeout.
    ///
    /// Each evicted handler receives [`EvictReason::Idle`]. Returns the
    /// evicted `(user, connection)` pairs.
    pub fn evict_idle(&mut self) -> Vec<(UserId, ConnectionId)> {
        let now = Instant::now();
        let max_idle = self.config.idle_timeout;

        let stale: Vec<UserId> = self
            .entries
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_seen) > max_idle)
            .map(|(user, _)| user.clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for user_id in stale {
            if let Some(p) = self.entries.remove(&user_id) {
                let _ = p.notify.send(EvictReason::Idle);
                tracing::info!(%user_id, conn_id = %p.conn_id, "idle connection evicted");
                evicted.push((user_id, p.conn_id));
            }
        }
        evicted
    }

    /// The live connection for `user_id`, if any.
    pub fn connection(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.entries.get(user_id).map(|p| p.conn_id)
    }

    /// The configured idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout
    }

    /// Number of users with a live connection.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `PresenceTable`.
    //!
    //! Idle eviction depends on elapsed time, so those tests run on a
    //! paused Tokio clock and move it with `tokio::time::advance`.

    use super::*;

    fn table() -> PresenceTable {
        PresenceTable::new(PresenceConfig {
            idle_timeout: Duration::from_secs(10),
        })
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // register()
    // =====================================================================

    #[tokio::test]
    async fn test_register_new_user_records_connection() {
        let mut presence = table();

        let (_notice, replaced) = presence.register(user("u1"), conn(1));

        assert!(replaced.is_none());
        assert_eq!(presence.connection(&user("u1")), Some(conn(1)));
        assert_eq!(presence.len(), 1);
    }

    #[tokio::test]
    async fn test_register_same_user_evicts_and_notifies_old_connection() {
        let mut presence = table();
        let (old_notice, _) = presence.register(user("u1"), conn(1));

        let (_new_notice, replaced) = presence.register(user("u1"), conn(2));

        assert_eq!(replaced, Some(conn(1)));
        assert_eq!(presence.connection(&user("u1")), Some(conn(2)));
        assert_eq!(old_notice.await, Ok(EvictReason::Replaced));
    }

    #[tokio::test]
    async fn test_register_different_users_are_independent() {
        let mut presence = table();
        let (mut n1, _) = presence.register(user("u1"), conn(1));
        presence.register(user("u2"), conn(2));

        assert_eq!(presence.len(), 2);
        assert!(n1.try_recv().is_err(), "u1 must not be evicted by u2");
    }

    // =====================================================================
    // unregister()
    // =====================================================================

    #[tokio::test]
    async fn test_unregister_matching_connection_removes_entry() {
        let mut presence = table();
        let (notice, _) = presence.register(user("u1"), conn(1));

        assert!(presence.unregister(&user("u1"), conn(1)));

        assert!(presence.is_empty());
        assert!(notice.await.is_err(), "normal removal is not an eviction");
    }

    #[tokio::test]
    async fn test_unregister_stale_connection_keeps_successor() {
        let mut presence = table();
        presence.register(user("u1"), conn(1));
        presence.register(user("u1"), conn(2));

        // The replaced handler cleans up late.
        assert!(!presence.unregister(&user("u1"), conn(1)));

        assert_eq!(presence.connection(&user("u1")), Some(conn(2)));
    }

    // =====================================================================
    // touch() / evict_idle()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_removes_silent_connections() {
        let mut presence = table();
        let (notice, _) = presence.register(user("u1"), conn(1));

        tokio::time::advance(Duration::from_secs(11)).await;
        let evicted = presence.evict_idle();

        assert_eq!(evicted, vec![(user("u1"), conn(1))]);
        assert!(presence.is_empty());
        assert_eq!(notice.await, Ok(EvictReason::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_spares_recently_touched() {
        let mut presence = table();
        presence.register(user("u1"), conn(1));
        presence.register(user("u2"), conn(2));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(presence.touch(&user("u1"), conn(1)));
        tokio::time::advance(Duration::from_secs(4)).await;

        let evicted = presence.evict_idle();

        assert_eq!(evicted, vec![(user("u2"), conn(2))]);
        assert_eq!(presence.connection(&user("u1")), Some(conn(1)));
    }

    #[tokio::test]
    async fn test_touch_unknown_connection_returns_false() {
        let mut presence = table();
        presence.register(user("u1"), conn(1));

        assert!(!presence.touch(&user("u1"), conn(9)));
        assert!(!presence.touch(&user("nobody"), conn(1)));
    }
}
