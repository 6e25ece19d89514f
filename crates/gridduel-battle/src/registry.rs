//! Session registry: the id → session map shared by every connection.
//!
//! The first `get` for a game id spawns its session; later calls get the
//! same handle. Finished sessions retire themselves after their grace
//! period and a reaper task drops them from the map, so the next `get`
//! for that id starts a brand-new battle.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use gridduel_protocol::{ConnectionId, GameId, Identity, Role};
use gridduel_rules::RulesService;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::session::{Retirement, SessionHandle, spawn_session};
use crate::slot::PlayerSender;
use crate::{BattleConfig, BattleError};

type SessionMap = HashMap<GameId, SessionHandle>;

/// Creates, tracks, and disposes battle sessions by game id.
///
/// Cloning is cheap; clones share the same map.
pub struct SessionRegistry<R: RulesService> {
    sessions: Arc<Mutex<SessionMap>>,
    rules: Arc<R>,
    config: BattleConfig,
    retire_tx: mpsc::UnboundedSender<Retirement>,
}

impl<R: RulesService> Clone for SessionRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            rules: Arc::clone(&self.rules),
            config: self.config.clone(),
            retire_tx: self.retire_tx.clone(),
        }
    }
}

impl<R: RulesService> SessionRegistry<R> {
    /// Creates an empty registry and starts its reaper task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(rules: Arc<R>, config: BattleConfig) -> Self {
        let sessions = Arc::new(Mutex::new(HashMap::new()));
        let (retire_tx, retire_rx) = mpsc::unbounded_channel();
        tokio::spawn(reap(Arc::downgrade(&sessions), retire_rx));
        Self {
            sessions,
            rules,
            config,
            retire_tx,
        }
    }

    /// Returns the session for `game_id`, creating it if needed.
    ///
    /// Lookup and creation happen under one lock, so concurrent callers
    /// always end up with the same session. A stopped session still in
    /// the map is replaced.
    pub async fn get(&self, game_id: &GameId) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(game_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let handle = spawn_session(
            game_id.clone(),
            self.config.clone(),
            Arc::clone(&self.rules),
            self.retire_tx.clone(),
        );
        info!(%game_id, generation = handle.generation(), "battle session created");
        sessions.insert(game_id.clone(), handle.clone());
        handle
    }

    /// Seats `identity` in the session for `game_id`, creating it if
    /// needed.
    ///
    /// A session can stop between `get` and the join reaching it (it
    /// retired, or was deleted). The join is then tried once more on a
    /// fresh session.
    pub async fn join(
        &self,
        game_id: &GameId,
        conn_id: ConnectionId,
        identity: Identity,
        sender: PlayerSender,
    ) -> Result<(SessionHandle, Role), BattleError> {
        let handle = self.get(game_id).await;
        match handle.join(conn_id, identity.clone(), sender.clone()).await {
            Err(BattleError::Unavailable(_)) => {
                debug!(%game_id, generation = handle.generation(), "session stopped before join, retrying");
                let handle = self.get(game_id).await;
                let role = handle.join(conn_id, identity, sender).await?;
                Ok((handle, role))
            }
            result => result.map(|role| (handle, role)),
        }
    }

    /// Returns the session for `game_id` without creating one.
    pub async fn lookup(&self, game_id: &GameId) -> Option<SessionHandle> {
        self.sessions.lock().await.get(game_id).cloned()
    }

    /// Stops the session for `game_id` and forgets it. Returns `false`
    /// if there was none.
    pub async fn delete(&self, game_id: &GameId) -> bool {
        let removed = self.sessions.lock().await.remove(game_id);
        match removed {
            Some(handle) => {
                let _ = handle.shutdown().await;
                info!(%game_id, generation = handle.generation(), "battle session deleted");
                true
            }
            None => false,
        }
    }

    /// Number of tracked sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns `true` if no session is tracked.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Ids of every tracked session.
    pub async fn ids(&self) -> Vec<GameId> {
        self.sessions.lock().await.keys().cloned().collect()
    }
}

/// Drops retired sessions from the map until the registry goes away.
async fn reap(sessions: Weak<Mutex<SessionMap>>, mut retire_rx: mpsc::UnboundedReceiver<Retirement>) {
    while let Some(retired) = retire_rx.recv().await {
        let Some(sessions) = sessions.upgrade() else {
            break;
        };
        let mut sessions = sessions.lock().await;
        remove_retired(&mut sessions, &retired);
    }
}

/// Removes the retired session, unless the map already holds a newer
/// session under the same id.
fn remove_retired(sessions: &mut SessionMap, retired: &Retirement) -> bool {
    let current = sessions
        .get(&retired.game_id)
        .is_some_and(|h| h.generation() == retired.generation);
    if current {
        sessions.remove(&retired.game_id);
        info!(game_id = %retired.game_id, generation = retired.generation, "battle session retired");
    } else {
        debug!(game_id = %retired.game_id, generation = retired.generation, "stale retirement ignored");
    }
    current
}
