//! One player's seat in a battle.

use std::collections::HashSet;

use gridduel_protocol::{Cell, ConnectionId, Identity, PlayerView, ServerMessage};
use gridduel_timer::TimeBudget;
use tokio::sync::mpsc;

/// Channel sender for delivering pushes to a player's connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// The live connection currently bound to a slot.
pub(crate) struct Binding {
    pub(crate) conn_id: ConnectionId,
    sender: PlayerSender,
}

/// A claimed player slot.
///
/// A slot outlives its connection: when the player drops, `binding`
/// clears but the identity, secret, budget and move history stay until
/// the same user joins again.
pub(crate) struct PlayerSlot {
    pub(crate) identity: Identity,
    pub(crate) binding: Option<Binding>,
    pub(crate) secret: Option<Cell>,
    pub(crate) budget: TimeBudget,
    /// Move ids already accepted from this player.
    move_ids: HashSet<String>,
}

impl PlayerSlot {
    pub(crate) fn new(identity: Identity, budget: TimeBudget) -> Self {
        Self {
            identity,
            binding: None,
            secret: None,
            budget,
            move_ids: HashSet::new(),
        }
    }

    pub(crate) fn is_present(&self) -> bool {
        self.binding.is_some()
    }

    /// Binds `conn_id`, replacing any previous connection. Returns the
    /// replaced connection id.
    pub(crate) fn bind(&mut self, conn_id: ConnectionId, sender: PlayerSender) -> Option<ConnectionId> {
        self.binding
            .replace(Binding { conn_id, sender })
            .map(|old| old.conn_id)
    }

    /// Clears the binding if it is still `conn_id`.
    pub(crate) fn unbind(&mut self, conn_id: ConnectionId) -> bool {
        match &self.binding {
            Some(b) if b.conn_id == conn_id => {
                self.binding = None;
                true
            }
            _ => false,
        }
    }

    /// Pushes `msg` to the bound connection. Silently drops it if no
    /// connection is bound or the handler has gone away.
    pub(crate) fn send(&self, msg: ServerMessage) {
        if let Some(binding) = &self.binding {
            let _ = binding.sender.send(msg);
        }
    }

    /// Records `move_id`. Returns `false` if it was already recorded.
    pub(crate) fn record_move(&mut self, move_id: &str) -> bool {
        self.move_ids.insert(move_id.to_string())
    }

    /// Forgets `move_id` so a retry with the same id is accepted.
    pub(crate) fn release_move(&mut self, move_id: &str) {
        self.move_ids.remove(move_id);
    }

    pub(crate) fn view(&self) -> PlayerView {
        PlayerView {
            time_left: self.budget.remaining_ms(),
            present: self.is_present(),
        }
    }
}
