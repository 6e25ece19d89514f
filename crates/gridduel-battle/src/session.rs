//! Battle session actor: an isolated Tokio task that owns one battle.
//!
//! Every mutation of a battle (joins, placements, moves, timer ticks,
//! rules-service replies) is serialized through this task. Callers talk
//! to it through a [`SessionHandle`]; pushes to players go out through
//! each slot's [`PlayerSender`].
//!
//! Calls to the rules service run on their own tasks and report back
//! through an internal channel, tagged with a ticket. Only the reply
//! carrying the current ticket is applied; anything else is stale and
//! dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gridduel_protocol::{
    Cell, ConnectionId, ErrorCode, GameId, GameOverReason, Identity, Phase, PlayerView, Players,
    Rewards, Role, ServerMessage, StateView, UserId,
};
use gridduel_rules::{RulesError, RulesService, StepOutcome};
use gridduel_timer::{TickInfo, TurnTimer};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use crate::slot::{PlayerSender, PlayerSlot};
use crate::{BattleConfig, BattleError};

/// Source of session generations. Every spawned session gets a fresh
/// one, so a registry can tell two sessions with the same game id apart.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// Claim (or reclaim) a slot for `identity` on `conn_id`.
    Join {
        conn_id: ConnectionId,
        identity: Identity,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Role, BattleError>>,
    },

    /// Stake a secret cell.
    PlaceSecret { user_id: UserId, cell: i64 },

    /// Fire at a cell.
    Move {
        user_id: UserId,
        cell: i64,
        move_id: Option<String>,
    },

    /// The connection went away.
    Disconnect { conn_id: ConnectionId },

    /// Request a snapshot of the session.
    Info { reply: oneshot::Sender<SessionInfo> },

    /// Stop the actor immediately.
    Shutdown,
}

/// Sent to the registry when a finished session's grace period ends.
#[derive(Debug, Clone)]
pub(crate) struct Retirement {
    pub(crate) game_id: GameId,
    pub(crate) generation: u64,
}

/// Public facts about one claimed slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub user_id: UserId,
    pub time_left_ms: u64,
    pub present: bool,
    pub placed: bool,
}

/// A snapshot of a session, for operators and tests.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub game_id: GameId,
    pub generation: u64,
    pub phase: Phase,
    pub turn: Option<Role>,
    pub version: u64,
    /// Indexed by [`Role::index`].
    pub players: [Option<SlotInfo>; 2],
    /// Whether the turn countdown is running.
    pub timer_running: bool,
    /// Whether a step or concede call is awaiting its reply.
    pub resolving: bool,
}

impl SessionInfo {
    /// The slot held by `role`, if claimed.
    pub fn slot(&self, role: Role) -> Option<&SlotInfo> {
        self.players[role.index()].as_ref()
    }
}

/// Handle to a running session actor.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the session's id and
/// generation.
#[derive(Clone)]
pub struct SessionHandle {
    game_id: GameId,
    generation: u64,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// The game this session runs.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Distinguishes this session from earlier or later ones with the
    /// same game id.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Joins `identity` on `conn_id`. Pushes for this player are
    /// delivered through `sender`, starting with `joined` and a state
    /// snapshot.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        identity: Identity,
        sender: PlayerSender,
    ) -> Result<Role, BattleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Join {
            conn_id,
            identity,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Stakes `user_id`'s secret cell (fire-and-forget).
    pub async fn place_secret(&self, user_id: UserId, cell: i64) -> Result<(), BattleError> {
        self.send(SessionCommand::PlaceSecret { user_id, cell }).await
    }

    /// Fires `user_id`'s shot at `cell` (fire-and-forget).
    pub async fn make_move(
        &self,
        user_id: UserId,
        cell: i64,
        move_id: Option<String>,
    ) -> Result<(), BattleError> {
        self.send(SessionCommand::Move {
            user_id,
            cell,
            move_id,
        })
        .await
    }

    /// Unbinds `conn_id` from its slot, if it holds one.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), BattleError> {
        self.send(SessionCommand::Disconnect { conn_id }).await
    }

    /// Requests a snapshot.
    pub async fn info(&self) -> Result<SessionInfo, BattleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Info { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the session to stop.
    pub async fn shutdown(&self) -> Result<(), BattleError> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), BattleError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> BattleError {
        BattleError::Unavailable(self.game_id.clone())
    }
}

/// A rules-service reply routed back into the actor.
enum RulesReply {
    Step {
        ticket: u64,
        role: Role,
        cell: Cell,
        move_id: Option<String>,
        result: Result<StepOutcome, RulesError>,
    },
    Concede {
        ticket: u64,
        winner: Role,
        result: Result<Rewards, RulesError>,
    },
}

/// The internal session state. Runs inside a Tokio task.
struct BattleActor<R: RulesService> {
    game_id: GameId,
    generation: u64,
    config: BattleConfig,
    phase: Phase,
    turn: Option<Role>,
    version: u64,
    /// Indexed by [`Role::index`].
    slots: [Option<PlayerSlot>; 2],
    clock: TurnTimer,
    /// When the toss animation ends and the first turn begins.
    toss_at: Option<Instant>,
    /// When a finished session leaves the registry.
    retire_at: Option<Instant>,
    /// Ticket of the step/concede whose reply will be applied.
    in_flight: Option<u64>,
    /// Set when the mover's budget ran out while their shot was still
    /// resolving. The shot's outcome decides what happens next.
    expired: Option<Role>,
    next_ticket: u64,
    rules: Arc<R>,
    receiver: mpsc::Receiver<SessionCommand>,
    rules_tx: mpsc::UnboundedSender<RulesReply>,
    rules_rx: mpsc::UnboundedReceiver<RulesReply>,
    retire_tx: mpsc::UnboundedSender<Retirement>,
}

impl<R: RulesService> BattleActor<R> {
    /// Runs the actor loop until shutdown or retirement.
    async fn run(mut self) {
        info!(game_id = %self.game_id, generation = self.generation, "battle session started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(SessionCommand::Shutdown) => {
                        info!(game_id = %self.game_id, "battle session shutting down");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(reply) = self.rules_rx.recv() => self.handle_rules_reply(reply),
                tick = self.clock.wait_for_tick() => self.handle_tick(tick),
                () = sleep_until_opt(self.toss_at) => self.handle_toss_elapsed(),
                () = sleep_until_opt(self.retire_at) => {
                    info!(game_id = %self.game_id, "finished battle retiring");
                    let _ = self.retire_tx.send(Retirement {
                        game_id: self.game_id.clone(),
                        generation: self.generation,
                    });
                    break;
                }
            }
        }

        self.clock.stop();
        info!(game_id = %self.game_id, "battle session stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join {
                conn_id,
                identity,
                sender,
                reply,
            } => {
                let result = self.handle_join(conn_id, identity, sender);
                let _ = reply.send(result);
            }
            SessionCommand::PlaceSecret { user_id, cell } => self.handle_place(user_id, cell),
            SessionCommand::Move {
                user_id,
                cell,
                move_id,
            } => self.handle_move(user_id, cell, move_id),
            SessionCommand::Disconnect { conn_id } => self.handle_disconnect(conn_id),
            SessionCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            SessionCommand::Shutdown => {}
        }
    }

    // -----------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        identity: Identity,
        sender: PlayerSender,
    ) -> Result<Role, BattleError> {
        if self.phase.is_finished() {
            debug!(game_id = %self.game_id, user_id = %identity.user_id, "join on finished battle rejected");
            return Err(BattleError::GameFinished(self.game_id.clone()));
        }

        let role = match self.role_of(&identity.user_id) {
            Some(role) => {
                let slot = self.slots[role.index()].as_mut();
                if let Some(slot) = slot {
                    let user_id = identity.user_id.clone();
                    slot.identity = identity;
                    let replaced = slot.bind(conn_id, sender);
                    info!(
                        game_id = %self.game_id,
                        %user_id,
                        %role,
                        %conn_id,
                        replaced = ?replaced,
                        "player rebound"
                    );
                }
                role
            }
            None => {
                let free = if self.phase == Phase::WaitingPlayers {
                    Role::ALL
                        .into_iter()
                        .find(|r| self.slots[r.index()].is_none())
                } else {
                    None
                };
                let Some(role) = free else {
                    debug!(game_id = %self.game_id, user_id = %identity.user_id, "join on full battle rejected");
                    return Err(BattleError::RoomFull(self.game_id.clone()));
                };
                info!(game_id = %self.game_id, user_id = %identity.user_id, %role, %conn_id, "player joined");
                let mut slot = PlayerSlot::new(identity, self.config.budget());
                slot.bind(conn_id, sender);
                self.slots[role.index()] = Some(slot);
                role
            }
        };

        if self.phase == Phase::WaitingPlayers && self.slots.iter().all(Option::is_some) {
            self.phase = Phase::Placing;
            info!(game_id = %self.game_id, "both players seated, placing secrets");
        }

        self.version += 1;
        if let Some(slot) = self.slot(role) {
            slot.send(ServerMessage::Joined { role });
        }
        self.push_state();
        Ok(role)
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        let Some(role) = Role::ALL.into_iter().find(|r| {
            self.slots[r.index()]
                .as_mut()
                .is_some_and(|slot| slot.unbind(conn_id))
        }) else {
            return;
        };
        info!(game_id = %self.game_id, %role, %conn_id, "player disconnected");

        if self.phase.is_finished() {
            return;
        }
        self.version += 1;
        self.push_state();
    }

    // -----------------------------------------------------------------
    // Placing and toss
    // -----------------------------------------------------------------

    fn handle_place(&mut self, user_id: UserId, raw_cell: i64) {
        if self.phase != Phase::Placing {
            debug!(game_id = %self.game_id, %user_id, phase = %self.phase, "placement outside placing phase ignored");
            return;
        }
        let Some(role) = self.role_of(&user_id) else {
            debug!(game_id = %self.game_id, %user_id, "placement from non-player ignored");
            return;
        };
        let Some(cell) = Cell::new(raw_cell) else {
            debug!(game_id = %self.game_id, %role, cell = raw_cell, "placement off the grid ignored");
            return;
        };
        let Some(slot) = self.slots[role.index()].as_mut() else {
            return;
        };
        if slot.secret.is_some() {
            debug!(game_id = %self.game_id, %role, "repeat placement ignored");
            return;
        }

        slot.secret = Some(cell);
        let identity = slot.identity.clone();
        info!(game_id = %self.game_id, %role, "secret placed");
        self.spawn_place(identity, cell);

        self.version += 1;
        self.push_state();

        let all_placed = self
            .slots
            .iter()
            .all(|s| s.as_ref().is_some_and(|s| s.secret.is_some()));
        if all_placed {
            self.begin_toss();
        }
    }

    fn begin_toss(&mut self) {
        let first = if rand::random::<bool>() {
            Role::A
        } else {
            Role::B
        };
        let seed: u32 = rand::random();

        self.phase = Phase::Toss;
        self.turn = Some(first);
        self.toss_at = Some(Instant::now() + self.config.toss_delay);
        self.version += 1;
        info!(game_id = %self.game_id, first_turn = %first, "coin toss");

        self.broadcast(ServerMessage::Toss {
            first_turn: first,
            seed,
        });
        self.push_state();
    }

    fn handle_toss_elapsed(&mut self) {
        self.toss_at = None;
        let (Phase::Toss, Some(first)) = (self.phase, self.turn) else {
            return;
        };

        self.phase = Phase::turn_of(first);
        self.clock.start();
        self.version += 1;
        info!(game_id = %self.game_id, phase = %self.phase, "first turn");
        self.push_state();
    }

    // -----------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------

    fn handle_move(&mut self, user_id: UserId, raw_cell: i64, move_id: Option<String>) {
        if !self.phase.is_turn() {
            debug!(game_id = %self.game_id, %user_id, phase = %self.phase, "move outside turn phase ignored");
            return;
        }
        let Some(role) = self.role_of(&user_id) else {
            debug!(game_id = %self.game_id, %user_id, "move from non-player ignored");
            return;
        };
        if self.turn != Some(role) {
            debug!(game_id = %self.game_id, %role, "move out of turn ignored");
            return;
        }
        if self.in_flight.is_some() {
            debug!(game_id = %self.game_id, %role, "move while a shot is resolving ignored");
            return;
        }
        let Some(cell) = Cell::new(raw_cell) else {
            debug!(game_id = %self.game_id, %role, cell = raw_cell, "move off the grid ignored");
            return;
        };
        let Some(slot) = self.slots[role.index()].as_mut() else {
            return;
        };
        if let Some(id) = &move_id {
            if !slot.record_move(id) {
                debug!(game_id = %self.game_id, %role, move_id = %id, "duplicate move ignored");
                return;
            }
        }

        let identity = slot.identity.clone();
        let ticket = self.issue_ticket();
        debug!(game_id = %self.game_id, %role, %cell, ticket, "resolving shot");
        self.spawn_step(ticket, role, identity, cell, move_id);
    }

    fn handle_rules_reply(&mut self, reply: RulesReply) {
        match reply {
            RulesReply::Step {
                ticket,
                role,
                cell,
                move_id,
                result,
            } => {
                if !self.take_ticket(ticket) {
                    debug!(game_id = %self.game_id, ticket, "stale shot result discarded");
                    return;
                }
                let expired = self.expired.take();
                match result {
                    Ok(StepOutcome::Hit(rewards)) => {
                        info!(game_id = %self.game_id, %role, %cell, "hit");
                        self.broadcast(ServerMessage::MoveResult {
                            role,
                            cell,
                            hit: true,
                            rewards: Some(rewards.clone()),
                        });
                        self.finish(role, GameOverReason::Hit, rewards);
                    }
                    Ok(StepOutcome::Miss) if expired.is_some() => {
                        debug!(game_id = %self.game_id, %role, %cell, "miss after time ran out");
                        self.broadcast(ServerMessage::MoveResult {
                            role,
                            cell,
                            hit: false,
                            rewards: None,
                        });
                        self.begin_timeout(role);
                    }
                    Ok(StepOutcome::Miss) => self.apply_miss(role, cell),
                    Err(e) if expired.is_some() => {
                        warn!(game_id = %self.game_id, %role, error = %e, "shot unresolved after time ran out");
                        self.begin_timeout(role);
                    }
                    Err(e) => {
                        warn!(game_id = %self.game_id, %role, error = %e, "shot could not be resolved, turn kept");
                        if let (Some(id), Some(slot)) =
                            (move_id.as_deref(), self.slots[role.index()].as_mut())
                        {
                            slot.release_move(id);
                        }
                        self.broadcast(ServerMessage::error(
                            ErrorCode::StepFailed,
                            "move could not be resolved, try again",
                        ));
                    }
                }
            }
            RulesReply::Concede {
                ticket,
                winner,
                result,
            } => {
                if !self.take_ticket(ticket) {
                    debug!(game_id = %self.game_id, ticket, "stale concede result discarded");
                    return;
                }
                let rewards = result.unwrap_or_else(|e| {
                    warn!(game_id = %self.game_id, error = %e, "concede failed, finishing without rewards");
                    Vec::new()
                });
                self.finish(winner, GameOverReason::Timeout, rewards);
            }
        }
    }

    fn apply_miss(&mut self, role: Role, cell: Cell) {
        let bonus = self.config.miss_bonus;
        if let Some(slot) = self.slots[role.index()].as_mut() {
            slot.budget.credit(bonus);
        }

        let next = role.other();
        self.phase = Phase::turn_of(next);
        self.turn = Some(next);
        self.clock.start();
        self.version += 1;
        debug!(game_id = %self.game_id, %role, %cell, "miss");

        self.broadcast(ServerMessage::MoveResult {
            role,
            cell,
            hit: false,
            rewards: None,
        });
        self.push_state();
    }

    fn handle_tick(&mut self, tick: TickInfo) {
        let (true, Some(active)) = (self.phase.is_turn(), self.turn) else {
            self.clock.stop();
            return;
        };
        let Some(slot) = self.slots[active.index()].as_mut() else {
            return;
        };

        let left = slot.budget.drain(tick.charge());
        if !left.is_zero() {
            self.version += 1;
            trace!(game_id = %self.game_id, role = %active, left_ms = left.as_millis() as u64, "tick");
            self.push_state();
            return;
        }

        self.clock.stop();
        info!(game_id = %self.game_id, role = %active, "turn time exhausted");

        if self.in_flight.is_some() {
            // A hit still wins; the step reply settles it.
            debug!(game_id = %self.game_id, role = %active, "timeout waits for the shot in flight");
            self.expired = Some(active);
            return;
        }
        self.begin_timeout(active);
    }

    /// Asks the rules service to record `loser`'s timeout. The game
    /// finishes when the concede reply arrives.
    fn begin_timeout(&mut self, loser: Role) {
        let winner = loser.other();
        let (Some(loser_identity), Some(winner_id)) = (
            self.slot(loser).map(|s| s.identity.clone()),
            self.slot(winner).map(|s| s.identity.user_id.clone()),
        ) else {
            return;
        };
        let ticket = self.issue_ticket();
        self.spawn_concede(ticket, loser_identity, winner, winner_id);
    }

    fn finish(&mut self, winner: Role, reason: GameOverReason, rewards: Rewards) {
        self.phase = Phase::Finished;
        self.turn = None;
        self.clock.stop();
        self.toss_at = None;
        self.in_flight = None;
        self.expired = None;
        self.retire_at = Some(Instant::now() + self.config.finish_grace);
        self.version += 1;
        info!(game_id = %self.game_id, %winner, ?reason, "battle finished");

        self.push_state();
        self.broadcast(ServerMessage::GameOver {
            winner,
            reason,
            rewards: (!rewards.is_empty()).then_some(rewards),
        });
    }

    // -----------------------------------------------------------------
    // Rules-service calls
    // -----------------------------------------------------------------

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.in_flight = Some(self.next_ticket);
        self.next_ticket
    }

    /// Clears the in-flight ticket if it is `ticket`.
    fn take_ticket(&mut self, ticket: u64) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    fn spawn_place(&self, identity: Identity, cell: Cell) {
        let rules = Arc::clone(&self.rules);
        let game_id = self.game_id.clone();
        tokio::spawn(async move {
            if let Err(e) = rules.place(&identity, &game_id, cell).await {
                warn!(%game_id, user_id = %identity.user_id, error = %e, "placement not recorded by rules service");
            }
        });
    }

    fn spawn_step(
        &self,
        ticket: u64,
        role: Role,
        identity: Identity,
        cell: Cell,
        move_id: Option<String>,
    ) {
        let rules = Arc::clone(&self.rules);
        let game_id = self.game_id.clone();
        let tx = self.rules_tx.clone();
        tokio::spawn(async move {
            let result = rules.step(&identity, &game_id, cell).await;
            let _ = tx.send(RulesReply::Step {
                ticket,
                role,
                cell,
                move_id,
                result,
            });
        });
    }

    fn spawn_concede(&self, ticket: u64, loser: Identity, winner: Role, winner_id: UserId) {
        let rules = Arc::clone(&self.rules);
        let game_id = self.game_id.clone();
        let tx = self.rules_tx.clone();
        let deadline = self.config.concede_timeout;
        tokio::spawn(async move {
            let result = time::timeout(deadline, rules.concede(&loser, &game_id, &winner_id))
                .await
                .unwrap_or(Err(RulesError::TimedOut { action: "concede" }));
            let _ = tx.send(RulesReply::Concede {
                ticket,
                winner,
                result,
            });
        });
    }

    // -----------------------------------------------------------------
    // Projection
    // -----------------------------------------------------------------

    fn slot(&self, role: Role) -> Option<&PlayerSlot> {
        self.slots[role.index()].as_ref()
    }

    fn role_of(&self, user_id: &UserId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|r| self.slot(*r).is_some_and(|s| s.identity.user_id == *user_id))
    }

    fn player_view(&self, role: Role) -> PlayerView {
        self.slot(role).map(PlayerSlot::view).unwrap_or(PlayerView {
            time_left: self.config.budget().remaining_ms(),
            present: false,
        })
    }

    /// Sends every bound slot its own view of the current state.
    fn push_state(&self) {
        let players = Players {
            a: self.player_view(Role::A),
            b: self.player_view(Role::B),
        };
        for role in Role::ALL {
            if let Some(slot) = self.slot(role) {
                slot.send(ServerMessage::State(StateView {
                    version: self.version,
                    id: self.game_id.clone(),
                    phase: self.phase,
                    turn: self.turn,
                    your_role: role,
                    players,
                }));
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for slot in self.slots.iter().flatten() {
            slot.send(msg.clone());
        }
    }

    fn info(&self) -> SessionInfo {
        let slot_info = |role: Role| {
            self.slot(role).map(|s| SlotInfo {
                user_id: s.identity.user_id.clone(),
                time_left_ms: s.budget.remaining_ms(),
                present: s.is_present(),
                placed: s.secret.is_some(),
            })
        };
        SessionInfo {
            game_id: self.game_id.clone(),
            generation: self.generation,
            phase: self.phase,
            turn: self.turn,
            version: self.version,
            players: [slot_info(Role::A), slot_info(Role::B)],
            timer_running: self.clock.is_running(),
            resolving: self.in_flight.is_some(),
        }
    }
}

/// Sleeps until `deadline`, or forever if there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a new session actor and returns a handle to it.
pub(crate) fn spawn_session<R: RulesService>(
    game_id: GameId,
    config: BattleConfig,
    rules: Arc<R>,
    retire_tx: mpsc::UnboundedSender<Retirement>,
) -> SessionHandle {
    let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (rules_tx, rules_rx) = mpsc::unbounded_channel();

    let actor = BattleActor {
        game_id: game_id.clone(),
        generation,
        clock: TurnTimer::new(config.timer_config()),
        config,
        phase: Phase::WaitingPlayers,
        turn: None,
        version: 0,
        slots: [None, None],
        toss_at: None,
        retire_at: None,
        in_flight: None,
        expired: None,
        next_ticket: 0,
        rules,
        receiver: rx,
        rules_tx,
        rules_rx,
        retire_tx,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        game_id,
        generation,
        sender: tx,
    }
}
