//! Shared fixtures for battle integration tests: a scripted rules
//! service and a seat helper that plays one side of a battle.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridduel_battle::{BattleConfig, BattleError, SessionHandle, SessionRegistry};
use gridduel_protocol::{Cell, ConnectionId, GameId, Identity, Phase, Rewards, Role, ServerMessage, UserId};
use gridduel_rules::{RulesError, RulesService, StepOutcome};
use tokio::sync::{Notify, mpsc};

// =========================================================================
// Scripted rules service
// =========================================================================

/// A call the session made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Place { user: String, cell: u8 },
    Step { user: String, cell: u8 },
    Concede { loser: String, winner: String },
}

/// One scripted `step` reply, optionally held until `gate` is notified.
pub struct StepScript {
    pub outcome: Result<StepOutcome, ()>,
    pub gate: Option<Arc<Notify>>,
}

impl StepScript {
    pub fn miss() -> Self {
        Self { outcome: Ok(StepOutcome::Miss), gate: None }
    }

    pub fn hit(rewards: Rewards) -> Self {
        Self { outcome: Ok(StepOutcome::Hit(rewards)), gate: None }
    }

    pub fn fail() -> Self {
        Self { outcome: Err(()), gate: None }
    }

    pub fn held(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Rules service answering from a script. Unscripted steps miss;
/// concede answers with `concede_result`, after `concede_gate` if set.
pub struct ScriptedRules {
    steps: Mutex<VecDeque<StepScript>>,
    concede_result: Mutex<Result<Rewards, ()>>,
    concede_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRules {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            concede_result: Mutex::new(Ok(Vec::new())),
            concede_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script_step(&self, script: StepScript) {
        self.steps.lock().unwrap().push_back(script);
    }

    pub fn set_concede(&self, result: Result<Rewards, ()>) {
        *self.concede_result.lock().unwrap() = result;
    }

    /// Holds every concede until `gate` is notified.
    pub fn hold_concede(&self, gate: Arc<Notify>) {
        *self.concede_gate.lock().unwrap() = Some(gate);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn step_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Step { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unavailable(action: &'static str) -> RulesError {
    RulesError::Status {
        action,
        status: 503,
        body: String::new(),
    }
}

impl RulesService for ScriptedRules {
    async fn place(&self, identity: &Identity, _: &GameId, cell: Cell) -> Result<(), RulesError> {
        self.record(Call::Place {
            user: identity.user_id.to_string(),
            cell: cell.value(),
        });
        Ok(())
    }

    async fn step(&self, identity: &Identity, _: &GameId, cell: Cell) -> Result<StepOutcome, RulesError> {
        self.record(Call::Step {
            user: identity.user_id.to_string(),
            cell: cell.value(),
        });
        let script = self.steps.lock().unwrap().pop_front();
        let script = script.unwrap_or_else(StepScript::miss);
        if let Some(gate) = script.gate {
            gate.notified().await;
        }
        script.outcome.map_err(|()| unavailable("step"))
    }

    async fn concede(&self, loser: &Identity, _: &GameId, winner: &UserId) -> Result<Rewards, RulesError> {
        self.record(Call::Concede {
            loser: loser.user_id.to_string(),
            winner: winner.to_string(),
        });
        let gate = self.concede_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let result = self.concede_result.lock().unwrap().clone();
        result.map_err(|()| unavailable("concede"))
    }
}

// =========================================================================
// Seats
// =========================================================================

/// One player's side of a battle: identity, connection, and the pushes
/// the session sent it.
pub struct Seat {
    pub identity: Identity,
    pub conn: ConnectionId,
    pub rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Seat {
    pub fn user(&self) -> UserId {
        self.identity.user_id.clone()
    }

    /// Waits for the next push.
    pub async fn next(&mut self) -> ServerMessage {
        self.rx.recv().await.expect("session dropped the player")
    }

    /// Waits for the first push matching `pred`, discarding the rest.
    pub async fn until(&mut self, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let msg = self.next().await;
            if pred(&msg) {
                return msg;
            }
        }
    }

    /// Everything already delivered, without waiting.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

/// Joins `user` on connection `conn`.
pub async fn seat(handle: &SessionHandle, user: &str, conn: u64) -> (Result<Role, BattleError>, Seat) {
    let identity = Identity::new(user, format!("{user}-token"));
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = ConnectionId::new(conn);
    let result = handle.join(conn, identity.clone(), tx).await;
    (result, Seat { identity, conn, rx })
}

// =========================================================================
// Battle setup
// =========================================================================

pub fn game() -> GameId {
    GameId::new("g-1")
}

pub fn registry(rules: &Arc<ScriptedRules>, config: BattleConfig) -> SessionRegistry<ScriptedRules> {
    SessionRegistry::new(Arc::clone(rules), config)
}

pub fn is_state(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::State(_))
}

pub fn is_turn_state(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::State(view) if view.phase.is_turn())
}

pub fn is_move_result(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::MoveResult { .. })
}

pub fn is_game_over(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::GameOver { .. })
}

/// A battle that reached its first turn.
pub struct Battle {
    pub handle: SessionHandle,
    /// Indexed by `Role::index`: alice is A, bob is B.
    pub seats: [Seat; 2],
    pub first: Role,
}

impl Battle {
    pub fn seat(&mut self, role: Role) -> &mut Seat {
        &mut self.seats[role.index()]
    }
}

/// Seats alice and bob, places secrets 5 and 9, and waits out the toss.
pub async fn start_battle(registry: &SessionRegistry<ScriptedRules>) -> Battle {
    let handle = registry.get(&game()).await;
    let (_, mut a) = seat(&handle, "alice", 1).await;
    let (_, b) = seat(&handle, "bob", 2).await;

    handle.place_secret(a.user(), 5).await.unwrap();
    handle.place_secret(b.user(), 9).await.unwrap();

    let ServerMessage::Toss { first_turn, .. } = a.until(|m| matches!(m, ServerMessage::Toss { .. })).await else {
        unreachable!()
    };
    a.until(is_turn_state).await;

    let mut battle = Battle {
        handle,
        seats: [a, b],
        first: first_turn,
    };
    battle.seats[Role::B.index()].until(is_turn_state).await;
    battle
}

/// Config with a short starting budget so timeouts come quickly.
pub fn short_config(initial_ms: u64) -> BattleConfig {
    BattleConfig {
        initial_time: Duration::from_millis(initial_ms),
        ..BattleConfig::default()
    }
}

/// Current phase of the session.
pub async fn phase(handle: &SessionHandle) -> Phase {
    handle.info().await.unwrap().phase
}
