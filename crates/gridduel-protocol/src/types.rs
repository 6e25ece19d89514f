//! Core protocol types for gridduel's wire format.
//!
//! Every type here either travels "on the wire" as JSON or is a value
//! type shared by the gateway and the battle layer (identifiers, roles,
//! phases, grid cells).
//!
//! Field names on the wire are camelCase (`gameId`, `moveId`,
//! `yourRole`) because the clients are browser apps; message tags are
//! snake_case (`join_game`, `move_result`).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The current protocol version. Clients must send this in their `hello`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of cells on the battle grid. Valid cells are `0..GRID_CELLS`.
pub const GRID_CELLS: u8 = 16;

/// Reward payload issued by the rules service, forwarded verbatim.
pub type Rewards = Vec<serde_json::Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque lobby/game identifier, chosen upstream by matchmaking.
///
/// Newtype over `String` so a `GameId` can't be passed where a
/// [`UserId`] is expected. `#[serde(transparent)]` keeps the wire form a
/// plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// Creates a `GameId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Stable user identifier issued by the auth provider.
///
/// Used to address rewards to the correct winner and to recognise a
/// player re-joining a game from a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who a connection belongs to, as established by the gateway.
///
/// `credential` is the raw token the client authenticated with. The
/// battle layer replays it as the bearer credential when calling the
/// rules service on this player's behalf, so it is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub credential: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Opaque identifier for a live transport connection.
///
/// Assigned by the transport on accept. Battle sessions store it as the
/// "connection ref" of a player slot; it never appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Game value types
// ---------------------------------------------------------------------------

/// One of the two fixed player positions in a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
}

impl Role {
    /// Both roles, in slot-assignment order.
    pub const ALL: [Role; 2] = [Role::A, Role::B];

    /// The opposing role.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Slot index: `A = 0`, `B = 1`.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// The lifecycle phase of a battle session.
///
/// ```text
/// WaitingPlayers → Placing → Toss → TurnA ⇄ TurnB → Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitingPlayers,
    Placing,
    Toss,
    TurnA,
    TurnB,
    Finished,
}

impl Phase {
    /// The turn phase in which `role` is the active player.
    pub fn turn_of(role: Role) -> Self {
        match role {
            Role::A => Self::TurnA,
            Role::B => Self::TurnB,
        }
    }

    /// Returns `true` for `TurnA` and `TurnB`.
    pub fn is_turn(self) -> bool {
        matches!(self, Self::TurnA | Self::TurnB)
    }

    /// Returns `true` for the phases in which `turn` must be set.
    pub fn has_turn(self) -> bool {
        matches!(self, Self::Toss | Self::TurnA | Self::TurnB)
    }

    /// Returns `true` once the battle is over.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingPlayers => "WaitingPlayers",
            Self::Placing => "Placing",
            Self::Toss => "Toss",
            Self::TurnA => "TurnA",
            Self::TurnB => "TurnB",
            Self::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// A validated grid position in `0..GRID_CELLS`.
///
/// Clients send raw integers; the battle layer converts them with
/// [`Cell::new`] and silently drops anything out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cell(u8);

impl Cell {
    /// Returns `Some` if `raw` is a cell on the grid.
    pub fn new(raw: i64) -> Option<Self> {
        if (0..i64::from(GRID_CELLS)).contains(&raw) {
            Some(Self(raw as u8))
        } else {
            None
        }
    }

    /// The cell index.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// The winner hit the opponent's secret cell.
    Hit,
    /// The loser's time budget ran out.
    Timeout,
}

/// Machine-readable error codes carried by [`ServerMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Join attempted on a battle that already ended.
    GameFinished,
    /// Join attempted on a battle whose two slots are taken.
    RoomFull,
    /// The rules service failed to resolve a move; the move may be retried.
    StepFailed,
    /// The frame could not be decoded or was not allowed at this point.
    BadRequest,
    /// The `hello` token was rejected.
    Unauthorized,
    /// The `hello` carried an unsupported protocol version.
    VersionMismatch,
    /// A game action arrived before `join_game`.
    NotInGame,
    /// The same user connected elsewhere; this connection is being closed.
    SessionReplaced,
}

impl ErrorCode {
    /// The wire spelling of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameFinished => "GAME_FINISHED",
            Self::RoomFull => "ROOM_FULL",
            Self::StepFailed => "STEP_FAILED",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::VersionMismatch => "VERSION_MISMATCH",
            Self::NotInGame => "NOT_IN_GAME",
            Self::SessionReplaced => "SESSION_REPLACED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State projection
// ---------------------------------------------------------------------------

/// Public view of one player slot. Secrets are never part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Remaining turn time in milliseconds.
    pub time_left: u64,
    /// Whether the slot currently has a live connection.
    pub present: bool,
}

/// Both slots, keyed `A` and `B` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    #[serde(rename = "A")]
    pub a: PlayerView,
    #[serde(rename = "B")]
    pub b: PlayerView,
}

impl Players {
    /// The view for `role`.
    pub fn get(&self, role: Role) -> &PlayerView {
        match role {
            Role::A => &self.a,
            Role::B => &self.b,
        }
    }
}

/// Per-connection snapshot pushed whenever the session version changes.
///
/// Clients discard any view whose `version` is not strictly greater than
/// the last one they applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub version: u64,
    pub id: GameId,
    pub phase: Phase,
    pub turn: Option<Role>,
    pub your_role: Role,
    pub players: Players,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Client → server actions.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "move", "cell": 4, "moveId": "m-1" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// First frame on every connection: authenticate and pick a version.
    Hello { token: String, version: u32 },

    /// Bind this connection to a battle, creating it if needed.
    JoinGame { game_id: GameId },

    /// Stake the secret cell (Placing phase only).
    PlaceSecret {
        #[serde(deserialize_with = "raw_cell")]
        cell: i64,
    },

    /// Fire at a cell. `move_id` makes retries idempotent.
    Move {
        #[serde(deserialize_with = "raw_cell")]
        cell: i64,
        #[serde(default)]
        move_id: Option<String>,
    },

    /// Keep-alive; answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// The client is closing the connection.
    Leave {
        #[serde(default)]
        reason: String,
    },
}

/// Reads any JSON number as a raw cell. Numbers that don't fit an
/// `i64` (huge unsigned values, fractions) become a value no grid
/// contains, so the action is dropped like any other off-grid cell.
fn raw_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    Ok(number.as_i64().unwrap_or(i64::MAX))
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome { user_id: UserId, server_time: u64 },

    /// Reply to a heartbeat.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// This connection now plays `role`.
    Joined { role: Role },

    /// Tailored state projection.
    State(StateView),

    /// Result of the coin flip. `seed` drives the client-side animation.
    Toss { first_turn: Role, seed: u32 },

    /// A resolved shot.
    MoveResult {
        role: Role,
        cell: Cell,
        hit: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rewards: Option<Rewards>,
    },

    /// The battle is over.
    GameOver {
        winner: Role,
        reason: GameOverReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rewards: Option<Rewards>,
    },

    /// Something went wrong; see [`ErrorCode`].
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Shorthand for building an [`ServerMessage::Error`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> StateView {
        StateView {
            version: 7,
            id: GameId::new("lobby-1"),
            phase: Phase::TurnB,
            turn: Some(Role::B),
            your_role: Role::A,
            players: Players {
                a: PlayerView { time_left: 25_000, present: true },
                b: PlayerView { time_left: 24_750, present: false },
            },
        }
    }

    // =====================================================================
    // Value types
    // =====================================================================

    #[test]
    fn test_cell_new_accepts_grid_range() {
        assert_eq!(Cell::new(0).map(Cell::value), Some(0));
        assert_eq!(Cell::new(15).map(Cell::value), Some(15));
    }

    #[test]
    fn test_cell_new_rejects_out_of_range() {
        assert!(Cell::new(-1).is_none());
        assert!(Cell::new(16).is_none());
        assert!(Cell::new(i64::MAX).is_none());
    }

    #[test]
    fn test_role_other_swaps() {
        assert_eq!(Role::A.other(), Role::B);
        assert_eq!(Role::B.other(), Role::A);
        assert_eq!(Role::B.index(), 1);
    }

    #[test]
    fn test_phase_turn_helpers() {
        assert_eq!(Phase::turn_of(Role::A), Phase::TurnA);
        assert!(Phase::TurnB.is_turn());
        assert!(!Phase::Toss.is_turn());
        assert!(Phase::Toss.has_turn());
        assert!(!Phase::Placing.has_turn());
        assert!(!Phase::Finished.has_turn());
        assert!(Phase::Finished.is_finished());
    }

    #[test]
    fn test_identity_debug_redacts_credential() {
        let identity = Identity::new("user-1", "secret-token");
        let printed = format!("{identity:?}");
        assert!(printed.contains("user-1"));
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).into_inner(), 7);
    }

    // =====================================================================
    // Client messages
    // =====================================================================

    #[test]
    fn test_client_join_game_uses_camel_case_fields() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "join_game", "gameId": "g-9"})).unwrap();
        assert_eq!(msg, ClientMessage::JoinGame { game_id: GameId::new("g-9") });
    }

    #[test]
    fn test_client_move_without_move_id_defaults_to_none() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "move", "cell": 3})).unwrap();
        assert_eq!(msg, ClientMessage::Move { cell: 3, move_id: None });
    }

    #[test]
    fn test_client_move_keeps_negative_cell_for_later_validation() {
        let msg: ClientMessage = serde_json::from_value(
            json!({"type": "move", "cell": -4, "moveId": "m-1"}),
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Move { cell: -4, move_id: Some("m-1".into()) }
        );
    }

    #[test]
    fn test_client_move_cell_beyond_i64_decodes_off_grid() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"move","cell":18446744073709551615,"moveId":"m-1"}"#,
        )
        .unwrap();

        let ClientMessage::Move { cell, move_id } = msg else {
            panic!("expected move, got {msg:?}");
        };
        assert_eq!(move_id.as_deref(), Some("m-1"));
        assert_eq!(Cell::new(cell), None);
    }

    #[test]
    fn test_client_place_secret_fractional_cell_decodes_off_grid() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"place_secret","cell":2.5}"#).unwrap();

        let ClientMessage::PlaceSecret { cell } = msg else {
            panic!("expected place_secret, got {msg:?}");
        };
        assert_eq!(Cell::new(cell), None);
    }

    #[test]
    fn test_client_move_string_cell_returns_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "move", "cell": "4"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_unknown_type_returns_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "fly_to_moon"}));
        assert!(result.is_err());
    }

    // =====================================================================
    // Server messages
    // =====================================================================

    #[test]
    fn test_server_state_json_format() {
        let json = serde_json::to_value(ServerMessage::State(view())).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["version"], 7);
        assert_eq!(json["id"], "lobby-1");
        assert_eq!(json["phase"], "turn_b");
        assert_eq!(json["turn"], "B");
        assert_eq!(json["yourRole"], "A");
        assert_eq!(json["players"]["A"]["timeLeft"], 25_000);
        assert_eq!(json["players"]["B"]["present"], false);
    }

    #[test]
    fn test_server_state_has_no_secret_field() {
        let json = serde_json::to_string(&ServerMessage::State(view())).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_server_toss_json_format() {
        let json = serde_json::to_value(ServerMessage::Toss {
            first_turn: Role::B,
            seed: 42,
        })
        .unwrap();
        assert_eq!(json, json!({"type": "toss", "firstTurn": "B", "seed": 42}));
    }

    #[test]
    fn test_server_game_over_omits_missing_rewards() {
        let json = serde_json::to_value(ServerMessage::GameOver {
            winner: Role::A,
            reason: GameOverReason::Timeout,
            rewards: None,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({"type": "game_over", "winner": "A", "reason": "timeout"})
        );
    }

    #[test]
    fn test_server_game_over_carries_rewards_verbatim() {
        let rewards = vec![json!({"item": "gold", "amount": 50})];
        let json = serde_json::to_value(ServerMessage::GameOver {
            winner: Role::B,
            reason: GameOverReason::Hit,
            rewards: Some(rewards.clone()),
        })
        .unwrap();
        assert_eq!(json["rewards"], json!(rewards));
    }

    #[test]
    fn test_server_error_uses_screaming_code() {
        let json = serde_json::to_value(ServerMessage::error(
            ErrorCode::GameFinished,
            "game finished",
        ))
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "GAME_FINISHED");
        assert_eq!(ErrorCode::StepFailed.to_string(), "STEP_FAILED");
    }

    #[test]
    fn test_server_move_result_decodes() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "type": "move_result", "role": "A", "cell": 5, "hit": false
        }))
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::MoveResult {
                role: Role::A,
                cell: Cell::new(5).unwrap(),
                hit: false,
                rewards: None,
            }
        );
    }
}
