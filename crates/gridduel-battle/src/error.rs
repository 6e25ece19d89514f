//! Error types for the battle layer.

use gridduel_protocol::{ErrorCode, GameId};

/// Room-level rejections and session availability errors.
///
/// Invalid game actions (wrong turn, bad cell, repeated move) are not
/// errors; sessions drop them silently.
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    /// The battle already ended.
    #[error("game {0} is finished")]
    GameFinished(GameId),

    /// Both player slots are taken by other users.
    #[error("game {0} is full")]
    RoomFull(GameId),

    /// The session's actor is gone (retired or deleted).
    #[error("game {0} is unavailable")]
    Unavailable(GameId),
}

impl BattleError {
    /// The code sent to the rejected connection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::GameFinished(_) => ErrorCode::GameFinished,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::Unavailable(_) => ErrorCode::BadRequest,
        }
    }
}
