//! Per-connection handler: handshake, presence, and action routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `hello` → validate version, authenticate token
//!   2. Send `welcome` → register as the user's live connection
//!   3. Loop over three sources at once: client frames, pushes from the
//!      joined battle, and the presence eviction notice

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gridduel_battle::{BattleError, SessionHandle};
use gridduel_presence::{Authenticator, EvictReason};
use gridduel_protocol::{
    ClientMessage, Codec, ConnectionId, ErrorCode, GameId, Identity, PROTOCOL_VERSION,
    ProtocolError, Role, ServerMessage, UserId,
};
use gridduel_rules::RulesService;
use gridduel_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GridduelError;
use crate::server::ServerState;

/// Whether the message loop keeps going.
enum Flow {
    Continue,
    Close,
}

/// The battle this connection is seated in.
struct Seat {
    handle: SessionHandle,
    role: Role,
    pushes: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Drop guard that releases presence and the battle seat when the
/// handler exits.
///
/// `Drop` is synchronous, so the async cleanup runs in a spawned task.
struct ConnectionGuard<A: Authenticator, R: RulesService, C: Codec> {
    conn_id: ConnectionId,
    user_id: UserId,
    seat: Option<Seat>,
    state: Arc<ServerState<A, R, C>>,
}

impl<A: Authenticator, R: RulesService, C: Codec> Drop for ConnectionGuard<A, R, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let user_id = self.user_id.clone();
        let session = self.seat.take().map(|seat| seat.handle);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.presence.lock().await.unregister(&user_id, conn_id);
            if let Some(session) = session {
                // The session may already be gone; nothing to release then.
                let _ = session.disconnect(conn_id).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, R, C>>,
) -> Result<(), GridduelError>
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let identity = match perform_handshake(&conn, &state).await {
        Ok(identity) => identity,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };
    let user_id = identity.user_id.clone();
    tracing::info!(%conn_id, %user_id, "player authenticated");

    let (mut notice, _) = state
        .presence
        .lock()
        .await
        .register(user_id.clone(), conn_id);
    let mut guard = ConnectionGuard {
        conn_id,
        user_id: user_id.clone(),
        seat: None,
        state: Arc::clone(&state),
    };

    loop {
        let flow = tokio::select! {
            evicted = &mut notice => {
                match evicted {
                    Ok(EvictReason::Replaced) => {
                        let _ = send_error(
                            &conn,
                            &state.codec,
                            ErrorCode::SessionReplaced,
                            "signed in from another connection",
                        )
                        .await;
                    }
                    Ok(EvictReason::Idle) => {
                        tracing::info!(%conn_id, %user_id, "connection idle, closing");
                    }
                    Err(_) => {
                        tracing::debug!(%conn_id, %user_id, "presence entry dropped");
                    }
                }
                Flow::Close
            }

            push = next_push(&mut guard.seat) => match push {
                Some(msg) => {
                    send(&conn, &state.codec, &msg).await?;
                    Flow::Continue
                }
                None => {
                    // The session retired or handed our slot to another
                    // connection.
                    if let Some(seat) = guard.seat.take() {
                        tracing::debug!(
                            %conn_id,
                            game_id = %seat.handle.game_id(),
                            role = %seat.role,
                            "session stopped pushing"
                        );
                    }
                    Flow::Continue
                }
            },

            frame = conn.recv() => match frame {
                Ok(Some(data)) => {
                    handle_frame(&conn, &state, &identity, &mut guard.seat, &data).await?
                }
                Ok(None) => {
                    tracing::info!(%conn_id, %user_id, "connection closed cleanly");
                    Flow::Close
                }
                Err(e) => {
                    tracing::debug!(%conn_id, %user_id, error = %e, "recv error");
                    Flow::Close
                }
            },
        };

        if let Flow::Close = flow {
            break;
        }
    }

    let _ = conn.close().await;
    // guard drops here → presence and seat released.
    Ok(())
}

/// Receives `hello`, checks the version, authenticates, sends `welcome`.
async fn perform_handshake<A, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, R, C>>,
) -> Result<Identity, GridduelError>
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("hello timed out".into()).into());
        }
    };

    let msg: ClientMessage = match state.codec.decode(&data) {
        Ok(msg) => msg,
        Err(e) => {
            send_error(conn, &state.codec, ErrorCode::BadRequest, "expected hello").await?;
            return Err(e.into());
        }
    };

    let ClientMessage::Hello { token, version } = msg else {
        send_error(conn, &state.codec, ErrorCode::BadRequest, "expected hello").await?;
        return Err(ProtocolError::InvalidMessage("first message must be hello".into()).into());
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            ErrorCode::VersionMismatch,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let identity = match state.auth.authenticate(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            send_error(conn, &state.codec, ErrorCode::Unauthorized, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    let welcome = ServerMessage::Welcome {
        user_id: identity.user_id.clone(),
        server_time: server_time(),
    };
    send(conn, &state.codec, &welcome).await?;

    Ok(identity)
}

/// Decodes and dispatches one client frame.
async fn handle_frame<A, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, R, C>>,
    identity: &Identity,
    seat: &mut Option<Seat>,
    data: &[u8],
) -> Result<Flow, GridduelError>
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    let conn_id = conn.id();
    let user_id = &identity.user_id;
    state.presence.lock().await.touch(user_id, conn_id);

    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%conn_id, %user_id, error = %e, "failed to decode frame");
            send_error(conn, &state.codec, ErrorCode::BadRequest, &format!("invalid message: {e}"))
                .await?;
            return Ok(Flow::Continue);
        }
    };

    match msg {
        ClientMessage::Hello { .. } => {
            send_error(conn, &state.codec, ErrorCode::BadRequest, "already authenticated").await?;
        }

        ClientMessage::Heartbeat { client_time } => {
            let ack = ServerMessage::HeartbeatAck {
                client_time,
                server_time: server_time(),
            };
            send(conn, &state.codec, &ack).await?;
        }

        ClientMessage::JoinGame { game_id } => {
            join_game(conn, state, identity, seat, game_id).await?;
        }

        ClientMessage::PlaceSecret { cell } => {
            let Some(handle) = seat.as_ref().map(|s| s.handle.clone()) else {
                return not_in_game(conn, &state.codec).await;
            };
            if let Err(e) = handle.place_secret(user_id.clone(), cell).await {
                lose_seat(conn, &state.codec, seat, e).await?;
            }
        }

        ClientMessage::Move { cell, move_id } => {
            let Some(handle) = seat.as_ref().map(|s| s.handle.clone()) else {
                return not_in_game(conn, &state.codec).await;
            };
            if let Err(e) = handle.make_move(user_id.clone(), cell, move_id).await {
                lose_seat(conn, &state.codec, seat, e).await?;
            }
        }

        ClientMessage::Leave { reason } => {
            tracing::info!(%conn_id, %user_id, %reason, "client left");
            return Ok(Flow::Close);
        }
    }

    Ok(Flow::Continue)
}

/// Seats this connection in `game_id`, creating the battle if needed.
async fn join_game<A, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, R, C>>,
    identity: &Identity,
    seat: &mut Option<Seat>,
    game_id: GameId,
) -> Result<(), GridduelError>
where
    A: Authenticator,
    R: RulesService,
    C: Codec,
{
    let conn_id = conn.id();
    let (tx, rx) = mpsc::unbounded_channel();

    match state.registry.join(&game_id, conn_id, identity.clone(), tx).await {
        Ok((handle, role)) => {
            if let Some(previous) = seat.take() {
                if previous.handle.generation() != handle.generation() {
                    let _ = previous.handle.disconnect(conn_id).await;
                }
            }
            tracing::info!(%conn_id, user_id = %identity.user_id, %game_id, %role, "joined game");
            *seat = Some(Seat {
                handle,
                role,
                pushes: rx,
            });
        }
        Err(e) => {
            tracing::debug!(%conn_id, %game_id, error = %e, "join rejected");
            send_error(conn, &state.codec, e.code(), &e.to_string()).await?;
        }
    }
    Ok(())
}

/// Replies `NOT_IN_GAME` to a game action sent before `join_game`.
async fn not_in_game(conn: &WebSocketConnection, codec: &impl Codec) -> Result<Flow, GridduelError> {
    send_error(conn, codec, ErrorCode::NotInGame, "join a game first").await?;
    Ok(Flow::Continue)
}

/// The seated session stopped between the last push and this action.
async fn lose_seat(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    seat: &mut Option<Seat>,
    err: BattleError,
) -> Result<(), GridduelError> {
    if let Some(lost) = seat.take() {
        tracing::debug!(conn_id = %conn.id(), role = %lost.role, error = %err, "seat lost");
    }
    send_error(conn, codec, ErrorCode::NotInGame, &err.to_string()).await
}

/// Next push from the seated battle; pends forever while unseated.
async fn next_push(seat: &mut Option<Seat>) -> Option<ServerMessage> {
    match seat {
        Some(seat) => seat.pushes.recv().await,
        None => std::future::pending().await,
    }
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), GridduelError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` event to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: ErrorCode,
    message: &str,
) -> Result<(), GridduelError> {
    send(conn, codec, &ServerMessage::error(code, message)).await
}

/// Wall-clock milliseconds since the Unix epoch.
fn server_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
