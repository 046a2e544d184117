//! Quiz WebSocket: pushes a `state` message on every session change (ticks,
//! answers, auto-advance) and accepts start/answer/next commands.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Path, State, WebSocketUpgrade,
  },
  response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument};

use crate::error::AppError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::runner::QuizHandle;
use crate::state::AppState;

use super::extract::SessionUser;

#[instrument(level = "info", skip(ws, state, session), fields(client = %session.storage.client_id()))]
pub async fn ws_quiz_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  session: SessionUser,
  Path(id): Path<String>,
) -> Result<Response, AppError> {
  let handle = state
    .quizzes
    .get(&id, session.storage.client_id())
    .await
    .ok_or_else(|| AppError::quiz_not_found(&id))?;
  info!(target: "vocab_backend", quiz = %id, "Quiz WebSocket upgrade requested");
  Ok(ws.on_upgrade(move |socket| handle_ws(socket, handle)).into_response())
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip_all, fields(quiz = %handle.id()))]
async fn handle_ws(mut socket: WebSocket, handle: Arc<QuizHandle>) {
  info!(target: "vocab_backend", "WebSocket connected");
  let mut updates = handle.subscribe();
  let initial = ServerWsMessage::State { quiz: updates.borrow_and_update().clone() };
  if send(&mut socket, &initial).await.is_err() {
    return;
  }

  loop {
    tokio::select! {
      changed = updates.changed() => {
        if changed.is_err() {
          break;
        }
        let quiz = updates.borrow_and_update().clone();
        if let Err(e) = send(&mut socket, &ServerWsMessage::State { quiz }).await {
          error!(target: "vocab_backend", error = %e, "WS send error");
          break;
        }
      }
      msg = socket.recv() => {
        let reply = match msg {
          Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "vocab_backend", ?incoming, "WS received");
              handle_client_ws(incoming, &handle).await
            }
            Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
          },
          Some(Ok(Message::Ping(payload))) => {
            let _ = socket.send(Message::Pong(payload)).await;
            None
          }
          Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
          Some(Ok(_)) => None,
        };
        if let Some(reply) = reply {
          if let Err(e) = send(&mut socket, &reply).await {
            error!(target: "vocab_backend", error = %e, "WS send error");
            break;
          }
        }
      }
    }
  }
  info!(target: "vocab_backend", "WebSocket disconnected");
}

/// State changes reach the client through the watch channel, so commands
/// only reply directly with errors and answer outcomes.
async fn handle_client_ws(msg: ClientWsMessage, handle: &Arc<QuizHandle>) -> Option<ServerWsMessage> {
  match msg {
    ClientWsMessage::Ping => Some(ServerWsMessage::Pong),
    ClientWsMessage::Start => match handle.start().await {
      Ok(_) => None,
      Err(e) => Some(ServerWsMessage::Error { message: e.to_string() }),
    },
    ClientWsMessage::Answer { selected_option } => match handle.submit(selected_option).await {
      Ok((outcome, _)) => Some(ServerWsMessage::AnswerResult { outcome }),
      Err(e) => Some(ServerWsMessage::Error { message: e.to_string() }),
    },
    ClientWsMessage::Next => {
      handle.next().await;
      None
    }
  }
}
