pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::session::GameSession;
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

async fn respond(
    text: &str,
    session: &GameSession,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(client_msg) => handlers::handle_message(client_msg, session, tx).await,
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            Some(ServerMessage::error(
                "PARSE_ERROR",
                format!("Invalid message format: {}", e),
            ))
        }
    }
}

/// Drive `handling` to completion while forwarding queued messages.
/// Returns None once the socket stops accepting messages.
async fn forward_while<S, F>(
    sender: &mut S,
    rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
    handling: F,
) -> Option<Option<ServerMessage>>
where
    S: SinkExt<Message> + Unpin,
    F: Future<Output = Option<ServerMessage>>,
{
    tokio::pin!(handling);
    loop {
        tokio::select! {
            response = &mut handling => return Some(response),
            Some(queued) = rx.recv() => {
                if !send_json(sender, &queued).await {
                    return None;
                }
            }
        }
    }
}

/// One connection is one game session
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let session = state.create_session().await;

    let welcome = ServerMessage::Welcome {
        session_id: session.id.clone(),
        protocol: PROTOCOL_VERSION.to_string(),
    };
    if !send_json(&mut sender, &welcome).await
        || !send_json(&mut sender, &ServerMessage::Loading { loading: true }).await
    {
        tracing::error!("Failed to send welcome message");
        state.remove_session(&session.id).await;
        return;
    }

    let stats = session.prime().await;
    if !send_json(&mut sender, &ServerMessage::Ready { stats }).await {
        state.remove_session(&session.id).await;
        return;
    }

    // Countdown ticks and loading notices arrive here
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                if !send_json(&mut sender, &msg).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        // Keep forwarding ticks while a draw waits on a refill
                        let handling = respond(&text, &session, &tx);
                        let Some(response) = forward_while(&mut sender, &mut rx, handling).await else {
                            break;
                        };

                        // Flush anything queued while handling (e.g. loading notices) first
                        while let Ok(queued) = rx.try_recv() {
                            if !send_json(&mut sender, &queued).await {
                                break;
                            }
                        }
                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.remove_session(&session.id).await;
    tracing::info!("WebSocket connection closed for session {}", session.id);
}
