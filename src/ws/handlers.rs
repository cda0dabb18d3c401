//! WebSocket message dispatch for a single game session

use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::GameSession;

/// Handle a client message and return an optional response.
///
/// `tx` feeds the connection's outbound queue: countdown ticks and loading
/// notices go there.
pub async fn handle_message(
    msg: ClientMessage,
    session: &GameSession,
    tx: &UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::NextChallenge => {
            // Announce a pool assembly that starts or is already running during this draw
            let mut loading = session.watch_loading();
            let mut announced = *loading.borrow_and_update();
            if announced {
                let _ = tx.send(ServerMessage::Loading { loading: true });
            }
            let mut watching = !announced;

            let next = session.next_challenge();
            tokio::pin!(next);
            let result = loop {
                tokio::select! {
                    result = &mut next => break result,
                    changed = loading.changed(), if watching => {
                        watching = false;
                        if changed.is_ok() {
                            announced = true;
                            let _ = tx.send(ServerMessage::Loading { loading: true });
                        }
                    }
                }
            };
            // A refill that never yielded still counts
            if !announced && loading.has_changed().unwrap_or(false) {
                announced = true;
                let _ = tx.send(ServerMessage::Loading { loading: true });
            }
            if announced {
                let _ = tx.send(ServerMessage::Loading { loading: false });
            }

            match result {
                Ok(dispensed) => Some(ServerMessage::Challenge {
                    challenge: dispensed.challenge,
                    mode: dispensed.mode,
                    stats: dispensed.stats,
                }),
                Err(e) => {
                    tracing::warn!("Session {}: {}", session.id, e);
                    Some(ServerMessage::error("NO_CHALLENGES", e.to_string()))
                }
            }
        }

        ClientMessage::StartRound => {
            if session.current().await.is_none() {
                return Some(ServerMessage::error(
                    "NO_CURRENT_CHALLENGE",
                    "Draw a challenge before starting the timer",
                ));
            }
            let seconds = session.start_round(tx.clone()).await;
            Some(ServerMessage::RoundStarted { seconds })
        }

        ClientMessage::StopRound => {
            session.stop_round().await;
            Some(ServerMessage::RoundStopped)
        }

        ClientMessage::GetStats => {
            let status = session.status().await;
            Some(ServerMessage::Stats {
                stats: status.stats,
                loading: status.loading,
            })
        }

        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}
