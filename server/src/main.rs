use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use game_core::{Card, SEATS};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use server::config::ServerConfig;
use server::protocol::{ClientMessage, ServerMessage};
use server::sessions::{seat_name, SessionError, SessionStore, HUMAN_SEAT};

#[derive(Clone)]
struct AppState {
    sessions: Arc<Mutex<SessionStore>>,
}

#[derive(Clone)]
struct SessionBinding {
    session_id: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let state = AppState {
        sessions: Arc::new(Mutex::new(SessionStore::new())),
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));

    info!("listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    let _ = tx.send(ServerMessage::Welcome {
        seat: HUMAN_SEAT,
        seat_names: (0..SEATS).map(seat_name).collect(),
    });

    let mut binding: Option<SessionBinding> = None;

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client) => {
                    if let Err(err) = handle_client_message(&state, &tx, &mut binding, client).await {
                        let _ = tx.send(rejection(err));
                    }
                }
                Err(err) => {
                    debug!(%err, "unparseable client message");
                    let _ = tx.send(ServerMessage::Error {
                        message: "invalid message".to_string(),
                    });
                }
            }
        }
    }

    end_session_if_needed(&state, &mut binding).await;
}

async fn handle_client_message(
    state: &AppState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    binding: &mut Option<SessionBinding>,
    client: ClientMessage,
) -> Result<(), SessionError> {
    match client {
        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong);
        }
        ClientMessage::NewGame => {
            end_session_if_needed(state, binding).await;

            let (session_id, starter, actions) = {
                let mut sessions = state.sessions.lock().await;
                let (session_id, actions) = sessions.create_session(rand::random());
                let starter = actions.first().map(|action| action.seat).unwrap_or(HUMAN_SEAT);
                (session_id, starter, actions)
            };

            *binding = Some(SessionBinding {
                session_id: session_id.clone(),
            });
            let _ = tx.send(ServerMessage::GameStarted {
                session_id: session_id.clone(),
                starter,
            });
            if !actions.is_empty() {
                let _ = tx.send(ServerMessage::SeatActions { actions });
            }
            send_table_state(state, tx, &session_id).await;
        }
        ClientMessage::Play { cards } => {
            let session_id = bound_session(binding)?;
            let parsed: Vec<Card> = cards.iter().filter_map(|code| Card::from_code(code)).collect();
            if parsed.len() != cards.len() {
                let _ = tx.send(ServerMessage::PlayRejected {
                    reason: "invalid card code".to_string(),
                });
                return Ok(());
            }
            let report = {
                let mut sessions = state.sessions.lock().await;
                sessions.play(&session_id, parsed)?
            };
            let _ = tx.send(ServerMessage::SeatActions {
                actions: report.actions(),
            });
            send_table_state(state, tx, &session_id).await;
        }
        ClientMessage::Pass => {
            let session_id = bound_session(binding)?;
            let report = {
                let mut sessions = state.sessions.lock().await;
                sessions.pass(&session_id)?
            };
            let _ = tx.send(ServerMessage::SeatActions {
                actions: report.actions(),
            });
            send_table_state(state, tx, &session_id).await;
        }
    }
    Ok(())
}

fn bound_session(binding: &Option<SessionBinding>) -> Result<String, SessionError> {
    binding
        .as_ref()
        .map(|binding| binding.session_id.clone())
        .ok_or(SessionError::NotFound)
}

fn rejection(err: SessionError) -> ServerMessage {
    match err {
        SessionError::Rejected(reason) => ServerMessage::PlayRejected {
            reason: reason.to_string(),
        },
        SessionError::NotFound => ServerMessage::Error {
            message: err.to_string(),
        },
    }
}

/// Sends the table as the human sees it, followed by the result once someone
/// has gone out.
async fn send_table_state(state: &AppState, tx: &mpsc::UnboundedSender<ServerMessage>, session_id: &str) {
    let snapshot = {
        let sessions = state.sessions.lock().await;
        sessions.snapshot(session_id)
    };
    let Some(snapshot) = snapshot else {
        warn!(session = %session_id, "snapshot requested for missing session");
        return;
    };
    let winner = snapshot.winner;
    let _ = tx.send(ServerMessage::TableState(snapshot));
    if let Some(winner) = winner {
        info!(session = %session_id, winner, "game over");
        let _ = tx.send(ServerMessage::GameOver {
            session_id: session_id.to_string(),
            winner,
            winner_name: seat_name(winner),
        });
    }
}

async fn end_session_if_needed(state: &AppState, binding: &mut Option<SessionBinding>) {
    if let Some(binding) = binding.take() {
        let mut sessions = state.sessions.lock().await;
        if sessions.remove_session(&binding.session_id) {
            debug!(session = %binding.session_id, "session closed");
        }
    }
}
