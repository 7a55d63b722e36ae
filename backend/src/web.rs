use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use katapult_shared::{INITIATE_PATH, InitiateBody, RESET_PATH, TURN_PATH, WS_PATH};
use tokio::sync::broadcast::error::RecvError;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::device::Event;
use crate::servo::HOME_ANGLE;
use crate::state::AppState;

/// First frame of every session. Not JSON; panels are expected to drop it.
pub const GREETING: &str = "Connected to WebSocket!";

/// Public router constructor
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let static_dir = ServeDir::new(static_dir)
        .precompressed_br()
        .precompressed_gzip();

    Router::new()
        .route(WS_PATH, get(ws_handler))
        .route(RESET_PATH, post(reset))
        .route(TURN_PATH, post(turn))
        .route(INITIATE_PATH, post(initiate))
        // anything that doesn’t match the above routes goes to the static files
        .fallback_service(static_dir)
        .layer(CompressionLayer::new())
        .with_state(state)
}

async fn enqueue(state: &AppState, event: Event) -> StatusCode {
    match state.events_tx.send(event).await {
        Ok(()) => StatusCode::OK,
        Err(_) => {
            warn!("device loop is gone, dropping {event:?}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    enqueue(&state, Event::TurnServo(Some(HOME_ANGLE))).await
}

async fn turn(State(state): State<Arc<AppState>>) -> StatusCode {
    enqueue(&state, Event::TurnServo(None)).await
}

/// Body is parsed by hand so a missing content type is not an error, only a
/// body that is not `{"angle": <int>}`.
async fn initiate(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let body: InitiateBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(e) => {
            debug!("rejecting initiate body: {e}");
            return StatusCode::BAD_REQUEST;
        }
    };
    enqueue(&state, Event::InitiateShot(body.angle)).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let mut frames_rx = state.ws_tx.subscribe();
    let mut closing_rx = state.closing_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("panel session opened");

    if sender
        .send(Message::Text(Utf8Bytes::from_static(GREETING)))
        .await
        .is_err()
    {
        return;
    }

    // Task: device -> panel
    let send_task = async move {
        loop {
            tokio::select! {
                recv = frames_rx.recv() => {
                    match recv {
                        Ok(text) => {
                            if sender.send(Message::Text(Utf8Bytes::from(text))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(n)) => warn!("session lagged, {n} frames skipped"),
                        Err(RecvError::Closed) => break,
                    }
                }
                closing = async { closing_rx.wait_for(|closing| *closing).await.is_ok() } => {
                    if closing {
                        let _ = sender.send(Message::Close(None)).await;
                    }
                    break;
                }
            }
        }
    };

    // Task: panel -> device. Nothing is expected inbound; just watch for close.
    let recv_task = async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    };

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    info!("panel session closed");
}
