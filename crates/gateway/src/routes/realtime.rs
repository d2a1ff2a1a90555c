//! Realtime relay WebSocket endpoint.
//!
//! Clients only listen: inbound frames are read so pings and closes are
//! handled, then discarded.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tracing::{debug, info};

use crate::relay::Relay;
use crate::state::AppState;

/// Create the realtime router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(relay_socket))
}

async fn relay_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let relay = state.relay().clone();
    ws.on_upgrade(move |socket| serve_socket(socket, relay))
}

async fn serve_socket(mut socket: WebSocket, relay: Relay) {
    let mut subscription = relay.subscribe();
    info!(connection = subscription.id, "relay client connected");

    loop {
        tokio::select! {
            outgoing = subscription.messages.recv() => {
                let Some(text) = outgoing else { break };
                if let Err(e) = socket.send(Message::Text(text.into())).await {
                    debug!(connection = subscription.id, error = %e, "relay write failed");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(connection = subscription.id, error = %e, "relay read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    relay.unsubscribe(subscription.id);
    info!(connection = subscription.id, "relay client disconnected");
}
