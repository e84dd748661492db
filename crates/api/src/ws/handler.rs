use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use fleetpulse_events::SubscriptionRegistry;
use futures::{SinkExt, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::state::AppState;
use crate::ws::heartbeat::Heartbeat;
use crate::ws::session::SubscriberSession;

/// HTTP handler that upgrades the connection to a telemetry stream for one
/// vehicle.
///
/// GET /ws/telemetry/{vehicle_id}
pub async fn telemetry_ws_handler(
    ws: WebSocketUpgrade,
    Path(vehicle_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let interval = Duration::from_secs(state.config.heartbeat_interval_secs);
    ws.on_upgrade(move |socket| handle_socket(socket, vehicle_id, state.registry, interval))
}

/// Manage a single subscriber connection after upgrade.
///
/// One task drives the whole connection:
///   1. Opens a [`SubscriberSession`] for the vehicle.
///   2. Forwards registry messages to the socket as JSON text frames.
///   3. Drains inbound frames (only used as liveness).
///   4. Pings on every heartbeat tick and gives up on silent peers.
///
/// The session is closed on every exit path.
async fn handle_socket(
    socket: WebSocket,
    vehicle_id: String,
    registry: SubscriptionRegistry,
    interval: Duration,
) {
    let mut session = SubscriberSession::new(vehicle_id);
    let (mut sink, mut stream) = socket.split();

    if let Err(e) = session.open(&registry) {
        tracing::warn!(
            conn_id = %session.conn_id(),
            vehicle_id = %session.vehicle_id(),
            error = %e,
            "Rejecting subscriber"
        );
        let _ = sink.send(close_message(close_code::AWAY, "server shutting down")).await;
        return;
    }

    tracing::info!(
        conn_id = %session.conn_id(),
        vehicle_id = %session.vehicle_id(),
        "Subscriber connected"
    );

    let mut heartbeat = Heartbeat::new(interval, Instant::now());
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            delivery = session.next_message() => {
                let Some(message) = delivery else {
                    // The registry dropped us: either shutdown or we lagged.
                    let (code, text) = if registry.is_closed() {
                        (close_code::AWAY, "server shutting down")
                    } else {
                        (close_code::AGAIN, "subscriber too slow")
                    };
                    let _ = sink.send(close_message(code, text)).await;
                    break text;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(conn_id = %session.conn_id(), error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break "sink closed";
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break "peer closed",
                Some(Ok(_)) => heartbeat.record_activity(Instant::now()),
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %session.conn_id(), error = %e, "WebSocket receive error");
                    break "receive error";
                }
            },
            _ = ticker.tick() => {
                if heartbeat.is_stale(Instant::now()) {
                    break "heartbeat timeout";
                }
                tracing::trace!(conn_id = %session.conn_id(), "WebSocket heartbeat ping");
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break "sink closed";
                }
            }
        }
    };

    session.close();
    tracing::info!(
        conn_id = %session.conn_id(),
        vehicle_id = %session.vehicle_id(),
        reason,
        "Subscriber disconnected"
    );
}

fn close_message(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}
