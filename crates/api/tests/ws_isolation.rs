//! End-to-end WebSocket tests against a bound server.
//!
//! Each test serves the real router on an ephemeral port and connects with
//! `tokio-tungstenite`, the way a dashboard client would.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use common::post_json;
use fleetpulse_api::state::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn serve() -> (SocketAddr, Router, AppState) {
    let (app, state) = common::build_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, server).await.unwrap();
    });
    (addr, app, state)
}

/// Connect and wait until the server has registered the session.
async fn connect(addr: SocketAddr, state: &AppState, vehicle_id: &str) -> Client {
    let before = state.registry.subscriber_count(vehicle_id);
    let url = format!("ws://{addr}/api/v1/ws/telemetry/{vehicle_id}");
    let (client, _response) = connect_async(url).await.expect("WebSocket handshake");
    wait_for(|| state.registry.subscriber_count(vehicle_id) == before + 1).await;
    client
}

async fn wait_for(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Next text frame as JSON, skipping pings.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("no frame in time")
            .expect("stream ended")
            .expect("frame error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let res = timeout(Duration::from_millis(300), client.next()).await;
    assert!(res.is_err(), "expected no frame, got {res:?}");
}

fn sample(vehicle_id: &str, speed: f64) -> Value {
    json!({
        "vehicle_id": vehicle_id,
        "timestamp": "2024-01-01T12:00:00",
        "speed": speed,
        "latitude": 12.97,
        "longitude": 77.59
    })
}

// ---------------------------------------------------------------------------
// Test: telemetry only reaches the matching vehicle's socket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn telemetry_is_scoped_to_vehicle() {
    let (addr, app, state) = serve().await;
    let mut ws1 = connect(addr, &state, "test_vehicle_1").await;
    let mut ws2 = connect(addr, &state, "test_vehicle_2").await;

    let response = post_json(app, "/api/v1/ingest/telemetry", sample("test_vehicle_1", 50.0)).await;
    assert!(response.status().is_success());

    let msg = next_json(&mut ws1).await;
    assert_eq!(msg["type"], "telemetry");
    assert_eq!(msg["data"]["vehicle_id"], "test_vehicle_1");
    assert!(msg["data"].get("rpm").is_none(), "absent readings are omitted");

    assert_silent(&mut ws2).await;
    assert_silent(&mut ws1).await;
}

// ---------------------------------------------------------------------------
// Test: alerts follow telemetry as one batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alert_batch_follows_telemetry() {
    let (addr, app, state) = serve().await;
    let mut ws = connect(addr, &state, "v1").await;

    let mut body = sample("v1", 130.0);
    body["battery_level"] = json!(10.0);
    post_json(app, "/api/v1/ingest/telemetry", body).await;

    assert_eq!(next_json(&mut ws).await["type"], "telemetry");
    let alerts = next_json(&mut ws).await;
    assert_eq!(alerts["type"], "alert");
    let batch = alerts["data"].as_array().unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["type"], "RASH_DRIVING");
    assert_eq!(batch[1]["type"], "MAINTENANCE");
}

// ---------------------------------------------------------------------------
// Test: two sockets on the same vehicle both receive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_socket_of_a_vehicle_receives() {
    let (addr, app, state) = serve().await;
    let mut a = connect(addr, &state, "v1").await;
    let mut b = connect(addr, &state, "v1").await;

    post_json(app, "/api/v1/ingest/telemetry", sample("v1", 20.0)).await;

    assert_eq!(next_json(&mut a).await["data"]["speed"], 20.0);
    assert_eq!(next_json(&mut b).await["data"]["speed"], 20.0);
}

// ---------------------------------------------------------------------------
// Test: disconnecting unregisters, later publishes are harmless
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_close_unregisters_session() {
    let (addr, app, state) = serve().await;
    let mut ws = connect(addr, &state, "v1").await;

    ws.close(None).await.unwrap();
    wait_for(|| state.registry.subscriber_count("v1") == 0).await;

    let response = post_json(app, "/api/v1/ingest/telemetry", sample("v1", 20.0)).await;
    assert!(response.status().is_success());
    assert_eq!(state.registry.total_subscribers(), 0);
}

#[tokio::test]
async fn dropped_connection_unregisters_session() {
    let (addr, _app, state) = serve().await;
    let ws = connect(addr, &state, "v1").await;

    drop(ws);

    wait_for(|| state.registry.subscriber_count("v1") == 0).await;
}

// ---------------------------------------------------------------------------
// Test: registry shutdown closes sessions with "going away"
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registry_close_sends_close_frame() {
    let (addr, _app, state) = serve().await;
    let mut ws = connect(addr, &state, "v1").await;

    state.registry.close();

    let frame = timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("no frame in time")
        .expect("stream ended")
        .expect("frame error");
    match frame {
        Message::Close(Some(close)) => assert_eq!(close.code, CloseCode::Away),
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn inbound_text_is_ignored() {
    let (addr, app, state) = serve().await;
    let mut ws = connect(addr, &state, "v1").await;

    ws.send(Message::Text("hello".into())).await.unwrap();
    post_json(app, "/api/v1/ingest/telemetry", sample("v1", 33.0)).await;

    assert_eq!(next_json(&mut ws).await["data"]["speed"], 33.0);
    assert_eq!(state.registry.subscriber_count("v1"), 1);
}
