//! End-to-end relay tests over real websockets.
//!
//! Spawns the full router on an ephemeral port and drives it with
//! `tokio-tungstenite` clients, the way the platform front-ends do.

use canvas_relay::routes;
use canvas_relay::state::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_relay() -> String {
    let state = AppState::new(None);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> WsClient {
    let (ws, _response) = connect_async(url).await.expect("websocket connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: &Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

async fn recv_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("receive timed out")
            .expect("stream ended unexpectedly")
            .expect("transport error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("server sends valid json");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(ws: &mut WsClient) {
    assert!(
        timeout(Duration::from_millis(150), ws.next()).await.is_err(),
        "expected no frame"
    );
}

fn join(platform: &str) -> Value {
    json!({"type": "join", "platform": platform})
}

#[tokio::test]
async fn canvas_session_across_clients() {
    let url = spawn_relay().await;

    // A joins: empty history replay, roster of one.
    let mut a = connect(&url).await;
    send_json(&mut a, &join("go")).await;

    let history = recv_json(&mut a).await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["history"], json!([]));

    let users = recv_json(&mut a).await;
    assert_eq!(users["type"], "users");
    assert_eq!(users["count"], 1);
    let a_id = users["users"][0]["id"].as_u64().expect("numeric id");
    assert_eq!(users["users"][0]["platform"], "go");

    // B joins: both clients see a roster of two.
    let mut b = connect(&url).await;
    send_json(&mut b, &join("rust")).await;

    let history = recv_json(&mut b).await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["history"], json!([]));
    let users = recv_json(&mut b).await;
    assert_eq!(users["count"], 2);
    let users = recv_json(&mut a).await;
    assert_eq!(users["count"], 2);

    // A draws: only B receives the relayed op, stamped with A's id.
    send_json(
        &mut a,
        &json!({"type": "draw", "x": 1, "y": 2, "color": "#fff", "size": 3, "platform": "go"}),
    )
    .await;

    let draw = recv_json(&mut b).await;
    assert_eq!(draw["type"], "draw");
    assert_eq!(draw["x"], 1.0);
    assert_eq!(draw["y"], 2.0);
    assert_eq!(draw["color"], "#fff");
    assert_eq!(draw["clientId"], a_id);
    assert_silent(&mut a).await;

    // A clears: B receives the relayed clear, A nothing.
    send_json(&mut a, &json!({"type": "clear", "platform": "go"})).await;
    let clear = recv_json(&mut b).await;
    assert_eq!(clear["type"], "clear");
    assert_eq!(clear["clientId"], a_id);
    assert_silent(&mut a).await;

    // C joins after the clear: replay is empty again.
    let mut c = connect(&url).await;
    send_json(&mut c, &join("python")).await;
    let history = recv_json(&mut c).await;
    assert_eq!(history["history"], json!([]));
    for ws in [&mut a, &mut b, &mut c] {
        let users = recv_json(ws).await;
        assert_eq!(users["count"], 3);
    }

    // A disconnects: the remaining clients see a roster without A.
    drop(a);
    for ws in [&mut b, &mut c] {
        let users = recv_json(ws).await;
        assert_eq!(users["type"], "users");
        assert_eq!(users["count"], 2);
        let ids: Vec<u64> = users["users"]
            .as_array()
            .expect("users array")
            .iter()
            .map(|u| u["id"].as_u64().expect("numeric id"))
            .collect();
        assert!(!ids.contains(&a_id));
    }
}

#[tokio::test]
async fn join_replays_retained_draws() {
    let url = spawn_relay().await;

    let mut a = connect(&url).await;
    send_json(&mut a, &join("go")).await;
    recv_json(&mut a).await; // history
    recv_json(&mut a).await; // users

    send_json(
        &mut a,
        &json!({"type": "draw", "x": 10, "y": 20, "color": "#abc", "size": 5, "platform": "go"}),
    )
    .await;

    let mut b = connect(&url).await;
    send_json(&mut b, &join("java")).await;
    let history = recv_json(&mut b).await;
    assert_eq!(history["type"], "history");
    let entries = history["history"].as_array().expect("history array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "draw");
    assert_eq!(entries[0]["x"], 10.0);
    assert_eq!(entries[0]["color"], "#abc");
}

#[tokio::test]
async fn registration_flow_over_sockets() {
    let url = spawn_relay().await;

    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    send_json(&mut a, &join("go")).await;
    recv_json(&mut a).await; // history
    recv_json(&mut a).await; // users
    send_json(&mut b, &join("rust")).await;
    recv_json(&mut b).await; // history
    recv_json(&mut b).await; // users
    recv_json(&mut a).await; // users update from B's join

    // A registers: success reply, then the broadcast everyone gets.
    send_json(
        &mut a,
        &json!({
            "type": "register",
            "email": "a@b.co",
            "platform": "go",
            "timestamp": "2024-05-01T12:00:00Z"
        }),
    )
    .await;

    let reply = recv_json(&mut a).await;
    assert_eq!(reply["type"], "registration_success");
    let broadcast = recv_json(&mut a).await;
    assert_eq!(broadcast["type"], "new_registration");
    assert_eq!(broadcast["registration"]["email"], "a@b.co");

    let broadcast = recv_json(&mut b).await;
    assert_eq!(broadcast["type"], "new_registration");
    assert_eq!(broadcast["registration"]["timestamp"], "2024-05-01T12:00:00Z");

    // B tries the same email: typed rejection, no broadcast.
    send_json(
        &mut b,
        &json!({"type": "register", "email": "a@b.co", "platform": "rust"}),
    )
    .await;
    let reply = recv_json(&mut b).await;
    assert_eq!(reply["type"], "registration_error");
    assert_eq!(reply["message"], "This email is already registered");
    assert_silent(&mut a).await;

    // Malformed email: typed rejection.
    send_json(
        &mut b,
        &json!({"type": "register", "email": "not-an-email", "platform": "rust"}),
    )
    .await;
    let reply = recv_json(&mut b).await;
    assert_eq!(reply["type"], "registration_error");
    assert_eq!(reply["message"], "Invalid email format");

    // Admin view query returns the single accepted entry.
    send_json(&mut b, &json!({"type": "get_registrations"})).await;
    let reply = recv_json(&mut b).await;
    assert_eq!(reply["type"], "registrations_list");
    let registrations = reply["registrations"].as_array().expect("registrations array");
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["email"], "a@b.co");
}

#[tokio::test]
async fn bad_input_does_not_kill_the_connection() {
    let url = spawn_relay().await;

    let mut a = connect(&url).await;
    send_json(&mut a, &json!({"type": "telemetry", "level": 9})).await;
    a.send(Message::Text("{definitely not json".into()))
        .await
        .expect("send");
    assert_silent(&mut a).await;

    // The connection still works after both bad frames.
    send_json(&mut a, &join("dotnet")).await;
    let history = recv_json(&mut a).await;
    assert_eq!(history["type"], "history");
    let users = recv_json(&mut a).await;
    assert_eq!(users["count"], 1);
}
