//! Integration tests for the WebSocket server, session handling, and the
//! broadcast fan-out.
//!
//! These tests exercise the bridge through its *public* surface, the same
//! way a real client does: a WebSocket connection to a loopback listener,
//! JSON text frames in both directions.  The only substitution is the MIDI
//! driver — a `MockDriver` stands in for hardware so tests can stub the
//! enumeration, force open failures, and inject synthetic note events.
//!
//! Each test binds an ephemeral port (`127.0.0.1:0`), so tests run in
//! parallel without port collisions.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use midi_bridge::infrastructure::midi::mock::MockDriver;
use midi_bridge::infrastructure::midi::MidiEvent;
use midi_bridge::infrastructure::{bind_listener, run_broadcast_loop, run_server, ServerState};

// ── Test harness ──────────────────────────────────────────────────────────────

struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    running: Arc<AtomicBool>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Let the accept and broadcast loops wind down.
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Starts the full bridge (accept loop + broadcast loop) on an ephemeral
/// loopback port, backed by the given mock driver.
async fn start_server(driver: MockDriver) -> TestServer {
    let listener = bind_listener("127.0.0.1:0".parse().unwrap())
        .await
        .expect("ephemeral bind must succeed");
    let addr = listener.local_addr().expect("listener has a local addr");

    let state = Arc::new(ServerState::new(Box::new(driver)));
    let running = Arc::new(AtomicBool::new(true));

    tokio::spawn(run_server(
        listener,
        Arc::clone(&state),
        Arc::clone(&running),
    ));
    tokio::spawn(run_broadcast_loop(
        Arc::clone(&state.binding),
        Arc::clone(&state.registry),
        Duration::from_millis(1),
        Arc::clone(&running),
    ));

    TestServer { addr, state, running }
}

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client connect must succeed");
    client
}

async fn send_text(client: &mut Client, text: &str) {
    client
        .send(Message::Text(text.to_string()))
        .await
        .expect("send must succeed");
}

/// Reads frames until the next text frame, decoded as JSON.  Panics after
/// five seconds — a missing reply is a test failure, not a hang.
async fn recv_json(client: &mut Client) -> serde_json::Value {
    timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).expect("server sent invalid JSON")
                }
                Some(Ok(_)) => continue, // ping/pong frames
                Some(Err(e)) => panic!("client read error: {e}"),
                None => panic!("connection closed while awaiting a frame"),
            }
        }
    })
    .await
    .expect("timed out waiting for a server frame")
}

/// Waits until the registry holds exactly `n` sessions.
async fn wait_for_sessions(server: &TestServer, n: usize) {
    timeout(Duration::from_secs(5), async {
        while server.state.registry.len() != n {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "registry never reached {n} sessions (now {})",
            server.state.registry.len()
        )
    });
}

// ── Control channel scenarios ─────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_reflects_driver_enumeration() {
    // Arrange: a stub driver enumerating two devices
    let driver = MockDriver::with_inputs(&["DeviceX", "DeviceY"]);
    let server = start_server(driver).await;
    let mut client = connect(server.addr).await;

    // Act
    send_text(&mut client, r#"{"command":"list_devices"}"#).await;
    let reply = recv_json(&mut client).await;

    // Assert
    assert_eq!(reply["type"], "device_list");
    assert_eq!(reply["devices"], serde_json::json!(["DeviceX", "DeviceY"]));
}

#[tokio::test]
async fn test_connect_device_success_replies_with_status() {
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    let server = start_server(driver).await;
    let mut client = connect(server.addr).await;

    send_text(
        &mut client,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    let reply = recv_json(&mut client).await;

    assert_eq!(reply["type"], "status");
    assert_eq!(reply["message"], "Connected to DeviceX");
    assert_eq!(
        server.state.binding.bound_device(),
        Some("DeviceX".to_string())
    );
}

#[tokio::test]
async fn test_connect_device_failure_replies_with_error_and_stays_unbound() {
    // Arrange: DeviceX is enumerable but refuses to open
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    driver.fail_open("DeviceX");
    let server = start_server(driver).await;
    let mut client = connect(server.addr).await;

    // Act
    send_text(
        &mut client,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    let reply = recv_json(&mut client).await;

    // Assert: error goes to this client only, and the binding stays unbound
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().contains("DeviceX"));
    assert_eq!(server.state.binding.bound_device(), None);
}

#[tokio::test]
async fn test_enumeration_failure_is_reported_to_requester_only() {
    let driver = MockDriver::with_inputs(&[]);
    driver.fail_enumeration();
    let server = start_server(driver).await;
    let mut requester = connect(server.addr).await;
    let _bystander = connect(server.addr).await;
    wait_for_sessions(&server, 2).await;

    send_text(&mut requester, r#"{"command":"list_devices"}"#).await;
    let reply = recv_json(&mut requester).await;

    assert_eq!(reply["type"], "error");
    // The bystander session is unaffected.
    assert_eq!(server.state.registry.len(), 2);
}

#[tokio::test]
async fn test_malformed_input_replies_with_error_and_keeps_connection() {
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    let server = start_server(driver).await;
    let mut client = connect(server.addr).await;

    // Act: garbage, then a valid command on the same connection
    send_text(&mut client, "{not json at all").await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "error");

    send_text(&mut client, r#"{"command":"list_devices"}"#).await;
    let reply = recv_json(&mut client).await;

    // Assert: the connection survived the malformed frame
    assert_eq!(reply["type"], "device_list");
}

// ── Broadcast scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_note_event_is_broadcast_to_all_clients() {
    // Arrange: two clients; one binds the device
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    let server = start_server(driver.clone()).await;
    let mut client_a = connect(server.addr).await;
    let mut client_b = connect(server.addr).await;
    wait_for_sessions(&server, 2).await;

    send_text(
        &mut client_a,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    let status = recv_json(&mut client_a).await;
    assert_eq!(status["type"], "status");

    // Act: the device produces one note-on
    driver.inject(MidiEvent::NoteOn { channel: 0, note: 60, velocity: 100 });

    // Assert: both clients receive the identical envelope
    let expected = serde_json::json!({
        "type": "midi_message",
        "message": {"type": "note_on", "note": 60, "velocity": 100, "channel": 0}
    });
    assert_eq!(recv_json(&mut client_a).await, expected);
    assert_eq!(recv_json(&mut client_b).await, expected);
}

#[tokio::test]
async fn test_broadcast_preserves_device_order_per_client() {
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    let server = start_server(driver.clone()).await;
    let mut client = connect(server.addr).await;

    send_text(
        &mut client,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    recv_json(&mut client).await; // status

    driver.inject(MidiEvent::NoteOn { channel: 0, note: 60, velocity: 100 });
    driver.inject(MidiEvent::NoteOn { channel: 0, note: 64, velocity: 90 });
    driver.inject(MidiEvent::NoteOff { channel: 0, note: 60, velocity: 0 });

    let first = recv_json(&mut client).await;
    let second = recv_json(&mut client).await;
    let third = recv_json(&mut client).await;
    assert_eq!(first["message"]["note"], 60);
    assert_eq!(first["message"]["type"], "note_on");
    assert_eq!(second["message"]["note"], 64);
    assert_eq!(third["message"]["type"], "note_off");
}

#[tokio::test]
async fn test_switching_devices_switches_the_stream_for_everyone() {
    // connect_device is a shared side effect: after any client rebinds,
    // broadcasts flow from the new device to all clients.
    let driver = MockDriver::with_inputs(&["DeviceX", "DeviceY"]);
    let server = start_server(driver.clone()).await;
    let mut client_a = connect(server.addr).await;
    let mut client_b = connect(server.addr).await;
    wait_for_sessions(&server, 2).await;

    send_text(
        &mut client_a,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    recv_json(&mut client_a).await; // status

    send_text(
        &mut client_b,
        r#"{"command":"connect_device","device_name":"DeviceY"}"#,
    )
    .await;
    let status = recv_json(&mut client_b).await;
    assert_eq!(status["message"], "Connected to DeviceY");
    assert_eq!(
        server.state.binding.bound_device(),
        Some("DeviceY".to_string())
    );

    // Events injected into the active (DeviceY) source reach client A too.
    driver.inject(MidiEvent::NoteOn { channel: 2, note: 48, velocity: 77 });
    let frame = recv_json(&mut client_a).await;
    assert_eq!(frame["message"]["note"], 48);
    assert_eq!(frame["message"]["channel"], 2);
}

// ── Session lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnected_client_is_removed_from_registry() {
    let driver = MockDriver::with_inputs(&[]);
    let server = start_server(driver).await;

    let client = connect(server.addr).await;
    wait_for_sessions(&server, 1).await;

    // Act: drop the connection without a close handshake (abrupt close)
    drop(client);

    // Assert: the session handler's unconditional cleanup runs
    wait_for_sessions(&server, 0).await;
}

#[tokio::test]
async fn test_disconnect_does_not_disturb_other_sessions() {
    let driver = MockDriver::with_inputs(&["DeviceX"]);
    let server = start_server(driver.clone()).await;
    let mut survivor = connect(server.addr).await;
    let dropped = connect(server.addr).await;
    wait_for_sessions(&server, 2).await;

    send_text(
        &mut survivor,
        r#"{"command":"connect_device","device_name":"DeviceX"}"#,
    )
    .await;
    recv_json(&mut survivor).await; // status

    drop(dropped);
    wait_for_sessions(&server, 1).await;

    // The surviving session still receives broadcasts.
    driver.inject(MidiEvent::NoteOff { channel: 0, note: 60, velocity: 0 });
    let frame = recv_json(&mut survivor).await;
    assert_eq!(frame["message"]["type"], "note_off");
}
