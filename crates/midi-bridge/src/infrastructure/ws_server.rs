//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections and upgrading them to WebSocket.
//! 3. Registering each session in the [`ClientRegistry`] and spawning its
//!    writer task.
//! 4. Running the per-session command read loop.
//! 5. Removing the session from the registry on close — unconditionally, on
//!    every exit path, so a closed connection can never linger as a
//!    broadcast target.
//! 6. Exiting the accept loop when the shutdown flag is cleared.
//!
//! # Per-session task layout
//!
//! ```text
//!            ┌── reader (this task): ws_rx → handle_text_frame → outbound queue
//! session ───┤
//!            └── writer (spawned):   outbound queue → ws_tx
//! ```
//!
//! Replies and broadcast frames travel through the same bounded outbound
//! queue, which preserves per-session FIFO order and keeps the broadcast
//! loop from ever awaiting a slow socket.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::{
    handle_text_frame, ClientRegistry, DeviceBinding, SessionId, SESSION_QUEUE_DEPTH,
};
use crate::infrastructure::midi::MidiDriver;

// ── Shared state ──────────────────────────────────────────────────────────────

/// The two pieces of shared state every task in the bridge cooperates over.
///
/// Both fields are `Arc`s so the broadcast loop can hold its own handles
/// while session tasks reach them through the state struct.
pub struct ServerState {
    /// The single global device binding (see [`DeviceBinding`]).
    pub binding: Arc<DeviceBinding>,
    /// The set of connected sessions (see [`ClientRegistry`]).
    pub registry: Arc<ClientRegistry>,
}

impl ServerState {
    /// Creates fresh state (unbound, no sessions) on top of a driver.
    pub fn new(driver: Box<dyn MidiDriver>) -> Self {
        Self {
            binding: Arc::new(DeviceBinding::new(driver)),
            registry: Arc::new(ClientRegistry::new()),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket TCP listener.
///
/// Separated from [`run_server`] so callers (and integration tests) can bind
/// an ephemeral port and read the actual address back before serving.
///
/// # Errors
///
/// Returns an error if the address cannot be bound (port in use, no
/// permission).  This is the only fatal failure in the process.
pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))
}

/// Runs the main WebSocket accept loop until `running` is cleared.
///
/// Each accepted connection is handed off to a dedicated Tokio task, so one
/// slow client never delays the accept loop or other sessions.
pub async fn run_server(
    listener: TcpListener,
    state: Arc<ServerState>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on accept() lets the loop re-check the shutdown
        // flag even when no clients are connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, state).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. file descriptor exhaustion).
                // Log and keep serving rather than killing the bridge.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout; loop back to check the shutdown flag.
            }
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Top-level handler for one client connection: handshake, register, run,
/// and — on every exit path — unregister.
async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
) {
    // Complete the WebSocket upgrade handshake.  Until this succeeds the
    // connection is not a session and never enters the registry.
    let ws_stream = match accept_async(raw_stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed with {peer_addr}: {e}");
            return;
        }
    };

    let session_id: SessionId = Uuid::new_v4();
    info!("session {session_id}: client connected from {peer_addr}");

    let (ws_tx, ws_rx) = ws_stream.split();

    // The session's outbound queue: replies from the reader below and
    // broadcast frames from the broadcast loop both land here.
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(SESSION_QUEUE_DEPTH);
    state.registry.add(session_id, outbound_tx.clone());

    let writer = tokio::spawn(write_outbound(outbound_rx, ws_tx, session_id));

    let result = read_commands(ws_rx, &outbound_tx, &state, session_id).await;

    // Guaranteed cleanup: the registry entry must not outlive the
    // connection, whatever ended the read loop.
    state.registry.remove(session_id);

    // Dropping our sender (the registry's clone is gone too) closes the
    // queue, so the writer drains any queued frames and exits.
    drop(outbound_tx);
    let _ = writer.await;

    match result {
        Ok(()) => info!("session {session_id}: closed normally"),
        Err(e) => warn!("session {session_id}: closed with error: {e:#}"),
    }
}

/// Writer task: drains the session's outbound queue into the WebSocket sink.
async fn write_outbound(
    mut outbound_rx: mpsc::Receiver<String>,
    mut ws_tx: futures_util::stream::SplitSink<WebSocketStream<TcpStream>, WsMessage>,
    session_id: SessionId,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = ws_tx.send(WsMessage::Text(frame)).await {
            debug!("session {session_id}: send failed ({e}); client gone");
            break;
        }
    }
}

/// Reader loop: one iteration per frame until the connection closes.
///
/// Suspends on `next()` while waiting for the client — never polls, never
/// blocks other sessions or the broadcast loop.
async fn read_commands(
    mut ws_rx: futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
    outbound: &mpsc::Sender<String>,
    state: &ServerState,
    session_id: SessionId,
) -> anyhow::Result<()> {
    while let Some(frame) = ws_rx.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!("session {session_id}: connection closed");
                break;
            }
            // Abrupt close (reset, I/O error): surface it for the log line,
            // cleanup still runs in the caller.
            Err(e) => return Err(e.into()),
        };

        match msg {
            WsMessage::Text(text) => {
                let reply = handle_text_frame(&text, &state.binding);
                let frame = serde_json::to_string(&reply)
                    .context("failed to serialize reply envelope")?;
                if outbound.send(frame).await.is_err() {
                    // Writer gone; the connection is dead.
                    break;
                }
            }
            WsMessage::Binary(_) => {
                // The protocol is JSON text only.
                warn!("session {session_id}: unexpected binary frame (ignored)");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {
                // Protocol-level ping/pong is answered by tungstenite itself.
            }
            WsMessage::Close(_) => {
                debug!("session {session_id}: close frame received");
                break;
            }
        }
    }
    Ok(())
}
