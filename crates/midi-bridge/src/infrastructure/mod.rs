//! Infrastructure layer for midi-bridge.
//!
//! The infrastructure layer handles all I/O: MIDI hardware access behind the
//! driver traits, the WebSocket accept loop with its per-session tasks, and
//! the broadcast loop that pumps device events to clients.
//!
//! # Responsibilities
//!
//! - Enumerating and opening MIDI input ports (`midi`)
//! - Binding the TCP listener and performing WebSocket upgrade handshakes
//! - Spawning per-session Tokio tasks (reader + writer per client)
//! - Running the polling broadcast loop
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Command handling and event translation (application layer)
//! - Wire message definitions (domain layer)
//! - Configuration parsing (done in `main.rs`)

pub mod broadcast_loop;
pub mod midi;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use broadcast_loop::run_broadcast_loop;
pub use ws_server::{bind_listener, run_server, ServerState};
