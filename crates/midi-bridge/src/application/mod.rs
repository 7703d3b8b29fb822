//! Application layer for midi-bridge.
//!
//! The application layer owns the two pieces of shared state at the heart of
//! the bridge and the pure logic that operates on them:
//!
//! - [`DeviceBinding`]: the single global "currently active MIDI input".
//! - [`ClientRegistry`]: the set of connected client sessions and the
//!   broadcast fan-out over them.
//! - Command handling ([`commands`]): decode a client frame, act on the
//!   binding, produce the reply envelope.
//! - Event translation ([`translate`]): raw device event → wire envelope.
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning (that happens in the infrastructure layer)
//! - WebSocket framing (handled by tokio-tungstenite)
//! - Direct `midir` calls (hidden behind the `MidiDriver` trait)

pub mod client_registry;
pub mod commands;
pub mod device_binding;
pub mod translate;

// Re-export the primary types so callers can write `application::DeviceBinding`.
pub use client_registry::{ClientRegistry, SessionId, SESSION_QUEUE_DEPTH};
pub use commands::handle_text_frame;
pub use device_binding::DeviceBinding;
pub use translate::translate_event;
