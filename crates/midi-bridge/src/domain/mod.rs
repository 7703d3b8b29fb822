//! Domain layer for midi-bridge.
//!
//! The domain layer contains pure business-logic types that have no
//! dependencies on I/O, networking, or external frameworks.  This makes them
//! easy to test in isolation and portable to any runtime or platform.
//!
//! # What belongs in the domain layer?
//!
//! - Wire message types (the JSON "language" between clients and the bridge)
//! - Configuration structures
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - `midir` handles or anything else that touches hardware

pub mod config;
pub mod messages;

// Re-export the most commonly needed types at the domain module boundary
// so callers can write `domain::ServerConfig` instead of the longer path.
pub use config::ServerConfig;
pub use messages::{ClientCommand, NoteEvent, ServerMessage};
