//! midi-bridge library crate.
//!
//! This crate provides a bridge between a local hardware MIDI input device and
//! any number of WebSocket clients.  Note events from the active device are
//! broadcast live to every connected client; a JSON control channel lets any
//! client enumerate the available devices and switch the active input.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! WebSocket clients (JSON text frames)
//!         ↕
//! [midi-bridge]
//!   ├── domain/           Pure types: wire message enums, ServerConfig
//!   ├── application/      DeviceBinding, ClientRegistry, command handling,
//!   │                     raw-event → wire-envelope translation
//!   └── infrastructure/
//!         ├── midi/           MidiDriver/MidiSource boundary (midir + mock)
//!         ├── ws_server/      WebSocket accept loop and session tasks
//!         └── broadcast_loop/ Polling fan-out task
//!         ↕
//! MIDI hardware (midir: ALSA / CoreMIDI / WinMM)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies beyond serde (no I/O, no async).
//! - `application` depends on `domain` and the `MidiDriver` trait boundary only.
//! - `infrastructure` depends on all other layers plus `tokio`, `tungstenite`,
//!   and `midir`.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: shared state (binding, registry) and message handling.
pub mod application;

/// Infrastructure layer: MIDI driver implementations, WebSocket server, and
/// the broadcast loop task.
pub mod infrastructure;
