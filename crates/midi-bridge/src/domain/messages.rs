//! JSON message types for the client-facing WebSocket protocol.
//!
//! Every frame on the wire is a UTF-8 JSON object with a discriminator field.
//! Client→server frames carry a `"command"` field; server→client frames carry
//! a `"type"` field.  Serde's internally-tagged enum representation
//! (`#[serde(tag = ...)]`) handles both directions automatically.
//!
//! # Message flow
//!
//! ```text
//! Client → Bridge:  JSON text frame  →  ClientCommand
//! Bridge → Client:  ServerMessage    →  JSON text frame
//! ```
//!
//! # Why separate command and response enums?
//!
//! The two directions carry different information: clients send control
//! commands, the bridge sends responses and broadcast note events.  Two
//! distinct enums make it a compile-time error to accidentally send a
//! server-only message shape back to the server, and vice versa.

use serde::{Deserialize, Serialize};

// ── Client → server commands ──────────────────────────────────────────────────

/// All commands a client can send to the bridge over WebSocket.
///
/// # Serde representation
///
/// ```json
/// {"command":"list_devices"}
/// {"command":"connect_device","device_name":"Arturia KeyStep"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
// `tag = "command"` means serde looks for a `"command"` field in the JSON
// object to determine which enum variant to use when deserializing.
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Request enumeration of the MIDI input devices currently visible to the
    /// platform driver.  Answered with a [`ServerMessage::DeviceList`].
    ListDevices,

    /// Request that the bridge bind the named MIDI input device.
    ///
    /// The device binding is a single global resource: a successful
    /// `connect_device` switches the event stream that *every* connected
    /// client receives, not just the requester.  This is intentional — the
    /// bridge models one physical instrument shared by all observers.
    ConnectDevice {
        /// Exact device name as returned by a previous `list_devices`.
        device_name: String,
    },
}

// ── Server → client messages ──────────────────────────────────────────────────

/// All messages the bridge sends to clients over WebSocket.
///
/// `DeviceList`, `Status`, and `Error` are replies to the issuing client only;
/// `MidiMessage` is broadcast to every connected client.
///
/// # Serde representation
///
/// ```json
/// {"type":"device_list","devices":["Arturia KeyStep","IAC Driver Bus 1"]}
/// {"type":"status","message":"Connected to Arturia KeyStep"}
/// {"type":"error","message":"failed to open MIDI input 'X': ..."}
/// {"type":"midi_message","message":{"type":"note_on","note":60,"velocity":100,"channel":0}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to `list_devices`: the driver's current enumeration, in
    /// driver order.
    DeviceList { devices: Vec<String> },

    /// A command succeeded; `message` is a human-readable confirmation
    /// (e.g. `"Connected to <device>"`).
    Status { message: String },

    /// A command failed, or the frame could not be decoded.  `message`
    /// carries the failure cause.  Sent only to the client whose input
    /// produced the failure.
    Error { message: String },

    /// One live note event from the active device, broadcast to all clients.
    MidiMessage { message: NoteEvent },
}

/// The payload of a [`ServerMessage::MidiMessage`] envelope.
///
/// Only note events are streamed; every other MIDI message kind (clock,
/// aftertouch, CC, ...) is filtered out before reaching the wire.
///
/// A note-on with velocity 0 is kept as `note_on` rather than being folded
/// into `note_off`, so clients see exactly what the device sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    /// A key was pressed.
    NoteOn {
        /// MIDI note number, 0–127 (middle C = 60).
        note: u8,
        /// Key velocity, 0–127.
        velocity: u8,
        /// MIDI channel, 0–15.
        channel: u8,
    },
    /// A key was released.
    NoteOff {
        note: u8,
        velocity: u8,
        channel: u8,
    },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
