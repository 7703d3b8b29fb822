//! Control-command handling: decode a client text frame, act on the device
//! binding, produce the reply envelope.
//!
//! These functions have no I/O side effects beyond the binding itself and no
//! dependency on sockets or async runtimes, so the whole command surface is
//! unit-testable with the mock driver.
//!
//! # Error containment
//!
//! Every failure — enumeration, open, malformed JSON, unknown command — is
//! folded into an [`ServerMessage::Error`] reply for the issuing client.
//! Nothing here returns `Err`, and nothing closes the connection: a client
//! that sends garbage gets told so and may try again.

use tracing::warn;

use crate::domain::messages::{ClientCommand, ServerMessage};

use super::device_binding::DeviceBinding;

/// Handles one decoded client command against the shared binding.
///
/// `connect_device` mutates the single global binding: on success every
/// connected client's event stream switches to the new device.  The reply,
/// however, goes only to the issuing session.
pub fn handle_command(command: &ClientCommand, binding: &DeviceBinding) -> ServerMessage {
    match command {
        ClientCommand::ListDevices => match binding.list() {
            Ok(devices) => ServerMessage::DeviceList { devices },
            Err(e) => ServerMessage::Error { message: e.to_string() },
        },

        ClientCommand::ConnectDevice { device_name } => match binding.bind(device_name) {
            Ok(()) => ServerMessage::Status {
                message: format!("Connected to {device_name}"),
            },
            Err(e) => ServerMessage::Error { message: e.to_string() },
        },
    }
}

/// Handles one raw text frame from a client: decode, dispatch, reply.
///
/// Undecodable input (invalid JSON, missing or unknown `command`) yields an
/// error envelope rather than silence, so a misbehaving client can diagnose
/// itself from its own connection.
pub fn handle_text_frame(text: &str, binding: &DeviceBinding) -> ServerMessage {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => handle_command(&command, binding),
        Err(e) => {
            warn!("malformed client frame ({e}): {text}");
            ServerMessage::Error {
                message: format!("malformed or unrecognized command: {e}"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
