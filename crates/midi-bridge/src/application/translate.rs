//! Raw-event → wire-envelope translation.
//!
//! Pure functions with no I/O side effects and no dependency on async
//! runtimes, sockets, or threads.
//!
//! ```text
//! Device → Clients:  MidiEvent (driver boundary) → ServerMessage (JSON wire)
//!                    call: translate_event()
//! ```

use crate::domain::messages::{NoteEvent, ServerMessage};
use crate::infrastructure::midi::MidiEvent;

/// Translates one drained device event into its broadcast envelope.
///
/// # Returns
///
/// - `Some(msg)` for note-on and note-off events.
/// - `None` for every other MIDI message kind — only note traffic is
///   streamed to clients.
pub fn translate_event(event: &MidiEvent) -> Option<ServerMessage> {
    match *event {
        MidiEvent::NoteOn { channel, note, velocity } => Some(ServerMessage::MidiMessage {
            message: NoteEvent::NoteOn { note, velocity, channel },
        }),

        MidiEvent::NoteOff { channel, note, velocity } => Some(ServerMessage::MidiMessage {
            message: NoteEvent::NoteOff { note, velocity, channel },
        }),

        MidiEvent::Other { .. } => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
