//! MIDI input infrastructure: the platform driver boundary.
//!
//! The bridge never talks to hardware directly.  All device access goes
//! through the [`MidiDriver`] / [`MidiSource`] trait pair:
//!
//! - [`MidiDriver`] enumerates input ports and opens one by name.
//! - [`MidiSource`] is one open port; it buffers incoming messages on the
//!   driver's callback thread and hands them out through a non-blocking
//!   [`MidiSource::drain`].
//!
//! The production implementation ([`hardware::MidirDriver`]) is backed by the
//! `midir` crate; unit and integration tests use [`mock::MockDriver`] to
//! inject synthetic events without any hardware present.

pub mod hardware;
pub mod mock;

// ── Raw events ────────────────────────────────────────────────────────────────

/// One decoded MIDI message drained from an open input port.
///
/// Only the channel-voice note messages are decoded into structured variants;
/// everything else (clock, CC, aftertouch, sysex, ...) is carried as
/// [`MidiEvent::Other`] and filtered out before reaching the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
    /// Status `0x9n`: a key was pressed on channel `n`.
    ///
    /// A velocity of 0 is preserved as `NoteOn` — some keyboards use it as a
    /// release, but the bridge reports exactly what the device sent.
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Status `0x8n`: a key was released on channel `n`.
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Any other complete MIDI message; `status` is its first byte.
    Other { status: u8 },
}

impl MidiEvent {
    /// Decodes a complete raw MIDI message as delivered by the driver.
    ///
    /// Returns `None` for an empty buffer or a note message that is too short
    /// to carry its data bytes (a driver should never deliver one, but a
    /// truncated message must not panic the broadcast loop).
    pub fn parse(raw: &[u8]) -> Option<MidiEvent> {
        let status = *raw.first()?;
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                note: *raw.get(1)?,
                velocity: *raw.get(2)?,
            }),
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                note: *raw.get(1)?,
                velocity: *raw.get(2)?,
            }),
            _ => Some(MidiEvent::Other { status }),
        }
    }
}

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors produced at the MIDI driver boundary.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The platform driver could not be queried for its input port list.
    #[error("failed to enumerate MIDI inputs: {0}")]
    Enumeration(String),

    /// Opening the named input port failed; the binding stays unbound.
    #[error("failed to open MIDI input '{name}': {cause}")]
    Open { name: String, cause: String },

    /// The open port stopped producing events mid-poll (device unplugged).
    /// Recovered by the broadcast loop as an implicit unbind.
    #[error("MIDI input disconnected")]
    Disconnected,
}

// ── Driver traits ─────────────────────────────────────────────────────────────

/// An open MIDI input port.
///
/// Dropping a source closes the underlying port and releases its OS handle.
pub trait MidiSource: Send {
    /// The port name this source was opened with.
    fn name(&self) -> &str;

    /// Drains every message buffered since the last call, oldest first.
    ///
    /// Never blocks.  An empty vector means "no new events", not an error;
    /// [`DeviceError::Disconnected`] means the device is gone and this source
    /// will never produce again.
    fn drain(&self) -> Result<Vec<MidiEvent>, DeviceError>;
}

/// Trait abstracting MIDI input port enumeration and opening.
///
/// The production implementation uses `midir`; tests use
/// [`mock::MockDriver`].
pub trait MidiDriver: Send + Sync {
    /// Lists the names of all MIDI input ports currently visible.
    fn list_inputs(&self) -> Result<Vec<String>, DeviceError>;

    /// Opens the input port with exactly the given name.
    fn open(&self, name: &str) -> Result<Box<dyn MidiSource>, DeviceError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
