//! Production MIDI driver backed by the `midir` crate.
//!
//! `midir` delivers incoming messages on a driver-owned callback thread
//! (ALSA on Linux, CoreMIDI on macOS, WinMM on Windows).  The callback must
//! return quickly, so it only copies the raw bytes into a lock-free
//! `crossbeam-channel`; decoding happens later on the broadcast loop's
//! thread when [`MidiSource::drain`] empties the channel.
//!
//! ```text
//! hardware → midir callback thread → crossbeam channel → drain() (non-blocking)
//! ```
//!
//! A fresh `MidiInput` handle is created per operation: `midir` consumes the
//! handle on `connect`, and enumeration handles are cheap.

use crossbeam_channel::{Receiver, TryRecvError};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::debug;

use super::{DeviceError, MidiDriver, MidiEvent, MidiSource};

/// Client name reported to the OS MIDI subsystem.
const CLIENT_NAME: &str = "midi-bridge";

/// The `midir`-backed production implementation of [`MidiDriver`].
#[derive(Debug, Default)]
pub struct MidirDriver;

impl MidirDriver {
    pub fn new() -> Self {
        Self
    }

    /// Creates a fresh OS-level MIDI client handle.
    fn client(&self) -> Result<MidiInput, DeviceError> {
        let mut input = MidiInput::new(CLIENT_NAME)
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;
        // Stream everything; filtering to note events happens downstream.
        input.ignore(Ignore::None);
        Ok(input)
    }
}

impl MidiDriver for MidirDriver {
    fn list_inputs(&self) -> Result<Vec<String>, DeviceError> {
        let input = self.client()?;
        let mut names = Vec::new();
        for port in input.ports() {
            match input.port_name(&port) {
                Ok(name) => names.push(name),
                // A port that disappears between ports() and port_name() is
                // simply omitted from this enumeration.
                Err(e) => debug!("skipping unnamed MIDI port: {e}"),
            }
        }
        Ok(names)
    }

    fn open(&self, name: &str) -> Result<Box<dyn MidiSource>, DeviceError> {
        let input = self.client().map_err(|e| DeviceError::Open {
            name: name.to_string(),
            cause: e.to_string(),
        })?;

        // midir identifies ports by opaque handles; resolve the requested
        // name against the current enumeration.
        let port = input
            .ports()
            .into_iter()
            .find(|p| input.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| DeviceError::Open {
                name: name.to_string(),
                cause: "no input port with this name".to_string(),
            })?;

        let (tx, rx) = crossbeam_channel::unbounded::<Vec<u8>>();

        // The callback runs on midir's thread; it must not block, so it only
        // copies the message bytes into the channel.  A send failure means
        // the receiving side (this source) was dropped — nothing to do.
        let connection = input
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, message, _ctx| {
                    let _ = tx.send(message.to_vec());
                },
                (),
            )
            .map_err(|e| DeviceError::Open {
                name: name.to_string(),
                cause: e.to_string(),
            })?;

        Ok(Box::new(MidirSource {
            name: name.to_string(),
            rx,
            _connection: connection,
        }))
    }
}

/// One open `midir` input port.
///
/// Dropping this struct drops the `MidiInputConnection`, which closes the
/// port and stops the callback thread delivering into `rx`.
struct MidirSource {
    name: String,
    rx: Receiver<Vec<u8>>,
    _connection: MidiInputConnection<()>,
}

impl MidiSource for MidirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn drain(&self) -> Result<Vec<MidiEvent>, DeviceError> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(raw) => {
                    if let Some(event) = MidiEvent::parse(&raw) {
                        events.push(event);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(events),
                // The sender lives inside our own connection, so this arm is
                // unreachable while the connection is held; kept for the
                // trait contract.
                Err(TryRecvError::Disconnected) => return Err(DeviceError::Disconnected),
            }
        }
    }
}
