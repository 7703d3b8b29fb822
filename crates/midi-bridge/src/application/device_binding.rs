//! The device binding: the single shared "currently active MIDI input".
//!
//! At most one input port is ever open.  Session handlers mutate the binding
//! (`bind`) or query the driver through it (`list`); the broadcast loop
//! drains it (`poll`).  All of that happens concurrently, so the active
//! source lives behind one mutex.
//!
//! # Locking discipline
//!
//! The mutex is a `std::sync::Mutex`, not a Tokio one: every driver call is
//! synchronous and brief (port enumeration / open / channel drain), and no
//! caller ever awaits while holding the guard.  Holding the lock across the
//! whole of `bind` is what makes close-before-open atomic — no concurrent
//! `poll` can observe the old source closed while the variable still points
//! at it, and two racing `bind` calls cannot leave two ports open.

use std::sync::Mutex;

use tracing::{info, warn};

use crate::infrastructure::midi::{DeviceError, MidiDriver, MidiEvent, MidiSource};

/// The lifecycle owner of the currently active MIDI input source.
///
/// Created empty at process start; the source is replaced by [`bind`],
/// cleared by [`unbind`] (or implicitly when a poll finds the device gone),
/// and released on drop at process shutdown.
///
/// [`bind`]: DeviceBinding::bind
/// [`unbind`]: DeviceBinding::unbind
pub struct DeviceBinding {
    driver: Box<dyn MidiDriver>,
    active: Mutex<Option<Box<dyn MidiSource>>>,
}

impl DeviceBinding {
    /// Creates an unbound binding on top of the given platform driver.
    pub fn new(driver: Box<dyn MidiDriver>) -> Self {
        Self {
            driver,
            active: Mutex::new(None),
        }
    }

    /// Lists the input devices currently visible to the platform driver.
    ///
    /// Pure read; does not touch the active source.
    pub fn list(&self) -> Result<Vec<String>, DeviceError> {
        self.driver.list_inputs()
    }

    /// Binds the named device, releasing any previously bound source first.
    ///
    /// On failure the binding is left *unbound* — never pointing at a
    /// half-open handle — and the error is returned for the requesting
    /// session to report.  Closing the previous source cannot fail past this
    /// call (release happens on drop).
    pub fn bind(&self, name: &str) -> Result<(), DeviceError> {
        let mut active = self.active.lock().expect("binding mutex poisoned");

        // Close-before-open: the old port must be released before the new
        // one is opened, so the same physical device can be re-bound.
        if let Some(old) = active.take() {
            info!("closing current MIDI input '{}'", old.name());
            drop(old);
        }

        match self.driver.open(name) {
            Ok(source) => {
                info!("connected to MIDI input '{name}'");
                *active = Some(source);
                Ok(())
            }
            Err(e) => {
                warn!("failed to bind MIDI input '{name}': {e}");
                Err(e)
            }
        }
    }

    /// Drains whatever events the bound source has buffered.
    ///
    /// Returns the empty vector when unbound — polling without a device is a
    /// normal state, not an error.  If the source reports a drain failure
    /// (device unplugged), the binding is cleared and the loop carries on:
    /// the failure is absorbed here and never surfaces to any client.
    pub fn poll(&self) -> Vec<MidiEvent> {
        let mut active = self.active.lock().expect("binding mutex poisoned");
        let Some(source) = active.as_ref() else {
            return Vec::new();
        };
        match source.drain() {
            Ok(events) => events,
            Err(e) => {
                warn!("active MIDI input '{}' lost ({e}); unbinding", source.name());
                *active = None;
                Vec::new()
            }
        }
    }

    /// Releases the active source, if any.  Idempotent.
    pub fn unbind(&self) {
        self.active.lock().expect("binding mutex poisoned").take();
    }

    /// Returns the name of the bound device, or `None` when unbound.
    pub fn bound_device(&self) -> Option<String> {
        self.active
            .lock()
            .expect("binding mutex poisoned")
            .as_ref()
            .map(|s| s.name().to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
