//! Mock MIDI driver for unit and integration testing.
//!
//! Allows tests to stub out device enumeration, force open failures, and
//! inject synthetic [`MidiEvent`]s without any MIDI hardware or OS driver
//! present.
//!
//! The driver is `Clone` with shared interior state: tests hand one clone to
//! the bridge and keep another to inject events or reconfigure failures while
//! the bridge runs.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::{DeviceError, MidiDriver, MidiEvent, MidiSource};

/// A mock implementation of [`MidiDriver`] with test-controllable behavior.
#[derive(Clone, Default)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    inputs: Mutex<Vec<String>>,
    failing_opens: Mutex<HashSet<String>>,
    enumeration_fails: AtomicBool,
    /// Sender half of the most recently opened source, used by `inject`.
    active: Mutex<Option<Sender<MidiEvent>>>,
    open_count: AtomicU32,
}

impl MockDriver {
    /// Creates a mock driver that enumerates the given input names.
    pub fn with_inputs(names: &[&str]) -> Self {
        let driver = Self::default();
        *driver.inner.inputs.lock().expect("lock poisoned") =
            names.iter().map(|n| n.to_string()).collect();
        driver
    }

    /// Makes every subsequent `open(name)` for this device fail.
    pub fn fail_open(&self, name: &str) {
        self.inner
            .failing_opens
            .lock()
            .expect("lock poisoned")
            .insert(name.to_string());
    }

    /// Makes every subsequent `list_inputs()` call fail.
    pub fn fail_enumeration(&self) {
        self.inner.enumeration_fails.store(true, Ordering::Relaxed);
    }

    /// Injects a synthetic event into the most recently opened source, as if
    /// the hardware had produced it.
    ///
    /// Panics if no source has been opened (tests must bind a device first).
    pub fn inject(&self, event: MidiEvent) {
        let guard = self.inner.active.lock().expect("lock poisoned");
        let sender = guard
            .as_ref()
            .expect("MockDriver::inject called before any open()");
        sender
            .send(event)
            .expect("mock source has been dropped; bind a device first");
    }

    /// Simulates the active device being unplugged: the next `drain` on the
    /// open source returns [`DeviceError::Disconnected`].
    pub fn drop_active(&self) {
        self.inner.active.lock().expect("lock poisoned").take();
    }

    /// Returns how many sources this driver has opened in total.
    pub fn open_count(&self) -> u32 {
        self.inner.open_count.load(Ordering::Relaxed)
    }
}

impl MidiDriver for MockDriver {
    fn list_inputs(&self) -> Result<Vec<String>, DeviceError> {
        if self.inner.enumeration_fails.load(Ordering::Relaxed) {
            return Err(DeviceError::Enumeration(
                "mock enumeration failure".to_string(),
            ));
        }
        Ok(self.inner.inputs.lock().expect("lock poisoned").clone())
    }

    fn open(&self, name: &str) -> Result<Box<dyn MidiSource>, DeviceError> {
        if self
            .inner
            .failing_opens
            .lock()
            .expect("lock poisoned")
            .contains(name)
        {
            return Err(DeviceError::Open {
                name: name.to_string(),
                cause: "mock refuses to open this device".to_string(),
            });
        }
        if !self
            .inner
            .inputs
            .lock()
            .expect("lock poisoned")
            .iter()
            .any(|n| n == name)
        {
            return Err(DeviceError::Open {
                name: name.to_string(),
                cause: "no input port with this name".to_string(),
            });
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        *self.inner.active.lock().expect("lock poisoned") = Some(tx);
        self.inner.open_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(MockSource {
            name: name.to_string(),
            rx,
        }))
    }
}

/// A mock open port fed by [`MockDriver::inject`].
struct MockSource {
    name: String,
    rx: Receiver<MidiEvent>,
}

impl MidiSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn drain(&self) -> Result<Vec<MidiEvent>, DeviceError> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return Ok(events),
                Err(TryRecvError::Disconnected) => return Err(DeviceError::Disconnected),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
