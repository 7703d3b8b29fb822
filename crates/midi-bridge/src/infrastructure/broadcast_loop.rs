//! The broadcast loop: the single long-lived task that pumps device events
//! to every connected client.
//!
//! Each tick drains the device binding, translates the note events into wire
//! envelopes (preserving device order), hands each one to the registry's
//! fan-out, and then sleeps the throttle interval.  The sleep bounds CPU
//! usage while idle; it is short enough (1 ms default) that end-to-end note
//! latency stays perceptually instantaneous.
//!
//! The loop has no persistent state of its own: whether it is effectively
//! `IDLE` (unbound, every poll empty) or `ACTIVE` follows entirely from the
//! binding, observed fresh each tick.  A device disappearing mid-poll is
//! absorbed inside [`DeviceBinding::poll`] as an implicit unbind; nothing
//! ever terminates this loop except the process-wide shutdown flag.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{error, info};

use crate::application::{translate_event, ClientRegistry, DeviceBinding};

/// Drains the binding once and broadcasts every pending note event.
///
/// Returns the number of envelopes broadcast.  Factored out of the loop so
/// tests can drive a single tick deterministically.
pub fn broadcast_pending(binding: &DeviceBinding, registry: &ClientRegistry) -> usize {
    let mut sent = 0;
    for event in binding.poll() {
        let Some(envelope) = translate_event(&event) else {
            continue;
        };
        match serde_json::to_string(&envelope) {
            Ok(frame) => {
                registry.broadcast(&frame);
                sent += 1;
            }
            // Serialization of our own envelope type cannot realistically
            // fail; if it ever does, drop the event rather than the loop.
            Err(e) => error!("failed to serialize broadcast envelope: {e}"),
        }
    }
    sent
}

/// Runs the broadcast loop until `running` is cleared.
pub async fn run_broadcast_loop(
    binding: Arc<DeviceBinding>,
    registry: Arc<ClientRegistry>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
) {
    info!("MIDI broadcast loop started");
    while running.load(Ordering::Relaxed) {
        broadcast_pending(&binding, &registry);
        tokio::time::sleep(poll_interval).await;
    }
    info!("MIDI broadcast loop stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
