//! Bridge configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It can be constructed from CLI arguments (preferred for production) or from
//! sensible defaults (useful for local development and tests).
//!
//! Keeping configuration as a plain struct — no global state, no environment
//! variable reads inside the domain — makes the bridge easy to embed in tests.
//! `main.rs` is responsible for populating the struct from CLI args or
//! environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// All runtime configuration for the MIDI WebSocket bridge.
///
/// Build this struct once at startup (via CLI args or defaults) and then wrap
/// it in an `Arc` so it can be shared cheaply across tasks.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port the WebSocket server binds to.
    ///
    /// Defaults to loopback only: the bridge streams raw input from a local
    /// device and performs no client authentication, so it should not be
    /// exposed on a LAN interface unless that is a deliberate choice.
    pub bind_addr: SocketAddr,

    /// Minimum pause between broadcast-loop ticks.
    ///
    /// This is a CPU throttle, not a correctness requirement: the loop drains
    /// everything the device has buffered on every tick, so a shorter interval
    /// only lowers latency.  Keep it well under 5 ms so note latency stays
    /// perceptually instantaneous.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    /// Returns a `ServerConfig` matching the classic bridge defaults:
    /// listen on `127.0.0.1:8765`, poll every 1 ms.
    fn default() -> Self {
        Self {
            // Compile-time-known valid socket address string.
            bind_addr: "127.0.0.1:8765".parse().unwrap(),
            poll_interval: Duration::from_millis(1),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
