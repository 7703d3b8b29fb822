//! midi-bridge — entry point.
//!
//! This binary streams note events from a local MIDI input device to any
//! number of WebSocket clients, and exposes a JSON control channel for
//! enumerating devices and switching the active input.
//!
//! # Usage
//!
//! ```text
//! midi-bridge [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>             Listen address [default: 127.0.0.1]
//!   --port <PORT>             Listen port [default: 8765]
//!   --poll-interval-ms <MS>   Broadcast loop throttle [default: 1]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                | Default     | Description              |
//! |-------------------------|-------------|--------------------------|
//! | `MIDI_WS_BIND`          | `127.0.0.1` | Listen address           |
//! | `MIDI_WS_PORT`          | `8765`      | Listen port              |
//! | `MIDI_POLL_INTERVAL_MS` | `1`         | Broadcast throttle (ms)  |
//!
//! # What happens at startup
//!
//! 1. `tracing_subscriber` is initialised; log level follows `RUST_LOG`.
//! 2. CLI arguments are parsed into a [`ServerConfig`].
//! 3. A Ctrl+C handler clears a shared shutdown flag when triggered.
//! 4. The broadcast loop task is spawned and the accept loop runs until the
//!    flag clears; the active device binding is released before exit.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use midi_bridge::domain::ServerConfig;
use midi_bridge::infrastructure::midi::hardware::MidirDriver;
use midi_bridge::infrastructure::{bind_listener, run_broadcast_loop, run_server, ServerState};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MIDI WebSocket bridge.
///
/// Streams live note events from the active MIDI input to every connected
/// WebSocket client and lets clients switch the active device.
#[derive(Debug, Parser)]
#[command(
    name = "midi-bridge",
    about = "Streams MIDI note events from a local input device to WebSocket clients",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket server to.
    ///
    /// Defaults to loopback only; the bridge performs no client
    /// authentication, so bind a LAN interface deliberately.
    #[arg(long, default_value = "127.0.0.1", env = "MIDI_WS_BIND")]
    bind: String,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, default_value_t = 8765, env = "MIDI_WS_PORT")]
    port: u16,

    /// Broadcast-loop throttle in milliseconds.
    ///
    /// The loop drains all pending device events every tick; this bounds CPU
    /// when the device is idle.  Keep it small — latency above a few
    /// milliseconds is audible to a player.
    #[arg(long, default_value_t = 1, env = "MIDI_POLL_INTERVAL_MS")]
    poll_interval_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(ServerConfig {
            bind_addr,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level from RUST_LOG, defaulting to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;

    // Shared shutdown flag, cleared by Ctrl+C.  The accept loop checks it
    // every 200 ms; the broadcast loop checks it every tick.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C — initiating graceful shutdown");
                    running.store(false, Ordering::Relaxed);
                }
                Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    let state = Arc::new(ServerState::new(Box::new(MidirDriver::new())));

    // Cannot-bind is the only fatal startup failure.
    let listener = bind_listener(config.bind_addr).await?;
    info!("WebSocket server started on ws://{}", config.bind_addr);

    let broadcast = tokio::spawn(run_broadcast_loop(
        Arc::clone(&state.binding),
        Arc::clone(&state.registry),
        config.poll_interval,
        Arc::clone(&running),
    ));

    run_server(listener, Arc::clone(&state), Arc::clone(&running)).await;

    let _ = broadcast.await;

    // Release the active device (best effort) before exit.
    state.binding.unbind();
    info!("midi-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
