//! The client registry: the set of connected sessions and the broadcast
//! fan-out over them.
//!
//! Each session is represented by the sender half of a bounded per-session
//! queue of outbound JSON frames.  A dedicated writer task (infrastructure
//! layer) drains the queue into that session's WebSocket sink, which gives
//! two properties for free:
//!
//! - **FIFO per session**: replies and broadcasts for one client travel
//!   through one queue, so delivery order within a session is preserved.
//! - **Bounded send attempt**: `broadcast` never awaits a slow client; it
//!   uses `try_send`, and a session whose queue is full is evicted rather
//!   than stalling the fan-out for everyone else.
//!
//! The registry lock covers only set mutation and the snapshot — never a
//! send — so many session handlers plus the broadcast loop can hammer it
//! concurrently without serializing behind network I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Opaque per-connection identity.
pub type SessionId = Uuid;

/// Depth of each session's outbound frame queue.
///
/// Sized for bursts (a fast arpeggio is tens of events, not thousands); a
/// client that falls this many frames behind is considered stalled.
pub const SESSION_QUEUE_DEPTH: usize = 256;

/// The set of currently connected client sessions.
///
/// A session appears here iff its WebSocket handshake completed and the
/// connection has not yet closed; the session handler removes itself
/// unconditionally on the way out.
#[derive(Default)]
pub struct ClientRegistry {
    sessions: Mutex<HashMap<SessionId, mpsc::Sender<String>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session's outbound queue.  O(1).
    pub fn add(&self, id: SessionId, sender: mpsc::Sender<String>) {
        self.sessions
            .lock()
            .expect("registry mutex poisoned")
            .insert(id, sender);
    }

    /// Unregisters a session.  Idempotent: removing an absent session is a
    /// no-op, which tolerates the race between disconnect detection in the
    /// writer task and the session handler's own cleanup.
    pub fn remove(&self, id: SessionId) {
        self.sessions
            .lock()
            .expect("registry mutex poisoned")
            .remove(&id);
    }

    /// Number of currently registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers one serialized frame to every registered session.
    ///
    /// Snapshot-then-iterate: membership changes during the fan-out cannot
    /// corrupt iteration, and the lock is never held across a send.  A
    /// failed send (queue full or writer gone) evicts that session so it is
    /// not retried next tick; it never aborts delivery to the rest.
    ///
    /// Returns the number of sessions a send was attempted for.
    pub fn broadcast(&self, frame: &str) -> usize {
        let snapshot: Vec<(SessionId, mpsc::Sender<String>)> = {
            let sessions = self.sessions.lock().expect("registry mutex poisoned");
            sessions.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut evicted = Vec::new();
        for (id, tx) in &snapshot {
            match tx.try_send(frame.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("session {id}: outbound queue full; evicting stalled client");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("session {id}: outbound queue closed; evicting");
                    evicted.push(*id);
                }
            }
        }
        for id in evicted {
            self.remove(id);
        }

        snapshot.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
