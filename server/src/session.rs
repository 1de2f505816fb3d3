//! Session bookkeeping shared between the I/O tasks and the tick loop.
//!
//! Two narrow locks, deliberately separate from the simulation state: one
//! over the connected-session table (broadcast iterates it; handshake and
//! reaping mutate it) and one over the per-session pending-command map
//! (per-connection read tasks append; the tick loop drains). Outbound sends
//! are pushes onto an unbounded channel, so nothing ever blocks on network
//! I/O while a lock is held.

use log::info;
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex, RwLock};

/// One connected client: its ship id and the channel its writer task drains
/// to the socket. The id equals the owning ship's id once the handshake
/// completes.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    outbound: mpsc::UnboundedSender<String>,
}

/// Tracks every connected session and its accumulated command letters.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<u32, Session>>,
    commands: Mutex<HashMap<u32, String>>,
}

impl SessionManager {
    pub fn new() -> SessionManager {
        SessionManager::default()
    }

    /// Registers a session that completed its handshake.
    pub async fn insert(&self, id: u32, outbound: mpsc::UnboundedSender<String>) {
        self.sessions
            .write()
            .await
            .insert(id, Session { id, outbound });
        self.commands.lock().await.insert(id, String::new());
        info!("Session {} registered", id);
    }

    /// Drops a session and its pending commands. Returns whether it existed.
    pub async fn remove(&self, id: u32) -> bool {
        self.commands.lock().await.remove(&id);
        let existed = self.sessions.write().await.remove(&id).is_some();
        if existed {
            info!("Session {} removed", id);
        }
        existed
    }

    /// Appends command letters arriving from a session's read task. Letters
    /// accumulate until the tick loop consumes them.
    pub async fn append_commands(&self, id: u32, letters: &str) {
        if let Some(buffer) = self.commands.lock().await.get_mut(&id) {
            buffer.push_str(letters);
        }
    }

    /// Takes every session's accumulated command buffer, clearing each one.
    /// Each session contributes at most one buffer per tick.
    pub async fn drain_commands(&self) -> Vec<(u32, String)> {
        let mut map = self.commands.lock().await;
        map.iter_mut()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(id, buffer)| (*id, std::mem::take(buffer)))
            .collect()
    }

    /// Pushes one serialized frame to every session, fire-and-forget.
    /// Returns the ids whose push failed (writer task gone), flagging them
    /// for removal.
    pub async fn broadcast(&self, frame: &str) -> Vec<u32> {
        let sessions = self.sessions.read().await;
        let mut failed = Vec::new();
        for session in sessions.values() {
            if session.outbound.send(frame.to_string()).is_err() {
                failed.push(session.id);
            }
        }
        failed
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
