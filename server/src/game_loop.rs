//! The fixed-tick loop driving the authoritative simulation.
//!
//! One task owns the world and runs every tick phase; the transport's tasks
//! only ever reach it through the session manager's buffers and the
//! lifecycle event queue. Ticks are strictly sequential: a slow tick delays
//! the next one, none are skipped.

use crate::config::ServerSettings;
use crate::game::{IdSource, World};
use crate::net::{self, NetContext, SessionEvent};
use crate::session::SessionManager;
use log::{debug, info, warn};
use shared::protocol::CommandSet;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

/// Below this many sessions the tick interval is stretched, so bursts of
/// new connections don't starve the loop.
const LOW_CLIENT_THRESHOLD: usize = 20;
const LOW_CLIENT_STRETCH_MS: u64 = 15;
/// Stretch applied while a handshake is admitting a session.
const ADMISSION_STRETCH_MS: u64 = 8;
/// Capacity of the session lifecycle event queue.
const EVENT_QUEUE_DEPTH: usize = 64;

/// The server: a bound listener plus the world and its session bookkeeping.
pub struct GameServer {
    settings: ServerSettings,
    listener: TcpListener,
    sessions: Arc<SessionManager>,
    events: mpsc::Receiver<SessionEvent>,
    ctx: Arc<NetContext>,
    admission: Arc<AtomicBool>,
    world: World,
}

impl GameServer {
    /// Binds the listening socket and builds the world. Settings are taken
    /// as given; apply the game-mode preset before calling.
    pub async fn bind(addr: &str, settings: ServerSettings) -> io::Result<GameServer> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server waiting for clients on {}", listener.local_addr()?);

        let sessions = Arc::new(SessionManager::new());
        let entity_ids = Arc::new(IdSource::new());
        let admission = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let ctx = Arc::new(NetContext {
            sessions: Arc::clone(&sessions),
            events: events_tx,
            entity_ids: Arc::clone(&entity_ids),
            universe_size: settings.universe_size,
            admission: Arc::clone(&admission),
        });
        let world = World::new(settings.clone(), entity_ids);

        Ok(GameServer {
            settings,
            listener,
            sessions,
            events: events_rx,
            ctx,
            admission,
            world,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop and the tick loop until the task is dropped.
    pub async fn run(self) {
        let GameServer {
            settings,
            listener,
            sessions,
            mut events,
            ctx,
            admission,
            mut world,
        } = self;

        tokio::spawn(net::accept_loop(listener, ctx));

        let base = Duration::from_millis(settings.tick_interval_ms);
        loop {
            let started = Instant::now();

            // ingest session lifecycle events
            while let Ok(event) = events.try_recv() {
                match event {
                    SessionEvent::Joined { id, name } => world.add_ship(id, name),
                }
            }

            // each session contributes at most one command buffer per tick
            let drained = sessions.drain_commands().await;
            let commands: Vec<(u32, CommandSet)> = drained
                .iter()
                .map(|(id, letters)| (*id, CommandSet::from_letters(letters)))
                .collect();

            world.update(&commands);

            let frame = world.serialize();
            for id in sessions.broadcast(&frame).await {
                warn!("Dropping session {} after failed send", id);
                sessions.remove(id).await;
                world.remove_session_ship(id);
            }

            if world.tick() % 250 == 0 {
                debug!(
                    "Tick {}: {} sessions, {} ships, {} projectiles",
                    world.tick(),
                    sessions.count().await,
                    world.ships.len(),
                    world.projectiles.len()
                );
            }

            let interval = tick_interval(
                base,
                sessions.count().await,
                admission.load(Ordering::Relaxed),
            );
            sleep_until(started + interval).await;
        }
    }
}

fn tick_interval(base: Duration, session_count: usize, admitting: bool) -> Duration {
    if session_count < LOW_CLIENT_THRESHOLD {
        base + Duration::from_millis(LOW_CLIENT_STRETCH_MS)
    } else if admitting {
        base + Duration::from_millis(ADMISSION_STRETCH_MS)
    } else {
        base
    }
}
