//! # SpaceWars Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! space-combat game. It owns the canonical world, ingests player commands
//! over one TCP connection per player, advances physics, collisions and
//! power-up state at a fixed tick rate, and broadcasts serialized snapshots
//! to every connected client as newline-delimited JSON text.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive version of the game. Ships, projectiles
//! and stars live only here; clients render whatever the latest snapshot
//! says and never influence state except through commands.
//!
//! ### Session Management
//! Handles the complete lifecycle of a connection: the name handshake and
//! ship creation, per-tick command buffering, snapshot delivery, and the
//! lazy teardown of dead peers: a session is only discovered dead when a
//! broadcast send to it fails.
//!
//! ### Power-Up Extension
//! Ships carry pluggable behavior units that can replace the default
//! handling of individual commands: a companion ship that doubles fire, a
//! four-way fire pattern, a timed post-death auto-fire. Eligibility is
//! re-evaluated from world state every tick.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Simulation
//! One task owns the `World` exclusively; there is no world lock. I/O tasks
//! communicate with it through a bounded lifecycle event queue and two
//! narrow locks: the connected-session table and the per-session
//! pending-command map. Broadcast pushes frames onto per-session channels
//! under the session lock, so a slow peer never blocks the simulation.
//!
//! ### Fixed-Tick Cadence
//! The loop targets a fixed interval, adaptively stretched while few
//! clients are connected or while a handshake is admitting a session.
//! Ticks are strictly sequential; a slow tick delays the next one.
//!
//! ### Newline-Delimited Text Protocol
//! All payloads are UTF-8 text. Inbound: the raw player name, then command
//! batches like `(FT)`. Outbound: the ship id and universe size, then one
//! JSON entity per line every tick, tagged by its id field name.
//!
//! ## Module Organization
//!
//! - [`config`]: the immutable tunable surface, loaded once at startup,
//!   with game-mode presets.
//! - [`net`]: TCP accept loop, handshake, per-connection read/write tasks.
//! - [`session`]: the session table and pending-command buffers shared
//!   between I/O tasks and the tick loop.
//! - [`game`]: the world state and every tick phase, from forces and
//!   wrapping to brute-force collisions, the soft cap and respawning.
//! - [`power_ups`]: power-up eligibility, apply, update and teardown.
//! - [`game_loop`]: the `GameServer` bootstrap and the fixed-tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerSettings;
//! use server::game_loop::GameServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut settings = ServerSettings::default();
//!     settings.apply_game_mode();
//!
//!     let server = GameServer::bind("0.0.0.0:11000", settings).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod game_loop;
pub mod net;
pub mod power_ups;
pub mod session;
