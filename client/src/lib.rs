//! Headless client for the space-combat server: connection establishment,
//! the name handshake, command transmission and a world replica rebuilt
//! from inbound snapshot lines. Rendering is someone else's job.

pub mod game;
pub mod network;
