//! Connection establishment, the name handshake and snapshot ingestion.

use crate::game::ClientWorld;
use log::info;
use shared::protocol::{self, CommandSet};
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};

/// A connected client: the socket, its line buffer, the identity the server
/// assigned, and the world replica.
pub struct Client {
    stream: TcpStream,
    buffer: String,
    pub id: u32,
    pub universe_size: i32,
    pub world: ClientWorld,
}

/// Resolves a host name, preferring IPv4 addresses; a literal address works
/// too. A resolution failure is returned to the caller and affects nothing
/// else.
pub async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", host),
            )
        })
}

impl Client {
    /// Opens the connection and runs the handshake: send the raw player
    /// name, receive the assigned ship id and the universe size.
    pub async fn connect(host: &str, port: u16, name: &str) -> Result<Client, Box<dyn Error>> {
        let addr = resolve(host, port).await?;
        info!("Connecting to {}", addr);
        let mut stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        stream.write_all(name.as_bytes()).await?;

        let mut buffer = String::new();
        let mut chunk = [0u8; 1024];
        while buffer.matches('\n').count() < 2 {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err("server closed the connection during the handshake".into());
            }
            buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }

        let messages = protocol::extract_messages(&mut buffer);
        let id: u32 = messages
            .first()
            .and_then(|m| m.trim().parse().ok())
            .ok_or("malformed handshake: expected a ship id")?;
        let universe_size: i32 = messages
            .get(1)
            .and_then(|m| m.trim().parse().ok())
            .ok_or("malformed handshake: expected the universe size")?;
        info!("Assigned ship {} in a {}-unit universe", id, universe_size);

        // anything after the handshake lines is already snapshot data
        let mut world = ClientWorld::new(universe_size);
        for line in messages.iter().skip(2) {
            world.apply_message(line);
        }

        Ok(Client {
            stream,
            buffer,
            id,
            universe_size,
            world,
        })
    }

    /// Sends one command batch, e.g. `(FT)`. An empty set sends nothing.
    pub async fn send_commands(&mut self, commands: CommandSet) -> io::Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        self.stream.write_all(commands.to_wire().as_bytes()).await
    }

    /// Reads the next chunk from the server and folds every complete
    /// snapshot line into the world replica. Returns how many lines were
    /// applied.
    pub async fn poll(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        let n = self.stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ));
        }
        self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        let messages = protocol::extract_messages(&mut self.buffer);
        for line in &messages {
            self.world.apply_message(line);
        }
        Ok(messages.len())
    }
}
