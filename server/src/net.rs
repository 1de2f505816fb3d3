//! Asynchronous TCP transport: accepting connections, the per-connection
//! handshake, and the read/write loops.
//!
//! The transport is oblivious to game semantics. Each accepted connection
//! gets its own task; inbound bytes accumulate in a line buffer and complete
//! command messages land in the session's pending buffer, while outbound
//! frames drain through a writer task fed by an unbounded channel. Nothing
//! here ever touches entity state.

use crate::game::IdSource;
use crate::session::SessionManager;
use log::{error, info, warn};
use shared::protocol;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Session lifecycle events flowing from I/O tasks to the tick loop.
#[derive(Debug)]
pub enum SessionEvent {
    Joined { id: u32, name: String },
}

/// State the accept loop shares with every connection task.
pub struct NetContext {
    pub sessions: Arc<SessionManager>,
    pub events: mpsc::Sender<SessionEvent>,
    pub entity_ids: Arc<IdSource>,
    pub universe_size: i32,
    /// Raised while a handshake is admitting a session, so the tick cadence
    /// stretches under connection bursts.
    pub admission: Arc<AtomicBool>,
}

/// Accepts connections indefinitely, spawning one task per connection.
pub async fn accept_loop(listener: TcpListener, ctx: Arc<NetContext>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Contact from client at {}", addr);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, ctx).await {
                        warn!("Connection from {} ended: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: Arc<NetContext>,
) -> io::Result<()> {
    // tiny messages at a high rate; don't let Nagle batch them
    stream.set_nodelay(true)?;
    let (mut reader, writer) = stream.into_split();

    // handshake: the first data to arrive is the raw player name
    let mut buffer = String::new();
    let chunk_read = read_chunk(&mut reader, &mut buffer).await?;
    if chunk_read == 0 {
        return Ok(());
    }
    let name = protocol::take_player_name(&mut buffer);

    ctx.admission.store(true, Ordering::Relaxed);
    let id = ctx.entity_ids.next();

    let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(write_loop(writer, outbound_rx, id));

    // the client needs its ship id and the universe size before snapshots
    let _ = outbound.send(format!("{}\n{}\n", id, ctx.universe_size));

    ctx.sessions.insert(id, outbound).await;
    let joined = ctx
        .events
        .send(SessionEvent::Joined {
            id,
            name: name.clone(),
        })
        .await;
    ctx.admission.store(false, Ordering::Relaxed);
    info!("Client {} ({}) joined from {}", id, name, addr);

    if joined.is_err() {
        // the tick loop is gone; there is no world to join
        ctx.sessions.remove(id).await;
        return Ok(());
    }

    read_loop(&mut reader, buffer, id, &ctx).await
}

/// Steady-state read loop: complete command messages are appended to the
/// session's pending buffer, partial fragments are retained. A closed or
/// failing peer just ends the loop; disconnection is only acted on once a
/// broadcast send fails.
async fn read_loop(
    reader: &mut OwnedReadHalf,
    mut buffer: String,
    id: u32,
    ctx: &NetContext,
) -> io::Result<()> {
    loop {
        for message in protocol::extract_messages(&mut buffer) {
            if let Some(letters) = protocol::command_letters(&message) {
                ctx.sessions.append_commands(id, letters).await;
            }
        }
        if read_chunk(reader, &mut buffer).await? == 0 {
            return Ok(());
        }
    }
}

/// Reads one chunk of bytes, decoding as UTF-8 into the session buffer.
/// Returns the number of bytes read; zero means the peer closed.
async fn read_chunk(reader: &mut OwnedReadHalf, buffer: &mut String) -> io::Result<usize> {
    let mut chunk = [0u8; 1024];
    let n = reader.read(&mut chunk).await?;
    if n > 0 {
        buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
    }
    Ok(n)
}

/// Drains the session's outbound channel to the socket. A write failure
/// ends the task and drops the receiver, which is what eventually flags the
/// session for reaping: the next broadcast push fails.
async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<String>, id: u32) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = writer.write_all(text.as_bytes()).await {
            warn!("Send to session {} failed: {}", id, e);
            return;
        }
    }
}
