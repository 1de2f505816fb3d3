use clap::Parser;
use log::info;
use server::config::{GameMode, ServerSettings};
use server::game_loop::GameServer;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::protocol::DEFAULT_PORT)]
    port: u16,

    /// Path to a TOML settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Game mode, overriding the settings file
    #[arg(short, long, value_enum)]
    mode: Option<GameMode>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => ServerSettings::load(path)?,
        None => ServerSettings::default(),
    };
    if let Some(mode) = args.mode {
        settings.game_mode = mode;
    }
    settings.apply_game_mode();

    let address = format!("{}:{}", args.host, args.port);
    let server = GameServer::bind(&address, settings).await?;
    info!("Universe ready on {}", server.local_addr()?);

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
