use clap::Parser;
use client::network::Client;
use log::info;
use shared::protocol::CommandSet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Server port
    #[arg(short, long, default_value_t = shared::protocol::DEFAULT_PORT)]
    port: u16,

    /// Player name sent during the handshake
    #[arg(short, long, default_value = "observer")]
    name: String,

    /// Hold the thrusters open
    #[arg(short, long)]
    thrust: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mut client = Client::connect(&args.server, args.port, &args.name).await?;

    let held = CommandSet {
        thrust: args.thrust,
        ..CommandSet::default()
    };

    let mut polls: u64 = 0;
    loop {
        client.poll().await?;
        // held commands go out once per received batch
        client.send_commands(held).await?;

        polls += 1;
        if polls % 100 == 0 {
            let me = client.world.ships.get(&client.id);
            info!(
                "{} ships, {} projectiles | hp {:?} score {:?}",
                client.world.ships.len(),
                client.world.projectiles.len(),
                me.map(|s| s.hp),
                me.map(|s| s.score)
            );
        }
    }
}
