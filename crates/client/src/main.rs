mod app;
mod movement;
mod scene;
mod stats;

use std::net::SocketAddr;

use clap::Parser;

use netmesh::{ClientConfig, ConnectionAdapter, DEFAULT_PORT, NetworkEndpoint, SpawnPolicy};

use app::{App, AppSettings};
use scene::NodeHandle;

#[derive(Parser)]
#[command(name = "netmesh-client")]
#[command(about = "Headless netmesh client that walks in circles and mirrors everyone else")]
struct Args {
    #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    server: SocketAddr,

    #[arg(long, default_value_t = 30.0, help = "Simulation ticks per second")]
    tick_rate: f32,

    #[arg(long, help = "Leave after this many ticks")]
    ticks: Option<u64>,

    #[arg(long, default_value_t = 3.0)]
    walk_radius: f32,

    #[arg(long, default_value_t = 5)]
    handshake_timeout: u64,

    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[arg(long, help = "Queue an entity for spawning on every join, even if already pending")]
    allow_duplicate_spawns: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ClientConfig {
        server_addr: args.server,
        connection_timeout_secs: args.timeout,
        handshake_timeout_secs: args.handshake_timeout,
        spawn_policy: if args.allow_duplicate_spawns {
            SpawnPolicy::AllowDuplicates
        } else {
            SpawnPolicy::DedupPending
        },
        ..Default::default()
    };

    log::info!("Connecting to {}", config.server_addr);
    let adapter = ConnectionAdapter::<NetworkEndpoint, NodeHandle>::connect(config)?;

    let settings = AppSettings {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
        walk_radius: args.walk_radius,
    };
    App::new(adapter, settings).run();

    Ok(())
}
