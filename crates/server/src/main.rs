mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};

use config::ServerConfig;
use server::RelayServer;
use tui::{KeyAction, TerminalSession, TuiState};

#[derive(Parser)]
#[command(name = "netmesh-server")]
#[command(about = "Relay server for netmesh clients")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    #[arg(short, long, default_value_t = netmesh::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    #[arg(long, default_value_t = 10, help = "Seconds of silence before a client is dropped")]
    timeout: u64,

    #[arg(long, default_value_t = 5.0, help = "Radius of the spawn ring")]
    spawn_radius: f32,

    #[arg(long, help = "Log to stderr instead of drawing the status screen")]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut server = RelayServer::new(ServerConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        max_clients: args.max_clients,
        timeout_secs: args.timeout,
        spawn_radius: args.spawn_radius,
    })?;

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("Relay listening on {}", server.local_addr());
        server.run();
        log::info!("Relay stopped");
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

fn run_with_tui(server: &mut RelayServer) -> io::Result<()> {
    let mut session = TerminalSession::enter()?;
    let running = server.running();
    let mut state = TuiState::new();
    state.log_info(format!("Relay listening on {}", server.local_addr()));

    while running.load(Ordering::SeqCst) {
        server.tick_once();
        for event in server.drain_events() {
            state.push_event(&event);
        }

        let clients = server.client_infos();
        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match state.handle_key(key.code, &clients) {
                        KeyAction::Quit => running.store(false, Ordering::SeqCst),
                        KeyAction::Kick(client_id) => server.kick_client(client_id),
                        KeyAction::None => {}
                    }
                }
            }
        }

        session.draw(&state, &server.stats(), &clients)?;
    }

    server.shutdown_connections();
    Ok(())
}
