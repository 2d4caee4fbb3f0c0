use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use netmesh::DEFAULT_PORT;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_clients: usize,
    pub timeout_secs: u64,
    pub spawn_radius: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_clients: 32,
            timeout_secs: 10,
            spawn_radius: 5.0,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
