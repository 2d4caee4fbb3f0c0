use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::net::DEFAULT_PORT;
use crate::sync::SpawnPolicy;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub connection_timeout_secs: u64,
    pub handshake_timeout_secs: u64,
    pub ping_interval_secs: f32,
    pub spawn_policy: SpawnPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            connection_timeout_secs: 10,
            handshake_timeout_secs: 5,
            ping_interval_secs: 1.0,
            spawn_policy: SpawnPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs_f32(self.ping_interval_secs.max(0.0))
    }
}
