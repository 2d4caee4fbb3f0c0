use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;

use netmesh::{
    Appearance, ConnectionManager, ConnectionState, EntityId, EntityRecord, EntityState,
    NetError, NetworkEndpoint, NetworkStats, Packet, PacketHeader, PacketType, Rotation,
    TransformState, split_existing_entities,
};

use crate::config::ServerConfig;
use crate::events::{LeaveReason, ServerEvent};

const PALETTE: [u32; 8] = [
    0xe6194b, 0x3cb44b, 0xffe119, 0x4363d8, 0xf58231, 0x911eb4, 0x46f0f0, 0xf032e6,
];
const SPAWN_SLOTS: u32 = 12;

/// Colour for the n-th entity, cycling through a fixed palette.
pub fn palette_color(id: EntityId) -> Appearance {
    let index = id.0.saturating_sub(1) as usize % PALETTE.len();
    Appearance::Hex(PALETTE[index])
}

/// Spawn point on a ring around the origin, facing the centre.
pub fn spawn_point(id: EntityId, radius: f32) -> (Vec3, Rotation) {
    let slot = id.0.saturating_sub(1) % SPAWN_SLOTS;
    let angle = slot as f32 * std::f32::consts::TAU / SPAWN_SLOTS as f32;
    let (sin, cos) = angle.sin_cos();
    let position = Vec3::new(cos * radius, 0.0, sin * radius);
    let facing = (-position).normalize_or_zero();
    let yaw = (-facing.x).atan2(-facing.z);
    (position, Rotation::from_yaw(yaw))
}

/// Relays entity state between clients. Every accepted client owns exactly one entity; the
/// server keeps the last state it heard for each so late joiners see everyone.
pub struct RelayServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    config: ServerConfig,
    entities: BTreeMap<EntityId, EntityState>,
    next_entity_id: u32,
    relayed_transforms: u64,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl RelayServer {
    pub fn new(config: ServerConfig) -> Result<Self, NetError> {
        let mut endpoint = NetworkEndpoint::bind(config.bind_addr)?;
        endpoint.set_server_mode(true);

        Ok(Self {
            endpoint,
            connections: ConnectionManager::with_timeout(config.max_clients, config.timeout_secs),
            entities: BTreeMap::new(),
            next_entity_id: 1,
            relayed_transforms: 0,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.pending_events.drain(..) {
                event.log();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown_connections();
    }

    pub fn tick_once(&mut self) {
        if let Err(e) = self.process_network() {
            self.pending_events
                .push_back(ServerEvent::Network(e.to_string()));
        }

        for client in self.connections.cleanup_timed_out() {
            if let Some(entity_id) = client.entity_id {
                self.entities.remove(&entity_id);
            }
            self.pending_events.push_back(ServerEvent::Left {
                client_id: client.client_id,
                reason: LeaveReason::Timeout,
            });
        }
    }

    pub fn shutdown_connections(&mut self) {
        let client_ids: Vec<u32> = self.connections.iter().map(|c| c.client_id).collect();
        for client_id in client_ids {
            self.kick_client(client_id);
        }
    }

    pub fn kick_client(&mut self, client_id: u32) {
        let Some(addr) = self.connections.get(client_id).map(|c| c.addr) else {
            return;
        };
        let _ = self.send(addr, PacketType::Disconnect);

        if let Some(client) = self.connections.remove(client_id) {
            if let Some(entity_id) = client.entity_id {
                self.entities.remove(&entity_id);
            }
            self.pending_events.push_back(ServerEvent::Left {
                client_id,
                reason: LeaveReason::Kicked,
            });
        }
    }

    fn process_network(&mut self) -> Result<(), NetError> {
        let packets = self.endpoint.receive_from()?;

        for (packet, addr) in packets {
            if let Some(client) = self.connections.get_by_addr_mut(&addr) {
                if !client.duplicates.record(packet.header.sequence) {
                    continue;
                }
                client.touch();
            }

            let name = packet.payload.name();
            if let Err(e) = self.handle_packet(packet, addr) {
                self.pending_events.push_back(ServerEvent::Network(format!(
                    "failed to answer {} from {}: {}",
                    name, addr, e
                )));
            }
        }

        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> Result<(), NetError> {
        match packet.payload {
            PacketType::ConnectionRequest { client_salt } => {
                self.handle_connection_request(addr, client_salt)
            }
            PacketType::ChallengeResponse { combined_salt } => {
                self.handle_challenge_response(addr, combined_salt)
            }
            PacketType::TransformUpdate(transform) => self.handle_transform_update(addr, transform),
            PacketType::Ping { timestamp } => self.send(addr, PacketType::Pong { timestamp }),
            PacketType::Disconnect => {
                self.handle_disconnect(addr);
                Ok(())
            }
            other => {
                log::debug!("Ignoring {} packet from {}", other.name(), addr);
                Ok(())
            }
        }
    }

    fn send(&mut self, addr: SocketAddr, payload: PacketType) -> Result<(), NetError> {
        let sequence = self
            .connections
            .get_by_addr_mut(&addr)
            .map_or(0, |client| client.next_sequence());
        let packet = Packet::new(PacketHeader::new(sequence), payload);
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn broadcast(&mut self, payload: &PacketType, except: Option<SocketAddr>) {
        let addrs: Vec<SocketAddr> = self
            .connections
            .iter()
            .filter(|c| c.is_connected() && Some(c.addr) != except)
            .map(|c| c.addr)
            .collect();

        for addr in addrs {
            if let Err(e) = self.send(addr, payload.clone()) {
                self.pending_events.push_back(ServerEvent::SendFailed {
                    addr,
                    packet: payload.name(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn handle_connection_request(
        &mut self,
        addr: SocketAddr,
        client_salt: u64,
    ) -> Result<(), NetError> {
        self.pending_events
            .push_back(ServerEvent::HandshakeStarted { addr });

        let (server_salt, challenge) =
            match self.connections.get_or_create_pending(addr, client_salt) {
                Ok(client) => (client.server_salt, client.combined_salt()),
                Err(reason) => {
                    self.pending_events.push_back(ServerEvent::Denied {
                        addr,
                        reason: reason.to_string(),
                    });
                    return self.send(
                        addr,
                        PacketType::ConnectionDenied {
                            reason: reason.to_string(),
                        },
                    );
                }
            };

        self.send(
            addr,
            PacketType::ConnectionChallenge {
                server_salt,
                challenge,
            },
        )
    }

    fn handle_challenge_response(
        &mut self,
        addr: SocketAddr,
        combined_salt: u64,
    ) -> Result<(), NetError> {
        let Some(client) = self.connections.get_by_addr_mut(&addr) else {
            return Ok(());
        };

        if combined_salt != client.combined_salt() {
            self.pending_events
                .push_back(ServerEvent::BadChallenge { addr });
            return Ok(());
        }

        let client_id = client.client_id;
        if client.state == ConnectionState::Connected {
            // Our acceptance was lost; the entity already exists.
            return self.send(addr, PacketType::ConnectionAccepted { client_id });
        }

        let entity_id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        client.state = ConnectionState::Connected;
        client.entity_id = Some(entity_id);

        let (position, rotation) = spawn_point(entity_id, self.config.spawn_radius);
        let state = EntityState::new(palette_color(entity_id), position, rotation);

        let existing: Vec<EntityRecord> = self
            .entities
            .iter()
            .map(|(&id, state)| EntityRecord::encode(id, state))
            .collect();

        let mut initial_sync = vec![
            PacketType::ConnectionAccepted { client_id },
            PacketType::IdentitySetup(EntityRecord::encode(entity_id, &state)),
        ];
        initial_sync.extend(split_existing_entities(existing));

        for payload in initial_sync {
            let name = payload.name();
            if let Err(e) = self.send(addr, payload) {
                self.roll_back_session(addr, client_id);
                self.pending_events.push_back(ServerEvent::SendFailed {
                    addr,
                    packet: name,
                    error: e.to_string(),
                });
                return Ok(());
            }
        }

        // Only a fully synced newcomer becomes visible to everyone else.
        self.entities.insert(entity_id, state.clone());
        self.broadcast(
            &PacketType::EntityJoined(EntityRecord::encode(entity_id, &state)),
            Some(addr),
        );
        self.pending_events.push_back(ServerEvent::Joined {
            client_id,
            addr,
            entity_id,
        });

        Ok(())
    }

    fn roll_back_session(&mut self, addr: SocketAddr, client_id: u32) {
        let _ = self.send(addr, PacketType::Disconnect);
        if self.connections.remove_by_addr(&addr).is_some() {
            self.pending_events.push_back(ServerEvent::Left {
                client_id,
                reason: LeaveReason::SyncFailed,
            });
        }
    }

    fn handle_transform_update(
        &mut self,
        addr: SocketAddr,
        transform: TransformState,
    ) -> Result<(), NetError> {
        let Some((client_id, entity_id)) = self
            .connections
            .get_by_addr(&addr)
            .filter(|c| c.is_connected())
            .and_then(|c| Some((c.client_id, c.entity_id?)))
        else {
            return Ok(());
        };

        let decoded = match transform.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                self.pending_events.push_back(ServerEvent::TransformRejected {
                    client_id,
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        if let Some(state) = self.entities.get_mut(&entity_id) {
            state.transform = decoded;
        }

        self.relayed_transforms += 1;
        self.broadcast(
            &PacketType::EntityTransform {
                entity_id: entity_id.0,
                transform,
            },
            None,
        );
        Ok(())
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        if let Some(client) = self.connections.remove_by_addr(&addr) {
            if let Some(entity_id) = client.entity_id {
                self.entities.remove(&entity_id);
            }
            self.pending_events.push_back(ServerEvent::Left {
                client_id: client.client_id,
                reason: LeaveReason::Graceful,
            });
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            client_count: self.connections.connected_count(),
            pending_count: self.connections.total_count() - self.connections.connected_count(),
            max_clients: self.config.max_clients,
            entity_count: self.entities.len(),
            relayed_transforms: self.relayed_transforms,
            network_stats: self.endpoint.stats().clone(),
        }
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        let mut infos: Vec<ClientInfo> = self
            .connections
            .iter()
            .filter(|c| c.is_connected())
            .map(|c| ClientInfo {
                client_id: c.client_id,
                addr: c.addr,
                entity_id: c.entity_id,
                position: c
                    .entity_id
                    .and_then(|id| self.entity(id))
                    .map(|state| state.position()),
                connected_secs: c.connected_at.elapsed().as_secs(),
                idle_ms: c.last_receive_time.elapsed().as_millis() as u64,
            })
            .collect();
        infos.sort_by_key(|info| info.client_id);
        infos
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub client_count: usize,
    pub pending_count: usize,
    pub max_clients: usize,
    pub entity_count: usize,
    pub relayed_transforms: u64,
    pub network_stats: NetworkStats,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: u32,
    pub addr: SocketAddr,
    pub entity_id: Option<EntityId>,
    pub position: Option<Vec3>,
    pub connected_secs: u64,
    pub idle_ms: u64,
}
