use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Instant;

use glam::Vec3;

use crate::config::ClientConfig;
use crate::entity::{EntityId, EntityState, Identity, Rotation, Transform};
use crate::error::{NetError, ProtocolError};
use crate::net::{
    ConnectionState, EntityRecord, NetworkEndpoint, PacketType, TransformState, Transport,
    rand_u64, unix_time_ms,
};

use super::identity::IdentityStore;
use super::registry::{Registry, TransformOutcome, TransformTarget};
use super::spawn_queue::SpawnQueue;

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub packets_handled: u64,
    pub events_rejected: u64,
    pub self_joins_dropped: u64,
    pub self_transforms_dropped: u64,
    /// Transform events that made it past the self filter into the registry.
    pub transforms_forwarded: u64,
    pub transforms_applied: u64,
    pub transforms_ignored: u64,
    pub transforms_sent: u64,
    pub sends_suppressed: u64,
    pub entities_evicted: u64,
    pub last_rtt_ms: Option<u64>,
}

/// Owns the connection to the server and keeps the identity, registry and spawn queue in
/// step with what it reports.
///
/// Everything runs on the caller's thread: `poll` drains the transport and applies each
/// event to completion, in arrival order, before looking at the next one.
pub struct ConnectionAdapter<T, H> {
    transport: T,
    config: ClientConfig,
    state: ConnectionState,
    client_id: Option<u32>,
    client_salt: u64,
    handshake_started: Option<Instant>,
    last_ping_time: Instant,
    identity: IdentityStore,
    registry: Registry<H>,
    spawn_queue: SpawnQueue,
    stats: SyncStats,
}

impl<H: TransformTarget> ConnectionAdapter<NetworkEndpoint, H> {
    /// Binds a UDP endpoint, points it at `config.server_addr` and starts the handshake.
    pub fn connect(config: ClientConfig) -> Result<Self, NetError> {
        let bind_addr: SocketAddr = if config.server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let mut endpoint = NetworkEndpoint::bind(bind_addr)?;
        endpoint.set_timeout(config.connection_timeout());
        endpoint.set_remote(config.server_addr);

        let mut adapter = Self::with_transport(endpoint, config);
        adapter.begin_handshake();
        Ok(adapter)
    }
}

impl<T: Transport, H: TransformTarget> ConnectionAdapter<T, H> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            client_id: None,
            client_salt: rand_u64(),
            handshake_started: None,
            last_ping_time: Instant::now(),
            identity: IdentityStore::new(),
            registry: Registry::new(),
            spawn_queue: SpawnQueue::new(config.spawn_policy),
            stats: SyncStats::default(),
            config,
        }
    }

    pub fn begin_handshake(&mut self) {
        if self.state != ConnectionState::Disconnected {
            return;
        }

        log::info!("Connecting to {}", self.config.server_addr);
        self.client_salt = rand_u64();

        match self.transport.send(PacketType::ConnectionRequest {
            client_salt: self.client_salt,
        }) {
            Ok(_) => {
                self.state = ConnectionState::Connecting;
                self.handshake_started = Some(Instant::now());
            }
            Err(e) => log::warn!("Failed to send connection request: {}", e),
        }
    }

    /// Applies every packet the transport has buffered, then checks timeouts and keepalive.
    /// Returns the number of packets handled.
    pub fn poll(&mut self) -> Result<usize, NetError> {
        let packets = self.transport.receive()?;
        let count = packets.len();

        for packet in packets {
            self.handle_payload(packet.payload);
        }

        self.check_liveness();
        Ok(count)
    }

    pub fn handle_payload(&mut self, payload: PacketType) {
        self.stats.packets_handled += 1;

        match payload {
            PacketType::ConnectionChallenge {
                server_salt,
                challenge,
            } => self.handle_challenge(server_salt, challenge),
            PacketType::ConnectionAccepted { client_id } => {
                self.handle_connection_accepted(client_id)
            }
            PacketType::ConnectionDenied { reason } => {
                log::warn!("Connection denied: {}", reason);
                self.reset();
            }
            PacketType::IdentitySetup(record) => self.handle_identity_setup(&record),
            PacketType::ExistingEntities(records) => self.handle_existing_entities(&records),
            PacketType::EntityJoined(record) => self.handle_entity_joined(&record),
            PacketType::EntityTransform {
                entity_id,
                transform,
            } => self.handle_entity_transform(EntityId(entity_id), &transform),
            PacketType::Pong { timestamp } => self.handle_pong(timestamp),
            PacketType::Disconnect => {
                log::info!("Disconnected by server");
                self.reset();
            }
            other => log::debug!("Ignoring unexpected {} packet", other.name()),
        }
    }

    fn handle_challenge(&mut self, server_salt: u64, challenge: u64) {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::ChallengeResponse
        ) {
            return;
        }

        log::debug!("Received challenge from server");

        let expected_challenge = self.client_salt ^ server_salt;
        if challenge != expected_challenge {
            log::warn!("Challenge mismatch");
            return;
        }

        self.state = ConnectionState::ChallengeResponse;
        if let Err(e) = self.transport.send(PacketType::ChallengeResponse {
            combined_salt: expected_challenge,
        }) {
            log::warn!("Failed to answer challenge: {}", e);
        }
    }

    fn handle_connection_accepted(&mut self, client_id: u32) {
        if self.state == ConnectionState::Disconnected {
            log::debug!("Ignoring stale connection acceptance");
            return;
        }

        log::info!("Connected to server with client ID {}", client_id);
        self.state = ConnectionState::Connected;
        self.client_id = Some(client_id);
        self.handshake_started = None;
        self.last_ping_time = Instant::now();
    }

    fn handle_identity_setup(&mut self, record: &EntityRecord) {
        let identity = match record.decode_identity() {
            Ok(identity) => identity,
            Err(e) => return self.reject("identity-setup", e),
        };

        if let Some(previous) = self.identity.id() {
            if previous != identity.id {
                log::warn!("Local entity changed from {} to {}", previous, identity.id);
            }
        }

        if self.registry.evict(identity.id).is_some() {
            self.spawn_queue.cancel(identity.id);
            self.stats.entities_evicted += 1;
            log::warn!("Evicted remote entry for local entity {}", identity.id);
        }

        log::info!("Local entity is {}", identity.id);
        self.identity.set_identity(identity);
    }

    fn handle_existing_entities(&mut self, records: &[EntityRecord]) {
        if records.is_empty() {
            return;
        }

        log::debug!("Received {} existing entities", records.len());
        for record in records {
            match record.decode() {
                Ok((id, state)) => self.join_and_queue(id, state),
                Err(e) => self.reject("existing-entities", e),
            }
        }
    }

    fn handle_entity_joined(&mut self, record: &EntityRecord) {
        match record.decode() {
            Ok((id, state)) => self.join_and_queue(id, state),
            Err(e) => self.reject("entity-joined", e),
        }
    }

    fn join_and_queue(&mut self, id: EntityId, state: EntityState) {
        if self.identity.is_local(id) {
            self.stats.self_joins_dropped += 1;
            log::debug!("Dropping join for local entity {}", id);
            return;
        }

        let replaced = self.registry.join(id, state).is_some();
        if !self.spawn_queue.push(id) {
            log::trace!("Entity {} already waiting to spawn", id);
        }

        if replaced {
            log::debug!("Entity {} rejoined", id);
        } else {
            log::debug!("Entity {} joined", id);
        }
    }

    fn handle_entity_transform(&mut self, id: EntityId, state: &TransformState) {
        if !id.is_valid() {
            return self.reject("entity-transform", ProtocolError::ReservedId);
        }

        let transform = match state.decode() {
            Ok(transform) => transform,
            Err(e) => return self.reject("entity-transform", e),
        };

        if self.identity.is_local(id) {
            self.stats.self_transforms_dropped += 1;
            return;
        }

        self.stats.transforms_forwarded += 1;
        match self.registry.apply_remote_transform(id, &transform) {
            TransformOutcome::Applied => self.stats.transforms_applied += 1,
            outcome => {
                self.stats.transforms_ignored += 1;
                log::trace!("Transform for {} ignored: {:?}", id, outcome);
            }
        }
    }

    fn handle_pong(&mut self, timestamp: u64) {
        let rtt = unix_time_ms().saturating_sub(timestamp);
        self.stats.last_rtt_ms = Some(rtt);
        log::debug!("Ping RTT: {} ms", rtt);
    }

    fn reject(&mut self, event: &'static str, error: ProtocolError) {
        self.stats.events_rejected += 1;
        log::warn!("Rejected {} event: {}", event, error);
    }

    fn check_liveness(&mut self) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::ChallengeResponse => {
                if self
                    .handshake_started
                    .is_some_and(|start| start.elapsed() > self.config.handshake_timeout())
                {
                    log::warn!("Connection timeout");
                    self.reset();
                }
            }
            ConnectionState::Connected => {
                if self.transport.is_timed_out() {
                    log::warn!("Server connection lost");
                    self.reset();
                } else if self.last_ping_time.elapsed() >= self.config.ping_interval() {
                    self.last_ping_time = Instant::now();
                    let timestamp = unix_time_ms();
                    if let Err(e) = self.transport.send(PacketType::Ping { timestamp }) {
                        log::debug!("Failed to send ping: {}", e);
                    }
                }
            }
            ConnectionState::Disconnected => {}
        }
    }

    /// Sends the local entity's transform to the server. Does nothing unless connected;
    /// nothing is queued for later. Returns whether a packet went out.
    pub fn send_transform(&mut self, position: Vec3, rotation: Rotation) -> bool {
        if self.state != ConnectionState::Connected {
            self.stats.sends_suppressed += 1;
            return false;
        }

        let transform = Transform::new(position, rotation);
        if let Err(e) = transform.validate() {
            log::debug!("Not sending local transform: {}", e);
            return false;
        }

        match self
            .transport
            .send(PacketType::TransformUpdate(TransformState::encode(&transform)))
        {
            Ok(_) => {
                self.stats.transforms_sent += 1;
                true
            }
            Err(e) => {
                log::warn!("Failed to send transform: {}", e);
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            let _ = self.transport.send(PacketType::Disconnect);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.client_id = None;
        self.handshake_started = None;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.identity()
    }

    pub fn identity_store_mut(&mut self) -> &mut IdentityStore {
        &mut self.identity
    }

    pub fn registry(&self) -> &Registry<H> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<H> {
        &mut self.registry
    }

    pub fn attach_handle(&mut self, id: EntityId, handle: H) -> bool {
        self.registry.attach_handle(id, handle)
    }

    pub fn spawn_queue(&self) -> &SpawnQueue {
        &self.spawn_queue
    }

    pub fn drain_spawn_queue(&mut self) -> Vec<EntityId> {
        self.spawn_queue.drain_and_clear()
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::entity::{Appearance, EulerOrder};
    use crate::net::{Packet, PacketHeader};

    type Node = Rc<RefCell<Transform>>;

    #[derive(Default)]
    struct Wire {
        sent: Vec<PacketType>,
        inbox: VecDeque<PacketType>,
        timed_out: bool,
    }

    #[derive(Clone, Default)]
    struct FakeTransport(Rc<RefCell<Wire>>);

    impl FakeTransport {
        fn deliver(&self, payload: PacketType) {
            self.0.borrow_mut().inbox.push_back(payload);
        }

        fn sent(&self) -> Vec<PacketType> {
            self.0.borrow().sent.clone()
        }

        fn writes(&self) -> usize {
            self.0.borrow().sent.len()
        }
    }

    impl Transport for FakeTransport {
        fn send(&mut self, payload: PacketType) -> Result<usize, NetError> {
            self.0.borrow_mut().sent.push(payload);
            Ok(1)
        }

        fn receive(&mut self) -> Result<Vec<Packet>, NetError> {
            let mut wire = self.0.borrow_mut();
            Ok(wire
                .inbox
                .drain(..)
                .enumerate()
                .map(|(i, payload)| Packet::new(PacketHeader::new(i as u32), payload))
                .collect())
        }

        fn is_timed_out(&self) -> bool {
            self.0.borrow().timed_out
        }
    }

    fn state(color: u32, x: f32) -> EntityState {
        EntityState::new(
            Appearance::Hex(color),
            Vec3::new(x, 0.0, 0.0),
            Rotation::new(0.0, x, 0.0),
        )
    }

    fn record(id: u32, state: &EntityState) -> EntityRecord {
        EntityRecord::encode(EntityId(id), state)
    }

    fn transform_event(id: u32, x: f32) -> PacketType {
        PacketType::EntityTransform {
            entity_id: id,
            transform: TransformState::encode(&Transform::new(
                Vec3::new(x, x, x),
                Rotation::with_order(0.0, x, 0.0, EulerOrder::Yxz),
            )),
        }
    }

    fn adapter() -> (ConnectionAdapter<FakeTransport, Node>, FakeTransport) {
        let wire = FakeTransport::default();
        let adapter = ConnectionAdapter::with_transport(wire.clone(), ClientConfig::default());
        (adapter, wire)
    }

    fn connected_adapter() -> (ConnectionAdapter<FakeTransport, Node>, FakeTransport) {
        let (mut adapter, wire) = adapter();
        adapter.begin_handshake();

        let Some(PacketType::ConnectionRequest { client_salt }) = wire.sent().first().cloned()
        else {
            panic!("Expected ConnectionRequest");
        };
        wire.deliver(PacketType::ConnectionChallenge {
            server_salt: 77,
            challenge: client_salt ^ 77,
        });
        wire.deliver(PacketType::ConnectionAccepted { client_id: 1 });
        adapter.poll().unwrap();

        assert!(adapter.is_connected());
        (adapter, wire)
    }

    #[test]
    fn handshake_reaches_connected() {
        let (adapter, wire) = connected_adapter();
        assert_eq!(adapter.client_id(), Some(1));
        assert!(matches!(
            wire.sent()[1],
            PacketType::ChallengeResponse { .. }
        ));
    }

    #[test]
    fn bad_challenge_is_not_answered() {
        let (mut adapter, wire) = adapter();
        adapter.begin_handshake();
        wire.deliver(PacketType::ConnectionChallenge {
            server_salt: 1,
            challenge: 0xdead,
        });
        adapter.poll().unwrap();

        assert_eq!(wire.writes(), 1);
        assert_eq!(adapter.state(), ConnectionState::Connecting);
    }

    #[test]
    fn send_while_disconnected_writes_nothing() {
        let (mut adapter, wire) = adapter();

        assert!(!adapter.send_transform(Vec3::ONE, Rotation::IDENTITY));
        assert_eq!(wire.writes(), 0);
        assert_eq!(adapter.stats().sends_suppressed, 1);
    }

    #[test]
    fn send_while_connected_carries_no_id() {
        let (mut adapter, wire) = connected_adapter();
        let before = wire.writes();

        assert!(adapter.send_transform(Vec3::new(1.0, 2.0, 3.0), Rotation::from_yaw(0.5)));

        let sent = wire.sent();
        assert_eq!(sent.len(), before + 1);
        let PacketType::TransformUpdate(state) = &sent[before] else {
            panic!("Expected TransformUpdate");
        };
        assert_eq!(state.position, [1.0, 2.0, 3.0]);
        assert_eq!(state.rotation, [0.0, 0.5, 0.0]);
    }

    #[test]
    fn send_after_connection_loss_is_dropped() {
        let (mut adapter, wire) = connected_adapter();
        wire.0.borrow_mut().timed_out = true;
        adapter.poll().unwrap();
        assert_eq!(adapter.state(), ConnectionState::Disconnected);

        let before = wire.writes();
        assert!(!adapter.send_transform(Vec3::ZERO, Rotation::IDENTITY));
        assert_eq!(wire.writes(), before);
    }

    #[test]
    fn server_disconnect_moves_to_disconnected() {
        let (mut adapter, wire) = connected_adapter();
        wire.deliver(PacketType::Disconnect);
        adapter.poll().unwrap();

        assert_eq!(adapter.state(), ConnectionState::Disconnected);
        assert_eq!(adapter.client_id(), None);
    }

    #[test]
    fn identity_setup_replaces_identity() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::IdentitySetup(record(7, &state(0xff0000, 1.0))));

        let identity = adapter.identity().unwrap();
        assert_eq!(identity.id, EntityId(7));
        assert_eq!(identity.state, state(0xff0000, 1.0));
    }

    #[test]
    fn existing_batch_joins_and_queues_in_order() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::ExistingEntities(vec![
            record(1, &state(0xaa0000, 1.0)),
            record(2, &state(0x00bb00, 2.0)),
        ]));

        let registry = adapter.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(EntityId(1)).unwrap().state, state(0xaa0000, 1.0));
        assert_eq!(registry.get(EntityId(2)).unwrap().state, state(0x00bb00, 2.0));
        assert_eq!(
            adapter.drain_spawn_queue(),
            vec![EntityId(1), EntityId(2)]
        );
        assert!(adapter.drain_spawn_queue().is_empty());
    }

    #[test]
    fn empty_batch_mutates_nothing() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::ExistingEntities(Vec::new()));

        assert!(adapter.registry().is_empty());
        assert!(adapter.spawn_queue().is_empty());
    }

    #[test]
    fn malformed_record_in_batch_is_skipped() {
        let (mut adapter, _) = adapter();
        let mut broken = record(2, &state(0, 2.0));
        broken.transform.position[0] = f32::NAN;

        adapter.handle_payload(PacketType::ExistingEntities(vec![
            record(1, &state(0, 1.0)),
            broken,
            record(3, &state(0, 3.0)),
        ]));

        assert_eq!(adapter.stats().events_rejected, 1);
        assert!(!adapter.registry().contains(EntityId(2)));
        assert_eq!(
            adapter.drain_spawn_queue(),
            vec![EntityId(1), EntityId(3)]
        );
    }

    #[test]
    fn joined_entity_is_queued_once_while_pending() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::EntityJoined(record(4, &state(1, 1.0))));
        adapter.handle_payload(PacketType::EntityJoined(record(4, &state(2, 2.0))));

        assert_eq!(adapter.registry().get(EntityId(4)).unwrap().state, state(2, 2.0));
        assert_eq!(adapter.drain_spawn_queue(), vec![EntityId(4)]);
    }

    #[test]
    fn own_transform_never_reaches_registry() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::IdentitySetup(record(7, &state(0, 1.0))));
        adapter.handle_payload(transform_event(7, 9.0));

        assert!(adapter.registry().is_empty());
        assert_eq!(adapter.identity().unwrap().state, state(0, 1.0));
        assert_eq!(adapter.stats().self_transforms_dropped, 1);
        assert_eq!(adapter.stats().transforms_forwarded, 0);
    }

    #[test]
    fn own_join_is_dropped() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::IdentitySetup(record(7, &state(0, 1.0))));
        adapter.handle_payload(PacketType::EntityJoined(record(7, &state(0, 1.0))));

        assert!(adapter.registry().is_empty());
        assert!(adapter.spawn_queue().is_empty());
        assert_eq!(adapter.stats().self_joins_dropped, 1);
    }

    #[test]
    fn late_identity_evicts_matching_entry() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::EntityJoined(record(7, &state(0, 1.0))));
        adapter.handle_payload(PacketType::IdentitySetup(record(7, &state(0, 1.0))));

        assert!(!adapter.registry().contains(EntityId(7)));
        assert!(adapter.spawn_queue().is_empty());
        assert_eq!(adapter.stats().entities_evicted, 1);
    }

    #[test]
    fn remote_transform_moves_materialized_entity_only() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::EntityJoined(record(3, &state(0, 1.0))));

        adapter.handle_payload(transform_event(3, 4.0));
        assert_eq!(adapter.registry().get(EntityId(3)).unwrap().state, state(0, 1.0));
        assert_eq!(adapter.stats().transforms_ignored, 1);

        let node: Node = Rc::new(RefCell::new(Transform::default()));
        assert!(adapter.attach_handle(EntityId(3), Rc::clone(&node)));
        adapter.handle_payload(transform_event(3, 4.0));

        assert_eq!(node.borrow().position, Vec3::splat(4.0));
        assert_eq!(node.borrow().rotation.order, EulerOrder::Yxz);
        assert_eq!(adapter.stats().transforms_applied, 1);
    }

    #[test]
    fn transform_for_unknown_entity_is_ignored() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(transform_event(42, 1.0));

        assert!(adapter.registry().is_empty());
        assert_eq!(adapter.stats().transforms_forwarded, 1);
        assert_eq!(adapter.stats().transforms_ignored, 1);
    }

    #[test]
    fn malformed_transform_is_rejected_and_processing_continues() {
        let (mut adapter, wire) = connected_adapter();
        adapter.handle_payload(PacketType::EntityJoined(record(3, &state(0, 1.0))));
        let node: Node = Rc::new(RefCell::new(Transform::default()));
        adapter.attach_handle(EntityId(3), Rc::clone(&node));

        let mut broken = TransformState::encode(&Transform::default());
        broken.euler_order = 99;
        wire.deliver(PacketType::EntityTransform {
            entity_id: 3,
            transform: broken,
        });
        wire.deliver(transform_event(3, 2.0));
        assert_eq!(adapter.poll().unwrap(), 2);

        assert_eq!(adapter.stats().events_rejected, 1);
        assert_eq!(node.borrow().position, Vec3::splat(2.0));
    }

    #[test]
    fn transform_before_identity_is_forwarded() {
        let (mut adapter, _) = adapter();
        adapter.handle_payload(PacketType::EntityJoined(record(3, &state(0, 1.0))));
        let node: Node = Rc::new(RefCell::new(Transform::default()));
        adapter.attach_handle(EntityId(3), Rc::clone(&node));

        adapter.handle_payload(transform_event(3, 5.0));
        assert!(adapter.identity().is_none());
        assert_eq!(node.borrow().position, Vec3::splat(5.0));
        assert_eq!(adapter.stats().transforms_forwarded, 1);

        // Once the identity names the same entity, its transforms stop reaching the registry.
        adapter.handle_payload(PacketType::IdentitySetup(record(3, &state(0, 1.0))));
        adapter.handle_payload(transform_event(3, 6.0));
        assert!(!adapter.registry().contains(EntityId(3)));
        assert_eq!(node.borrow().position, Vec3::splat(5.0));
        assert_eq!(adapter.stats().self_transforms_dropped, 1);
    }

    #[test]
    fn transform_for_reserved_id_is_rejected() {
        let (mut adapter, _) = connected_adapter();
        adapter.handle_payload(transform_event(0, 1.0));

        assert_eq!(adapter.stats().events_rejected, 1);
        assert_eq!(adapter.stats().transforms_forwarded, 0);
        assert_eq!(adapter.stats().transforms_ignored, 0);
    }

    #[test]
    fn identity_subscribers_are_notified() {
        let (mut adapter, _) = adapter();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        adapter
            .identity_store_mut()
            .subscribe(move |identity| sink.borrow_mut().push(identity.id));

        adapter.handle_payload(PacketType::IdentitySetup(record(5, &state(0, 0.0))));

        assert_eq!(*seen.borrow(), vec![EntityId(5)]);
    }

    #[test]
    fn disconnect_sends_notice_once() {
        let (mut adapter, wire) = connected_adapter();
        let before = wire.writes();

        adapter.disconnect();
        adapter.disconnect();

        assert_eq!(wire.writes(), before + 1);
        assert!(matches!(wire.sent().last(), Some(PacketType::Disconnect)));
    }
}
