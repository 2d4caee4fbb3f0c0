use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use netmesh::{
    Appearance, ClientConfig, ConnectionAdapter, ConnectionManager, ConnectionState, EntityId,
    EntityRecord, EntityState, NetworkEndpoint, Packet, PacketHeader, PacketType, Rotation,
    Transform, TransformState,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

type Node = Rc<RefCell<Transform>>;
type Client = ConnectionAdapter<NetworkEndpoint, Node>;

/// Just enough of a server to drive one client through the protocol.
struct TestServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    existing: Vec<(EntityId, EntityState)>,
    next_entity_id: u32,
    received: Vec<PacketType>,
}

impl TestServer {
    fn bind(port: u16, existing: Vec<(EntityId, EntityState)>) -> Self {
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let mut endpoint = NetworkEndpoint::bind(addr).unwrap();
        endpoint.set_server_mode(true);
        let next_entity_id = existing.iter().map(|(id, _)| id.0).max().unwrap_or(0) + 1;

        Self {
            endpoint,
            connections: ConnectionManager::new(8),
            existing,
            next_entity_id,
            received: Vec::new(),
        }
    }

    fn addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    fn send(&mut self, addr: SocketAddr, payload: PacketType) {
        let client = self.connections.get_by_addr_mut(&addr).unwrap();
        let packet = Packet::new(PacketHeader::new(client.next_sequence()), payload);
        self.endpoint.send_to(&packet, addr).unwrap();
    }

    fn broadcast(&mut self, payload: PacketType) {
        let addrs: Vec<SocketAddr> = self
            .connections
            .iter()
            .filter(|c| c.is_connected())
            .map(|c| c.addr)
            .collect();
        for addr in addrs {
            self.send(addr, payload.clone());
        }
    }

    fn pump(&mut self) {
        for (packet, addr) in self.endpoint.receive_from().unwrap() {
            self.received.push(packet.payload.clone());
            match packet.payload {
                PacketType::ConnectionRequest { client_salt } => {
                    let client = self
                        .connections
                        .get_or_create_pending(addr, client_salt)
                        .unwrap();
                    let server_salt = client.server_salt;
                    let challenge = client.combined_salt();
                    self.send(
                        addr,
                        PacketType::ConnectionChallenge {
                            server_salt,
                            challenge,
                        },
                    );
                }
                PacketType::ChallengeResponse { combined_salt } => {
                    let entity_id = EntityId(self.next_entity_id);
                    self.next_entity_id += 1;

                    let client = self.connections.get_by_addr_mut(&addr).unwrap();
                    assert_eq!(combined_salt, client.combined_salt());
                    client.state = ConnectionState::Connected;
                    client.entity_id = Some(entity_id);
                    let client_id = client.client_id;

                    let identity = EntityState::new(
                        Appearance::Css("orange".into()),
                        Vec3::new(0.0, 1.0, 0.0),
                        Rotation::IDENTITY,
                    );
                    let existing = self
                        .existing
                        .iter()
                        .map(|(id, state)| EntityRecord::encode(*id, state))
                        .collect();

                    self.send(addr, PacketType::ConnectionAccepted { client_id });
                    self.send(
                        addr,
                        PacketType::IdentitySetup(EntityRecord::encode(entity_id, &identity)),
                    );
                    self.send(addr, PacketType::ExistingEntities(existing));
                }
                PacketType::TransformUpdate(transform) => {
                    let entity_id = self
                        .connections
                        .get_by_addr(&addr)
                        .and_then(|c| c.entity_id)
                        .unwrap();
                    self.broadcast(PacketType::EntityTransform {
                        entity_id: entity_id.0,
                        transform,
                    });
                }
                _ => {}
            }
        }
    }
}

fn run_until(
    server: &mut TestServer,
    client: &mut Client,
    timeout_ms: u64,
    done: impl Fn(&Client, &TestServer) -> bool,
) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        server.pump();
        client.poll().unwrap();
        if done(client, server) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn remote_state(color: u32, x: f32) -> EntityState {
    EntityState::new(Appearance::Hex(color), Vec3::new(x, 0.0, 0.0), Rotation::from_yaw(x))
}

fn connect(server: &TestServer) -> Client {
    let config = ClientConfig {
        server_addr: server.addr(),
        ..Default::default()
    };
    ConnectionAdapter::connect(config).unwrap()
}

#[test]
fn test_handshake_delivers_identity_and_existing_entities() {
    let mut server = TestServer::bind(
        next_port(),
        vec![
            (EntityId(1), remote_state(0xff0000, 1.0)),
            (EntityId(2), remote_state(0x0000ff, 2.0)),
        ],
    );
    let mut client = connect(&server);
    assert_eq!(client.state(), ConnectionState::Connecting);

    let synced = run_until(&mut server, &mut client, 1000, |c, _| {
        c.is_connected() && c.identity().is_some() && c.registry().len() == 2
    });
    assert!(synced, "client never finished initial sync");

    assert_eq!(client.identity().unwrap().id, EntityId(3));
    assert_eq!(
        client.registry().get(EntityId(1)).unwrap().state,
        remote_state(0xff0000, 1.0)
    );
    assert_eq!(client.drain_spawn_queue(), vec![EntityId(1), EntityId(2)]);
    assert!(client.drain_spawn_queue().is_empty());
}

#[test]
fn test_relayed_own_transform_is_filtered() {
    let mut server = TestServer::bind(next_port(), vec![(EntityId(1), remote_state(0, 1.0))]);
    let mut client = connect(&server);
    assert!(run_until(&mut server, &mut client, 1000, |c, _| {
        c.is_connected() && c.registry().len() == 1
    }));

    let node: Node = Rc::new(RefCell::new(Transform::default()));
    for id in client.drain_spawn_queue() {
        assert!(client.attach_handle(id, Rc::clone(&node)));
    }

    assert!(client.send_transform(Vec3::new(3.0, 0.0, 3.0), Rotation::from_yaw(1.0)));
    assert!(run_until(&mut server, &mut client, 1000, |c, _| {
        c.stats().self_transforms_dropped == 1
    }));
    assert_eq!(client.stats().transforms_forwarded, 0);
    assert_eq!(*node.borrow(), Transform::default());

    let moved = Transform::new(Vec3::new(9.0, 0.0, 1.0), Rotation::new(0.0, 0.5, 0.1));
    server.broadcast(PacketType::EntityTransform {
        entity_id: 1,
        transform: TransformState::encode(&moved),
    });
    assert!(run_until(&mut server, &mut client, 1000, |c, _| {
        c.stats().transforms_applied == 1
    }));
    assert_eq!(*node.borrow(), moved);
}

#[test]
fn test_server_disconnect_silences_sends() {
    let mut server = TestServer::bind(next_port(), Vec::new());
    let mut client = connect(&server);
    assert!(run_until(&mut server, &mut client, 1000, |c, _| c.is_connected()));

    server.broadcast(PacketType::Disconnect);
    assert!(run_until(&mut server, &mut client, 1000, |c, _| !c.is_connected()));

    let before = server.received.len();
    assert!(!client.send_transform(Vec3::ONE, Rotation::IDENTITY));
    thread::sleep(Duration::from_millis(20));
    server.pump();
    assert_eq!(server.received.len(), before);
}
