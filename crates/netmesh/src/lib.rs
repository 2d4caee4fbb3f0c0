pub mod config;
pub mod entity;
pub mod error;
pub mod net;
pub mod sync;

pub use config::ClientConfig;
pub use entity::{Appearance, EntityId, EntityState, EulerOrder, Identity, Rotation, Transform};
pub use error::{NetError, ProtocolError};
pub use net::{
    ClientConnection, ConnectionManager, ConnectionState, DEFAULT_PORT, EntityRecord,
    MAX_PACKET_SIZE, NetworkEndpoint, NetworkStats, Packet, PacketError, PacketHeader, PacketType,
    TransformState, Transport, split_existing_entities,
};
pub use sync::{
    ConnectionAdapter, IdentityStore, Registry, RegistryEvent, RemoteEntity, SpawnPolicy,
    SpawnQueue, SyncStats, TransformOutcome, TransformTarget,
};
