mod connection;
mod endpoint;
mod protocol;
mod stats;
mod transport;

pub use connection::{ClientConnection, ConnectionManager, ConnectionState};
pub use endpoint::NetworkEndpoint;
pub use protocol::{
    AppearanceState, EntityRecord, Packet, PacketError, PacketHeader, PacketType, TransformState,
    DEFAULT_PORT, MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, split_existing_entities,
};
pub use stats::{NetworkStats, rand_u64, unix_time_ms};
pub use transport::{DuplicateFilter, Transport};
