use glam::Vec3;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::entity::{
    Appearance, EntityId, EntityState, EulerOrder, Identity, Rotation, Transform,
};
use crate::error::ProtocolError;

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4E4D5348;
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct TransformState {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub euler_order: u8,
}

impl TransformState {
    pub fn encode(transform: &Transform) -> Self {
        Self {
            position: transform.position.into(),
            rotation: transform.rotation.angles(),
            euler_order: transform.rotation.order as u8,
        }
    }

    pub fn decode(&self) -> Result<Transform, ProtocolError> {
        let order = EulerOrder::from_u8(self.euler_order)
            .ok_or(ProtocolError::UnknownEulerOrder(self.euler_order))?;
        let [x, y, z] = self.rotation;
        let transform = Transform::new(
            Vec3::from(self.position),
            Rotation::with_order(x, y, z, order),
        );
        transform.validate()?;
        Ok(transform)
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum AppearanceState {
    Hex(u32),
    Css(String),
    Rgb([f32; 3]),
}

impl AppearanceState {
    pub fn encode(appearance: &Appearance) -> Self {
        match appearance {
            Appearance::Hex(value) => Self::Hex(*value),
            Appearance::Css(name) => Self::Css(name.clone()),
            Appearance::Rgb(channels) => Self::Rgb(*channels),
        }
    }

    pub fn decode(&self) -> Result<Appearance, ProtocolError> {
        let appearance = match self {
            Self::Hex(value) => Appearance::Hex(*value),
            Self::Css(name) => Appearance::Css(name.clone()),
            Self::Rgb(channels) => Appearance::Rgb(*channels),
        };
        appearance.validate()?;
        Ok(appearance)
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityRecord {
    pub entity_id: u32,
    pub appearance: AppearanceState,
    pub transform: TransformState,
}

impl EntityRecord {
    pub fn encode(id: EntityId, state: &EntityState) -> Self {
        Self {
            entity_id: id.0,
            appearance: AppearanceState::encode(&state.appearance),
            transform: TransformState::encode(&state.transform),
        }
    }

    pub fn decode(&self) -> Result<(EntityId, EntityState), ProtocolError> {
        let id = EntityId(self.entity_id);
        if !id.is_valid() {
            return Err(ProtocolError::ReservedId);
        }
        let state = EntityState {
            appearance: self.appearance.decode()?,
            transform: self.transform.decode()?,
        };
        Ok((id, state))
    }

    pub fn encode_identity(identity: &Identity) -> Self {
        Self::encode(identity.id, &identity.state)
    }

    pub fn decode_identity(&self) -> Result<Identity, ProtocolError> {
        let (id, state) = self.decode()?;
        Ok(Identity::new(id, state))
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    ConnectionRequest {
        client_salt: u64,
    },
    ConnectionChallenge {
        server_salt: u64,
        challenge: u64,
    },
    ChallengeResponse {
        combined_salt: u64,
    },
    ConnectionAccepted {
        client_id: u32,
    },
    ConnectionDenied {
        reason: String,
    },
    /// The receiving session's own entity.
    IdentitySetup(EntityRecord),
    /// Entities that were present before the receiver joined, in server order.
    ExistingEntities(Vec<EntityRecord>),
    EntityJoined(EntityRecord),
    EntityTransform {
        entity_id: u32,
        transform: TransformState,
    },
    /// Client to server. Carries no id; the server knows the sender from its session.
    TransformUpdate(TransformState),
    Ping {
        timestamp: u64,
    },
    Pong {
        timestamp: u64,
    },
    Disconnect,
}

impl PacketType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionRequest { .. } => "connection-request",
            Self::ConnectionChallenge { .. } => "connection-challenge",
            Self::ChallengeResponse { .. } => "challenge-response",
            Self::ConnectionAccepted { .. } => "connection-accepted",
            Self::ConnectionDenied { .. } => "connection-denied",
            Self::IdentitySetup(_) => "identity-setup",
            Self::ExistingEntities(_) => "existing-entities",
            Self::EntityJoined(_) => "entity-joined",
            Self::EntityTransform { .. } => "entity-transform",
            Self::TransformUpdate(_) => "transform-update",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        // Datagram buffers carry no alignment guarantee.
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(PacketError::Deserialize)
    }
}

/// Splits `records` into `ExistingEntities` payloads whose packets each fit in one datagram,
/// keeping their order. Yields at least one payload, so an empty world is still announced.
pub fn split_existing_entities(records: Vec<EntityRecord>) -> Vec<PacketType> {
    let mut batches = Vec::new();
    let mut current: Vec<EntityRecord> = Vec::new();

    for record in records {
        current.push(record);
        if current.len() > 1 && !fits_in_datagram(&current) {
            let Some(overflow) = current.pop() else {
                continue;
            };
            batches.push(PacketType::ExistingEntities(std::mem::take(&mut current)));
            current.push(overflow);
        }
    }

    if !current.is_empty() || batches.is_empty() {
        batches.push(PacketType::ExistingEntities(current));
    }
    batches
}

fn fits_in_datagram(records: &[EntityRecord]) -> bool {
    let packet = Packet::new(
        PacketHeader::new(u32::MAX),
        PacketType::ExistingEntities(records.to_vec()),
    );
    packet
        .serialize()
        .is_ok_and(|bytes| bytes.len() <= MAX_PACKET_SIZE)
}
