use std::fmt;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Server-assigned id naming one networked entity. Zero is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn id(self) -> u32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EulerOrder {
    #[default]
    Xyz = 0,
    Xzy = 1,
    Yxz = 2,
    Yzx = 3,
    Zxy = 4,
    Zyx = 5,
}

impl EulerOrder {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Xyz),
            1 => Some(Self::Xzy),
            2 => Some(Self::Yxz),
            3 => Some(Self::Yzx),
            4 => Some(Self::Zxy),
            5 => Some(Self::Zyx),
            _ => None,
        }
    }

    fn euler_rot(self) -> EulerRot {
        match self {
            Self::Xyz => EulerRot::XYZ,
            Self::Xzy => EulerRot::XZY,
            Self::Yxz => EulerRot::YXZ,
            Self::Yzx => EulerRot::YZX,
            Self::Zxy => EulerRot::ZXY,
            Self::Zyx => EulerRot::ZYX,
        }
    }
}

/// Full 3-axis orientation as Euler angles in radians, tagged with the axis order they are
/// applied in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub order: EulerOrder,
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        order: EulerOrder::Xyz,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            order: EulerOrder::Xyz,
        }
    }

    pub fn with_order(x: f32, y: f32, z: f32, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Older peers only sent a heading; it maps onto a pure rotation about Y.
    pub fn from_yaw(yaw: f32) -> Self {
        Self::new(0.0, yaw, 0.0)
    }

    pub fn yaw(&self) -> f32 {
        self.y
    }

    pub fn angles(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn to_quat(&self) -> Quat {
        let [a, b, c] = self.ordered_angles();
        Quat::from_euler(self.order.euler_rot(), a, b, c)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    // glam takes the angles in the order the axes are applied.
    fn ordered_angles(&self) -> [f32; 3] {
        let (x, y, z) = (self.x, self.y, self.z);
        match self.order {
            EulerOrder::Xyz => [x, y, z],
            EulerOrder::Xzy => [x, z, y],
            EulerOrder::Yxz => [y, x, z],
            EulerOrder::Yzx => [y, z, x],
            EulerOrder::Zxy => [z, x, y],
            EulerOrder::Zyx => [z, y, x],
        }
    }
}

/// Colour/material descriptor. The sync layer only stores and forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Appearance {
    Hex(u32),
    Css(String),
    Rgb([f32; 3]),
}

impl Default for Appearance {
    fn default() -> Self {
        Self::Hex(0xffffff)
    }
}

impl Appearance {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Hex(value) if *value > 0xffffff => Err(ProtocolError::InvalidAppearance(
                format!("hex colour {:#x} out of range", value),
            )),
            Self::Css(name) if name.trim().is_empty() => Err(ProtocolError::InvalidAppearance(
                "empty colour name".to_string(),
            )),
            Self::Rgb(channels) if channels.iter().any(|c| !(0.0..=1.0).contains(c)) => Err(
                ProtocolError::InvalidAppearance(format!("rgb channels {:?} out of range", channels)),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !self.position.is_finite() {
            return Err(ProtocolError::NonFinite("position"));
        }
        if !self.rotation.is_finite() {
            return Err(ProtocolError::NonFinite("rotation"));
        }
        Ok(())
    }
}

/// Appearance and transform of an entity as last reported by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub appearance: Appearance,
    pub transform: Transform,
}

impl EntityState {
    pub fn new(appearance: Appearance, position: Vec3, rotation: Rotation) -> Self {
        Self {
            appearance,
            transform: Transform::new(position, rotation),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Rotation {
        self.transform.rotation
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.appearance.validate()?;
        self.transform.validate()
    }
}

/// The local session's own entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityId,
    pub state: EntityState,
}

impl Identity {
    pub fn new(id: EntityId, state: EntityState) -> Self {
        Self { id, state }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !self.id.is_valid() {
            return Err(ProtocolError::ReservedId);
        }
        self.state.validate()
    }
}
