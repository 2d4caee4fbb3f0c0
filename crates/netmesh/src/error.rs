use std::io;

use crate::net::PacketError;

/// A decoded packet whose contents break the data model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("entity id 0 is reserved")]
    ReservedId,
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("unknown euler order {0}")]
    UnknownEulerOrder(u8),
    #[error("invalid appearance: {0}")]
    InvalidAppearance(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("packet of {size} bytes exceeds MTU of {max}")]
    PacketTooLarge { size: usize, max: usize },
    #[error("no remote address set")]
    NotConnected,
}
