use std::fmt;
use std::net::SocketAddr;

use netmesh::EntityId;

/// Something the relay did that an operator may want to see. Rendered either by the TUI log pane
/// or, headless, through `log`.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    HandshakeStarted {
        addr: SocketAddr,
    },
    Joined {
        client_id: u32,
        addr: SocketAddr,
        entity_id: EntityId,
    },
    Left {
        client_id: u32,
        reason: LeaveReason,
    },
    Denied {
        addr: SocketAddr,
        reason: String,
    },
    BadChallenge {
        addr: SocketAddr,
    },
    TransformRejected {
        client_id: u32,
        reason: String,
    },
    SendFailed {
        addr: SocketAddr,
        packet: &'static str,
        error: String,
    },
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Graceful,
    Timeout,
    Kicked,
    /// The initial sync could not be delivered, so the session was rolled back.
    SyncFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl ServerEvent {
    pub fn severity(&self) -> Severity {
        match self {
            ServerEvent::HandshakeStarted { .. } => Severity::Debug,
            ServerEvent::Joined { .. } => Severity::Info,
            ServerEvent::Left { reason, .. } => match reason {
                LeaveReason::SyncFailed => Severity::Warn,
                _ => Severity::Info,
            },
            ServerEvent::Denied { .. }
            | ServerEvent::BadChallenge { .. }
            | ServerEvent::TransformRejected { .. } => Severity::Warn,
            ServerEvent::SendFailed { .. } | ServerEvent::Network(_) => Severity::Error,
        }
    }

    pub fn log(&self) {
        let level = match self.severity() {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        log::log!(level, "{}", self);
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::HandshakeStarted { addr } => write!(f, "Connection request from {}", addr),
            ServerEvent::Joined {
                client_id,
                addr,
                entity_id,
            } => write!(
                f,
                "Client {} joined from {} as entity {}",
                client_id, addr, entity_id
            ),
            ServerEvent::Left { client_id, reason } => {
                write!(f, "Client {} {}", client_id, reason.as_str())
            }
            ServerEvent::Denied { addr, reason } => write!(f, "Denied {}: {}", addr, reason),
            ServerEvent::BadChallenge { addr } => {
                write!(f, "Invalid challenge response from {}", addr)
            }
            ServerEvent::TransformRejected { client_id, reason } => {
                write!(f, "Rejected transform from client {}: {}", client_id, reason)
            }
            ServerEvent::SendFailed {
                addr,
                packet,
                error,
            } => write!(f, "Failed to send {} to {}: {}", packet, addr, error),
            ServerEvent::Network(message) => write!(f, "Network error: {}", message),
        }
    }
}

impl LeaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveReason::Graceful => "disconnected",
            LeaveReason::Timeout => "timed out",
            LeaveReason::Kicked => "was kicked",
            LeaveReason::SyncFailed => "dropped, initial sync failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_sync_is_louder_than_a_normal_leave() {
        let normal = ServerEvent::Left {
            client_id: 1,
            reason: LeaveReason::Graceful,
        };
        let failed = ServerEvent::Left {
            client_id: 1,
            reason: LeaveReason::SyncFailed,
        };
        assert!(failed.severity() > normal.severity());
    }

    #[test]
    fn test_display_names_the_entity() {
        let event = ServerEvent::Joined {
            client_id: 3,
            addr: "127.0.0.1:5000".parse().unwrap(),
            entity_id: EntityId(7),
        };
        assert_eq!(event.to_string(), "Client 3 joined from 127.0.0.1:5000 as entity #7");
    }
}
