use std::collections::VecDeque;
use std::net::SocketAddr;

use crate::error::NetError;

use super::protocol::{Packet, PacketType};

/// The connection a client talks through. `NetworkEndpoint` is the UDP implementation; tests
/// plug in in-memory fakes.
pub trait Transport {
    /// Sends one payload to the peer, returning the number of bytes written.
    fn send(&mut self, payload: PacketType) -> Result<usize, NetError>;

    /// Returns every packet that arrived since the last call, in arrival order. Never blocks.
    fn receive(&mut self) -> Result<Vec<Packet>, NetError>;

    fn is_timed_out(&self) -> bool;

    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

const DEFAULT_WINDOW: usize = 128;

/// Remembers recently seen sequence numbers so a datagram duplicated in flight is only
/// handled once.
#[derive(Debug)]
pub struct DuplicateFilter {
    recent: VecDeque<u32>,
    capacity: usize,
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl DuplicateFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns false if `sequence` was already seen inside the window.
    pub fn record(&mut self, sequence: u32) -> bool {
        if self.recent.contains(&sequence) {
            return false;
        }

        if self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(sequence);
        true
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}
