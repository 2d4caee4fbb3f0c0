use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use crate::error::NetError;

use super::protocol::{MAX_PACKET_SIZE, Packet, PacketHeader, PacketType};
use super::stats::NetworkStats;
use super::transport::{DuplicateFilter, Transport};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    send_sequence: u32,
    duplicates: DuplicateFilter,
    stats: NetworkStats,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    timeout: Duration,
    last_receive_time: Instant,
    /// Servers track duplicates per session instead of globally.
    server_mode: bool,
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr: None,
            send_sequence: 0,
            duplicates: DuplicateFilter::default(),
            stats: NetworkStats::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            last_receive_time: Instant::now(),
            server_mode: false,
        })
    }

    pub fn set_server_mode(&mut self, server_mode: bool) {
        self.server_mode = server_mode;
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn set_remote(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
        self.last_receive_time = Instant::now();
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn create_packet(&mut self, payload: PacketType) -> Packet {
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        Packet::new(PacketHeader::new(sequence), payload)
    }

    pub fn send_to(&mut self, packet: &Packet, addr: SocketAddr) -> Result<usize, NetError> {
        let data = packet.serialize()?;

        if data.len() > MAX_PACKET_SIZE {
            return Err(NetError::PacketTooLarge {
                size: data.len(),
                max: MAX_PACKET_SIZE,
            });
        }

        let bytes = self.socket.send_to(&data, addr)?;

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;

        Ok(bytes)
    }

    pub fn receive_from(&mut self) -> Result<Vec<(Packet, SocketAddr)>, NetError> {
        let mut packets = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => {
                    if self.remote_addr.is_some_and(|remote| remote != addr) {
                        log::trace!("Ignoring datagram from unexpected peer {}", addr);
                        continue;
                    }

                    let packet = match Packet::deserialize(&self.recv_buffer[..size]) {
                        Ok(packet) if packet.header.is_valid() => packet,
                        Ok(_) => {
                            self.stats.packets_rejected += 1;
                            log::debug!("Dropping packet with bad header from {}", addr);
                            continue;
                        }
                        Err(e) => {
                            self.stats.packets_rejected += 1;
                            log::debug!("Dropping undecodable packet from {}: {}", addr, e);
                            continue;
                        }
                    };

                    if !self.server_mode && !self.duplicates.record(packet.header.sequence) {
                        self.stats.duplicates_dropped += 1;
                        continue;
                    }

                    self.stats.packets_received += 1;
                    self.stats.bytes_received += size as u64;
                    self.last_receive_time = Instant::now();
                    packets.push((packet, addr));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // A previous send hit a closed port; not fatal for a datagram socket.
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(packets)
    }

    pub fn reset(&mut self) {
        self.remote_addr = None;
        self.send_sequence = 0;
        self.duplicates.reset();
        self.stats = NetworkStats::default();
        self.last_receive_time = Instant::now();
    }
}

impl Transport for NetworkEndpoint {
    fn send(&mut self, payload: PacketType) -> Result<usize, NetError> {
        let addr = self.remote_addr.ok_or(NetError::NotConnected)?;
        let packet = self.create_packet(payload);
        self.send_to(&packet, addr)
    }

    fn receive(&mut self) -> Result<Vec<Packet>, NetError> {
        Ok(self
            .receive_from()?
            .into_iter()
            .map(|(packet, _)| packet)
            .collect())
    }

    fn is_timed_out(&self) -> bool {
        self.last_receive_time.elapsed() > self.timeout
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
