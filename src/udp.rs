/// UDP endpoint
///
/// Stateless per-packet exchange with a fixed `host:port`. The local socket
/// binds an ephemeral port of the matching address family; replies from
/// any other peer are dropped. Datagrams still queued when a new request
/// goes out are discarded, so a reply that missed its deadline is never
/// taken as the answer to a later poll.
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::UdpConfig;
use crate::contracts::ConnectionType;
use crate::errors::{is_timeout, BotaError, Result};
use crate::transport::Transport;

/// Largest datagram accepted from the sensor
pub const MAX_DATAGRAM_SIZE: usize = 1024;

pub struct UdpTransport {
    config: UdpConfig,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    buffer: Vec<u8>,
}

impl UdpTransport {
    pub fn new(config: UdpConfig) -> Self {
        Self {
            config,
            socket: None,
            peer: None,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Local address of the bound socket, if open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn resolve(&self) -> Result<SocketAddr> {
        let destination = self.config.destination();
        destination
            .to_socket_addrs()
            .map_err(|e| BotaError::Connection(format!("cannot resolve {}: {}", destination, e)))?
            .next()
            .ok_or_else(|| BotaError::Connection(format!("no address for {}", destination)))
    }

    fn socket(&self) -> Result<(&UdpSocket, SocketAddr)> {
        match (&self.socket, self.peer) {
            (Some(socket), Some(peer)) => Ok((socket, peer)),
            _ => Err(BotaError::not_connected()),
        }
    }

    /// Drop every datagram already queued on the socket
    fn discard_pending(&mut self) -> Result<usize> {
        let socket = self.socket.as_ref().ok_or_else(BotaError::not_connected)?;

        socket.set_nonblocking(true)?;
        let mut discarded = 0;
        let outcome = loop {
            match socket.recv_from(&mut self.buffer) {
                Ok(_) => discarded += 1,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(discarded),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    break Err(BotaError::Connection(format!(
                        "failed to flush receive queue: {}",
                        e
                    )))
                }
            }
        };
        socket.set_nonblocking(false)?;
        outcome
    }
}

impl Transport for UdpTransport {
    fn open(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        let peer = self.resolve()?;
        let bind_addr = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| BotaError::Connection(format!("failed to create UDP socket: {}", e)))?;

        debug!(%peer, local = ?socket.local_addr().ok(), "udp transport opened");
        self.socket = Some(socket);
        self.peer = Some(peer);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(peer = ?self.peer, "udp transport closed");
        }
        self.peer = None;
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let discarded = self.discard_pending()?;
        if discarded > 0 {
            debug!(discarded, "discarded stale datagrams before request");
        }

        let (socket, peer) = self.socket()?;
        socket
            .send_to(bytes, peer)
            .map_err(|e| BotaError::Connection(format!("failed to send data: {}", e)))?;
        Ok(())
    }

    fn receive(&mut self, frame_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let timeout_ms = timeout.as_millis() as u64;
        let (socket, peer) = match (&self.socket, self.peer) {
            (Some(socket), Some(peer)) => (socket, peer),
            _ => return Err(BotaError::not_connected()),
        };

        if self.buffer.len() < frame_len {
            self.buffer.resize(frame_len, 0);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BotaError::Timeout { timeout_ms });
            }
            socket.set_read_timeout(Some(remaining))?;

            match socket.recv_from(&mut self.buffer) {
                Ok((received, from)) if from == peer => {
                    return Ok(self.buffer[..received].to_vec());
                }
                Ok((received, from)) => {
                    debug!(%from, received, "dropping datagram from unexpected peer");
                }
                Err(e) if is_timeout(&e) => return Err(BotaError::Timeout { timeout_ms }),
                Err(e) => {
                    return Err(BotaError::Connection(format!("failed to receive data: {}", e)))
                }
            }
        }
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Udp
    }
}
