/// Serial endpoint
///
/// A byte stream has no message boundaries, so `receive` accumulates until
/// a full frame is in hand or the deadline passes. A partial frame is never
/// handed to the codec; any leftover bytes are discarded before the next
/// request goes out.
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::config::SerialConfig;
use crate::contracts::ConnectionType;
use crate::errors::{is_timeout, BotaError, Result};
use crate::transport::Transport;

/// A byte source whose blocking reads can be bounded per call
pub trait TimedRead {
    fn read_within(&mut self, buf: &mut [u8], limit: Duration) -> io::Result<usize>;
}

impl TimedRead for Box<dyn SerialPort> {
    fn read_within(&mut self, buf: &mut [u8], limit: Duration) -> io::Result<usize> {
        self.set_timeout(limit)?;
        self.read(buf)
    }
}

/// Read exactly `frame_len` bytes or fail once `timeout` has elapsed
///
/// # Errors
/// - `BotaError::Timeout` if the frame is incomplete at the deadline
/// - `BotaError::Connection` on any other read failure
pub fn read_frame<R: TimedRead + ?Sized>(
    reader: &mut R,
    frame_len: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let timeout_ms = timeout.as_millis() as u64;
    let deadline = Instant::now() + timeout;
    let mut frame = vec![0u8; frame_len];
    let mut filled = 0;

    while filled < frame_len {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(filled, frame_len, "serial frame incomplete at deadline");
            return Err(BotaError::Timeout { timeout_ms });
        }

        match reader.read_within(&mut frame[filled..], remaining) {
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if is_timeout(&e) => {
                debug!(filled, frame_len, "serial frame incomplete at deadline");
                return Err(BotaError::Timeout { timeout_ms });
            }
            Err(e) => {
                return Err(BotaError::Connection(format!("failed to receive data: {}", e)))
            }
        }
    }

    Ok(frame)
}

pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(BotaError::not_connected)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port = serialport::new(self.config.port.as_str(), self.config.baudrate)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .open()
            .map_err(|e| {
                BotaError::Connection(format!("failed to open serial port {}: {}", self.config.port, e))
            })?;

        debug!(port = %self.config.port, baudrate = self.config.baudrate, "serial transport opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.config.port, "serial transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        // Drop the tail of any frame abandoned by an earlier timeout.
        port.clear(ClearBuffer::Input)?;
        port.write_all(bytes)
            .and_then(|_| port.flush())
            .map_err(|e| BotaError::Connection(format!("failed to send data: {}", e)))
    }

    fn receive(&mut self, frame_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let port = self.port()?;
        read_frame(port, frame_len, timeout)
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Serial
    }
}
