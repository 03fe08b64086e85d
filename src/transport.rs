/// Transport abstraction
///
/// The façade talks to the sensor only through [`Transport`]. UDP and
/// serial endpoints ship with the crate; anything else (a simulator, a
/// recorded session) can be injected by implementing the trait.
///
/// A transport handle belongs to exactly one sensor. It is `Send` so the
/// owning sensor can move between threads, but it is never shared.
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::contracts::ConnectionType;
use crate::errors::Result;
use crate::serial::SerialTransport;
use crate::udp::UdpTransport;

pub trait Transport: Send {
    /// Acquire the underlying handle. No-op if already open.
    fn open(&mut self) -> Result<()>;

    /// Release the underlying handle. No-op if already closed.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Write one request frame
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive one frame of `frame_len` bytes, waiting at most `timeout`
    ///
    /// Datagram transports return whatever one datagram carried and leave
    /// length validation to the codec. Stream transports return exactly
    /// `frame_len` bytes or fail with `BotaError::Timeout`.
    fn receive(&mut self, frame_len: usize, timeout: Duration) -> Result<Vec<u8>>;

    fn connection_type(&self) -> ConnectionType;
}

/// Build the transport a connection config describes, without opening it
pub fn from_config(config: &ConnectionConfig) -> Box<dyn Transport> {
    match config {
        ConnectionConfig::Udp(udp) => Box::new(UdpTransport::new(udp.clone())),
        ConnectionConfig::Serial(serial) => Box::new(SerialTransport::new(serial.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SerialConfig, UdpConfig};

    #[test]
    fn test_from_config_is_closed() {
        let udp = from_config(&ConnectionConfig::Udp(UdpConfig::new("192.168.1.1", 1000)));
        assert_eq!(udp.connection_type(), ConnectionType::Udp);
        assert!(!udp.is_open());

        let serial = from_config(&ConnectionConfig::Serial(SerialConfig::new("/dev/ttyUSB0", 115200)));
        assert_eq!(serial.connection_type(), ConnectionType::Serial);
        assert!(!serial.is_open());
    }
}
