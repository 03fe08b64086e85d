//! BOTA Driver - client for BOTA force-torque sensors
//!
//! Connects to a sensor over UDP or a serial port, polls six-axis
//! force/torque frames, and applies a zero-offset and scale calibration.
//!
//! # Design Principles
//! - Synchronous and blocking: every call completes on the calling thread
//! - One sensor, one transport handle, no internal locking
//! - Every failure surfaces as a typed [`BotaError`]; nothing is retried
//!   behind the caller's back
//!
//! # Example
//! ```no_run
//! use bota_driver::{BotaSensor, SensorConfig, UdpConfig};
//!
//! # fn main() -> bota_driver::Result<()> {
//! let mut sensor = BotaSensor::new(SensorConfig::udp(UdpConfig::new("192.168.1.1", 1000)))?;
//! let mut session = sensor.session()?;
//! session.calibrate(100)?;
//! let reading = session.read_data()?;
//! println!("{}", reading);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod contracts;
pub mod codec;
pub mod calibration;
pub mod config;
pub mod transport;
pub mod udp;
pub mod serial;
pub mod sensor;

pub use calibration::Calibration;
pub use codec::{ChannelEncoding, FrameCodec};
pub use config::{
    AcquisitionConfig, ConnectionConfig, ReadFailurePolicy, SensorConfig, SerialConfig, UdpConfig,
};
pub use contracts::{
    CaptureStats, ChannelStats, ConnectionState, ConnectionType, ForceTorqueReading, SensorInfo,
};
pub use errors::{BotaError, ErrorKind, Result};
pub use sensor::{BotaSensor, Capture, ReadFailure, SensorSession};
pub use transport::Transport;

/// Driver version
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
