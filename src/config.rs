/// Driver configuration
///
/// One tagged variant per connection type, validated when the sensor is
/// constructed rather than on first use. Configs load from TOML:
///
/// ```toml
/// [connection]
/// connection_type = "udp"
/// host = "192.168.1.1"
/// port = 1000
/// timeout_ms = 500
///
/// [acquisition]
/// encoding = "f64le"
/// on_read_error = "skip"
/// ```
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::ChannelEncoding;
use crate::contracts::ConnectionType;
use crate::errors::{BotaError, Result};

/// Receive timeout used when a config omits `timeout_ms`
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Pause between calibration samples used when a config omits it
pub const DEFAULT_CALIBRATION_INTERVAL_MS: u64 = 10;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "connection_type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Udp(UdpConfig),
    Serial(SerialConfig),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UdpConfig {
    /// Sensor address, IP or hostname
    pub host: String,
    pub port: u16,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    pub baudrate: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// What `read_continuous` does when a single read fails
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadFailurePolicy {
    /// Stop and return the error
    #[default]
    Abort,
    /// Record the failure and keep sampling
    Skip,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AcquisitionConfig {
    pub encoding: ChannelEncoding,
    pub on_read_error: ReadFailurePolicy,
    pub scale_factor: f64,
    pub calibration_interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            encoding: ChannelEncoding::default(),
            on_read_error: ReadFailurePolicy::default(),
            scale_factor: 1.0,
            calibration_interval_ms: DEFAULT_CALIBRATION_INTERVAL_MS,
        }
    }
}

impl UdpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// `host:port` as accepted by `UdpSocket::send_to`
    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl ConnectionConfig {
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            Self::Udp(_) => ConnectionType::Udp,
            Self::Serial(_) => ConnectionType::Serial,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Self::Udp(udp) => Duration::from_millis(udp.timeout_ms),
            Self::Serial(serial) => Duration::from_millis(serial.timeout_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Udp(udp) => {
                if udp.host.trim().is_empty() {
                    return Err(BotaError::Configuration("udp host must not be empty".into()));
                }
                if udp.port == 0 {
                    return Err(BotaError::Configuration("udp port must be non-zero".into()));
                }
                validate_timeout(udp.timeout_ms)
            }
            Self::Serial(serial) => {
                if serial.port.trim().is_empty() {
                    return Err(BotaError::Configuration(
                        "serial port path must not be empty".into(),
                    ));
                }
                if serial.baudrate == 0 {
                    return Err(BotaError::Configuration("baudrate must be positive".into()));
                }
                validate_timeout(serial.timeout_ms)
            }
        }
    }
}

fn validate_timeout(timeout_ms: u64) -> Result<()> {
    if timeout_ms == 0 {
        return Err(BotaError::Configuration("timeout_ms must be positive".into()));
    }
    Ok(())
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(BotaError::Configuration(format!(
                "scale_factor must be positive, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }

    pub fn calibration_interval(&self) -> Duration {
        Duration::from_millis(self.calibration_interval_ms)
    }
}

impl SensorConfig {
    pub fn udp(config: UdpConfig) -> Self {
        Self {
            connection: ConnectionConfig::Udp(config),
            acquisition: AcquisitionConfig::default(),
        }
    }

    pub fn serial(config: SerialConfig) -> Self {
        Self {
            connection: ConnectionConfig::Serial(config),
            acquisition: AcquisitionConfig::default(),
        }
    }

    pub fn with_acquisition(mut self, acquisition: AcquisitionConfig) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.acquisition.on_read_error = policy;
        self
    }

    pub fn with_encoding(mut self, encoding: ChannelEncoding) -> Self {
        self.acquisition.encoding = encoding;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.acquisition.validate()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SensorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotaError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
