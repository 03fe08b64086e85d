/// Core data structures for the BOTA driver
///
/// Readings are plain `Copy` values; everything the caller receives is
/// owned by the caller and never aliased by the driver.
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Number of measurement channels in one frame
pub const CHANNEL_COUNT: usize = 6;

/// Channel names in wire order
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = ["fx", "fy", "fz", "tx", "ty", "tz"];

/// Wall-clock time in seconds since the UNIX epoch
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// ForceTorqueReading - one six-axis sample
///
/// Forces are in newtons, torques in newton-meters. The timestamp is
/// captured on receipt, not carried in the frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ForceTorqueReading {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,

    /// Seconds since the UNIX epoch
    pub timestamp: f64,
}

impl ForceTorqueReading {
    /// Build a reading from channels in wire order
    pub fn from_channels(channels: [f64; CHANNEL_COUNT], timestamp: f64) -> Self {
        let [fx, fy, fz, tx, ty, tz] = channels;
        Self { fx, fy, fz, tx, ty, tz, timestamp }
    }

    /// Channels in wire order [fx, fy, fz, tx, ty, tz]
    pub fn channels(&self) -> [f64; CHANNEL_COUNT] {
        [self.fx, self.fy, self.fz, self.tx, self.ty, self.tz]
    }

    /// Flat channel list, timestamp excluded
    pub fn to_vec(&self) -> Vec<f64> {
        self.channels().to_vec()
    }

    /// Key-value export including the timestamp
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let mut map: BTreeMap<&'static str, f64> = CHANNEL_NAMES
            .iter()
            .copied()
            .zip(self.channels())
            .collect();
        map.insert("timestamp", self.timestamp);
        map
    }

    /// Euclidean norm of the force vector
    pub fn force_magnitude(&self) -> f64 {
        (self.fx * self.fx + self.fy * self.fy + self.fz * self.fz).sqrt()
    }

    /// Euclidean norm of the torque vector
    pub fn torque_magnitude(&self) -> f64 {
        (self.tx * self.tx + self.ty * self.ty + self.tz * self.tz).sqrt()
    }
}

impl fmt::Display for ForceTorqueReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ForceTorqueReading(fx={:.3}, fy={:.3}, fz={:.3}, tx={:.3}, ty={:.3}, tz={:.3})",
            self.fx, self.fy, self.fz, self.tx, self.ty, self.tz
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Udp,
    Serial,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Serial => f.write_str("serial"),
        }
    }
}

/// Connection state of a sensor façade
///
/// Changes only through `connect` / `disconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// SensorInfo - read-only snapshot returned by `get_info`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub connection_type: ConnectionType,
    pub calibration_offset: [f64; CHANNEL_COUNT],
    pub scale_factor: f64,
    pub connected: bool,
}

/// Summary of one channel over a set of readings
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Per-channel statistics over a capture, indexed in wire order
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CaptureStats {
    pub sample_count: usize,
    pub channels: [ChannelStats; CHANNEL_COUNT],
}

impl CaptureStats {
    /// Returns `None` for an empty slice
    pub fn from_readings(readings: &[ForceTorqueReading]) -> Option<Self> {
        let first = readings.first()?.channels();

        let mut sum = [0.0; CHANNEL_COUNT];
        let mut min = first;
        let mut max = first;

        for reading in readings {
            for (i, value) in reading.channels().into_iter().enumerate() {
                sum[i] += value;
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }

        let n = readings.len() as f64;
        let channels = std::array::from_fn(|i| ChannelStats {
            mean: sum[i] / n,
            min: min[i],
            max: max[i],
            range: max[i] - min[i],
        });

        Some(Self { sample_count: readings.len(), channels })
    }

    /// Lookup by channel name ("fx" .. "tz")
    pub fn channel(&self, name: &str) -> Option<&ChannelStats> {
        CHANNEL_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| &self.channels[i])
    }
}
