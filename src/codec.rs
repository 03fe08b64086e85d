/// Codec module - sensor wire framing
///
/// A data frame is six channel values in the order [fx, fy, fz, tx, ty, tz],
/// packed back to back with no header. Every channel is little-endian
/// IEEE-754; the width depends on [`ChannelEncoding`].
///
/// # Frame Layout (Float64Le, 48 bytes)
/// - fx: bytes 0..8
/// - fy: bytes 8..16
/// - fz: bytes 16..24
/// - tx: bytes 24..32
/// - ty: bytes 32..40
/// - tz: bytes 40..48
use serde::{Deserialize, Serialize};

use crate::contracts::{now_seconds, ForceTorqueReading, CHANNEL_COUNT, CHANNEL_NAMES};
use crate::errors::{BotaError, Result};

/// Poll request: command byte 0x01, no payload
pub const POLL_REQUEST: [u8; 2] = [0x01, 0x00];

/// Encoding of a single channel on the wire
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelEncoding {
    /// 8-byte little-endian double
    #[default]
    #[serde(rename = "f64le")]
    Float64Le,

    /// 4-byte little-endian float, widened to f64 on decode
    #[serde(rename = "f32le")]
    Float32Le,
}

impl ChannelEncoding {
    /// Width of one channel in bytes
    pub const fn width(self) -> usize {
        match self {
            Self::Float64Le => 8,
            Self::Float32Le => 4,
        }
    }

    /// Exact length of a data frame
    pub const fn frame_len(self) -> usize {
        CHANNEL_COUNT * self.width()
    }
}

/// FrameCodec - translates between readings and wire frames
///
/// Stateless apart from the encoding it was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCodec {
    encoding: ChannelEncoding,
}

impl FrameCodec {
    pub fn new(encoding: ChannelEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> ChannelEncoding {
        self.encoding
    }

    pub fn frame_len(&self) -> usize {
        self.encoding.frame_len()
    }

    /// Request frame that triggers one sample
    pub fn encode_request(&self) -> [u8; 2] {
        POLL_REQUEST
    }

    /// Decode a data frame, stamping it with the current time
    pub fn decode(&self, bytes: &[u8]) -> Result<ForceTorqueReading> {
        self.decode_at(bytes, now_seconds())
    }

    /// Decode a data frame with an explicit timestamp
    ///
    /// # Errors
    /// `BotaError::Data` if the buffer is not exactly [`Self::frame_len`]
    /// bytes or any channel is NaN or infinite. Nothing is decoded from a
    /// rejected buffer.
    pub fn decode_at(&self, bytes: &[u8], timestamp: f64) -> Result<ForceTorqueReading> {
        let expected = self.frame_len();
        let width = self.encoding.width();

        if bytes.len() % width != 0 {
            return Err(BotaError::Data(format!(
                "frame length {} is not a multiple of the {}-byte channel width",
                bytes.len(),
                width
            )));
        }
        if bytes.len() < expected {
            return Err(BotaError::Data(format!(
                "truncated frame: expected {} bytes, received {}",
                expected,
                bytes.len()
            )));
        }
        if bytes.len() > expected {
            return Err(BotaError::Data(format!(
                "oversized frame: expected {} bytes, received {}",
                expected,
                bytes.len()
            )));
        }

        let mut channels = [0.0; CHANNEL_COUNT];
        for (value, chunk) in channels.iter_mut().zip(bytes.chunks_exact(width)) {
            *value = match self.encoding {
                ChannelEncoding::Float64Le => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    f64::from_le_bytes(raw)
                }
                ChannelEncoding::Float32Le => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(chunk);
                    f32::from_le_bytes(raw) as f64
                }
            };
        }

        if let Some(index) = channels.iter().position(|v| !v.is_finite()) {
            return Err(BotaError::Data(format!(
                "non-finite value in channel {}",
                CHANNEL_NAMES[index]
            )));
        }

        Ok(ForceTorqueReading::from_channels(channels, timestamp))
    }

    /// Encode a reading as a data frame; the timestamp is not transmitted
    ///
    /// Float32Le narrows each channel and so loses precision.
    pub fn encode(&self, reading: &ForceTorqueReading) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.frame_len());
        for value in reading.channels() {
            match self.encoding {
                ChannelEncoding::Float64Le => frame.extend_from_slice(&value.to_le_bytes()),
                ChannelEncoding::Float32Le => {
                    frame.extend_from_slice(&(value as f32).to_le_bytes())
                }
            }
        }
        frame
    }
}
