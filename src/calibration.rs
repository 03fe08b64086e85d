/// Calibration module - zero-offset and scale correction
///
/// Holds the per-channel offset and the global scale factor, and applies
/// them to raw readings. Capturing samples is the façade's job; this module
/// only does the arithmetic and enforces the invariants.
use crate::contracts::{ForceTorqueReading, CHANNEL_COUNT};
use crate::errors::{BotaError, Result};

/// Calibration - offset/scale state owned by one sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    offset: [f64; CHANNEL_COUNT],
    scale: f64,
}

impl Calibration {
    /// Zero offset, unit scale
    pub fn new() -> Self {
        Self {
            offset: [0.0; CHANNEL_COUNT],
            scale: 1.0,
        }
    }

    /// Calibration with an initial scale factor
    ///
    /// # Errors
    /// `BotaError::Configuration` if the scale is not finite and positive
    pub fn with_scale(scale: f64) -> Result<Self> {
        let mut calibration = Self::new();
        calibration.set_scale(scale)?;
        Ok(calibration)
    }

    pub fn offset(&self) -> [f64; CHANNEL_COUNT] {
        self.offset
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Replace the offset
    ///
    /// # Errors
    /// `BotaError::Configuration` unless exactly six finite values are
    /// given. The stored offset is untouched on error.
    pub fn set_offset(&mut self, offset: &[f64]) -> Result<()> {
        let offset: [f64; CHANNEL_COUNT] = offset.try_into().map_err(|_| {
            BotaError::Configuration(format!(
                "calibration offset must contain exactly {} values, got {}",
                CHANNEL_COUNT,
                offset.len()
            ))
        })?;

        if offset.iter().any(|v| !v.is_finite()) {
            return Err(BotaError::Configuration(
                "calibration offset values must be finite".to_string(),
            ));
        }

        self.offset = offset;
        Ok(())
    }

    /// Replace the scale factor
    ///
    /// # Errors
    /// `BotaError::Configuration` if the scale is not finite and positive
    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(BotaError::Configuration(format!(
                "scale factor must be positive, got {}",
                scale
            )));
        }
        self.scale = scale;
        Ok(())
    }

    /// Back to zero offset and unit scale
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// `adjusted[i] = (raw[i] - offset[i]) * scale`; timestamp is kept
    pub fn apply(&self, raw: &ForceTorqueReading) -> ForceTorqueReading {
        let raw_channels = raw.channels();
        let adjusted = std::array::from_fn(|i| (raw_channels[i] - self.offset[i]) * self.scale);
        ForceTorqueReading::from_channels(adjusted, raw.timestamp)
    }

    /// Per-channel arithmetic mean of a set of raw samples
    ///
    /// # Errors
    /// `BotaError::Configuration` for an empty sample set
    pub fn mean_offset(samples: &[ForceTorqueReading]) -> Result<[f64; CHANNEL_COUNT]> {
        if samples.is_empty() {
            return Err(BotaError::Configuration(
                "calibration requires at least one sample".to_string(),
            ));
        }

        // Incremental mean; exact when all samples are identical.
        let mut mean = [0.0; CHANNEL_COUNT];
        for (k, sample) in samples.iter().enumerate() {
            let count = (k + 1) as f64;
            for (m, value) in mean.iter_mut().zip(sample.channels()) {
                *m += (value - *m) / count;
            }
        }

        Ok(mean)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new()
    }
}
