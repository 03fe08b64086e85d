/// Sensor façade
///
/// Composes transport, codec and calibration behind a small blocking API.
/// Every call runs to completion on the calling thread; there is no
/// background acquisition. A `BotaSensor` exclusively owns its transport
/// and is not meant to be shared between threads.
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::calibration::Calibration;
use crate::codec::FrameCodec;
use crate::config::{ReadFailurePolicy, SensorConfig};
use crate::contracts::{
    CaptureStats, ConnectionState, ConnectionType, ForceTorqueReading, SensorInfo, CHANNEL_COUNT,
};
use crate::errors::{BotaError, Result};
use crate::transport::{self, Transport};

/// One failed read inside `read_continuous`
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFailure {
    /// Time since the capture started
    pub elapsed: Duration,
    pub error: BotaError,
}

/// Result of a continuous capture
///
/// `failures` is only ever non-empty under [`ReadFailurePolicy::Skip`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    pub readings: Vec<ForceTorqueReading>,
    pub failures: Vec<ReadFailure>,
}

impl Capture {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn stats(&self) -> Option<CaptureStats> {
        CaptureStats::from_readings(&self.readings)
    }

    pub fn into_readings(self) -> Vec<ForceTorqueReading> {
        self.readings
    }
}

/// BotaSensor - driver for one force-torque sensor
pub struct BotaSensor {
    transport: Box<dyn Transport>,
    codec: FrameCodec,
    calibration: Calibration,
    timeout: Duration,
    on_read_error: ReadFailurePolicy,
    calibration_interval: Duration,
    state: ConnectionState,
}

impl BotaSensor {
    /// Build a sensor from a validated config. Nothing is opened yet.
    ///
    /// # Errors
    /// `BotaError::Configuration` if the config fails validation
    pub fn new(config: SensorConfig) -> Result<Self> {
        let transport = transport::from_config(&config.connection);
        Self::with_transport(config, transport)
    }

    /// Build a sensor around a caller-supplied transport
    ///
    /// The config still supplies the timeout and acquisition settings and
    /// is validated the same way as in [`BotaSensor::new`].
    pub fn with_transport(config: SensorConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let acquisition = &config.acquisition;

        Ok(Self {
            transport,
            codec: FrameCodec::new(acquisition.encoding),
            calibration: Calibration::with_scale(acquisition.scale_factor)?,
            timeout: config.connection.timeout(),
            on_read_error: acquisition.on_read_error,
            calibration_interval: acquisition.calibration_interval(),
            state: ConnectionState::Disconnected,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        if let Err(e) = self.transport.open() {
            self.transport.close();
            return Err(e);
        }

        self.state = ConnectionState::Connected;
        info!(connection_type = %self.transport.connection_type(), "sensor connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.transport.close();
        if self.state == ConnectionState::Connected {
            info!(connection_type = %self.transport.connection_type(), "sensor disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport.is_open()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.transport.connection_type()
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Connect and return a guard that disconnects when dropped
    pub fn session(&mut self) -> Result<SensorSession<'_>> {
        self.connect()?;
        Ok(SensorSession { sensor: self })
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BotaError::not_connected())
        }
    }

    /// Poll, receive and decode one frame with no calibration applied
    pub fn read_raw(&mut self) -> Result<ForceTorqueReading> {
        self.ensure_connected()?;

        self.transport.send(&self.codec.encode_request())?;
        let frame = self.transport.receive(self.codec.frame_len(), self.timeout)?;
        debug!(bytes = frame.len(), "frame received");

        self.codec.decode(&frame)
    }

    /// One calibrated reading
    ///
    /// # Errors
    /// - `BotaError::Connection` if not connected or the transport fails
    /// - `BotaError::Timeout` if no frame arrives in time
    /// - `BotaError::Data` if the frame does not decode
    pub fn read_data(&mut self) -> Result<ForceTorqueReading> {
        let raw = self.read_raw()?;
        Ok(self.calibration.apply(&raw))
    }

    /// Sample at `rate_hz` until `duration` has elapsed
    ///
    /// Samples follow an absolute schedule anchored at the start, so a slow
    /// read shortens the following wait instead of shifting every later
    /// sample. What happens on a failed read depends on the configured
    /// [`ReadFailurePolicy`].
    pub fn read_continuous(&mut self, duration: Duration, rate_hz: f64) -> Result<Capture> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(BotaError::Configuration(format!(
                "sampling rate must be positive, got {}",
                rate_hz
            )));
        }
        let interval = Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|_| {
            BotaError::Configuration(format!("sampling rate {} is out of range", rate_hz))
        })?;
        self.ensure_connected()?;

        let mut capture = Capture::default();
        let start = Instant::now();
        let mut tick: u32 = 0;

        while start.elapsed() < duration {
            match self.read_data() {
                Ok(reading) => capture.readings.push(reading),
                Err(error) => match self.on_read_error {
                    ReadFailurePolicy::Abort => return Err(error),
                    ReadFailurePolicy::Skip => {
                        let elapsed = start.elapsed();
                        warn!(?elapsed, %error, "skipping failed read");
                        capture.failures.push(ReadFailure { elapsed, error });
                    }
                },
            }

            tick = tick.saturating_add(1);
            let Some(offset) = interval.checked_mul(tick) else {
                break;
            };
            if offset >= duration {
                break;
            }
            let wait = offset.saturating_sub(start.elapsed());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        }

        debug!(
            readings = capture.readings.len(),
            failures = capture.failures.len(),
            "continuous capture finished"
        );
        Ok(capture)
    }

    /// Average `sample_count` raw readings into a new zero offset
    ///
    /// The existing offset and scale are not applied while sampling. On any
    /// failure the previous offset stays in place.
    ///
    /// # Errors
    /// - `BotaError::Configuration` if `sample_count` is zero
    /// - any read error, which aborts the calibration
    pub fn calibrate(&mut self, sample_count: usize) -> Result<[f64; CHANNEL_COUNT]> {
        if sample_count == 0 {
            return Err(BotaError::Configuration(
                "calibration sample count must be at least 1".to_string(),
            ));
        }
        self.ensure_connected()?;

        info!(sample_count, "calibrating sensor");
        let mut samples = Vec::with_capacity(sample_count);
        for i in 0..sample_count {
            samples.push(self.read_raw()?);
            if i + 1 < sample_count && !self.calibration_interval.is_zero() {
                thread::sleep(self.calibration_interval);
            }
        }

        let offset = Calibration::mean_offset(&samples)?;
        self.calibration.set_offset(&offset)?;
        info!(?offset, "calibration complete");
        Ok(offset)
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn get_calibration_offset(&self) -> [f64; CHANNEL_COUNT] {
        self.calibration.offset()
    }

    pub fn set_calibration_offset(&mut self, offset: &[f64]) -> Result<()> {
        self.calibration.set_offset(offset)
    }

    pub fn scale_factor(&self) -> f64 {
        self.calibration.scale()
    }

    pub fn set_scale_factor(&mut self, scale: f64) -> Result<()> {
        self.calibration.set_scale(scale)
    }

    /// Zero offset and unit scale
    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
    }

    pub fn read_failure_policy(&self) -> ReadFailurePolicy {
        self.on_read_error
    }

    pub fn set_read_failure_policy(&mut self, policy: ReadFailurePolicy) {
        self.on_read_error = policy;
    }

    pub fn get_info(&self) -> SensorInfo {
        SensorInfo {
            connection_type: self.transport.connection_type(),
            calibration_offset: self.calibration.offset(),
            scale_factor: self.calibration.scale(),
            connected: self.is_connected(),
        }
    }
}

impl Drop for BotaSensor {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Scope guard returned by [`BotaSensor::session`]
///
/// Dereferences to the sensor; disconnects on drop, including during
/// unwinding or an early `?` return.
pub struct SensorSession<'a> {
    sensor: &'a mut BotaSensor,
}

impl Deref for SensorSession<'_> {
    type Target = BotaSensor;

    fn deref(&self) -> &BotaSensor {
        self.sensor
    }
}

impl DerefMut for SensorSession<'_> {
    fn deref_mut(&mut self) -> &mut BotaSensor {
        self.sensor
    }
}

impl Drop for SensorSession<'_> {
    fn drop(&mut self) {
        self.sensor.disconnect();
    }
}
