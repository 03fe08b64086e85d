use bota_driver::{
    AcquisitionConfig, BotaError, BotaSensor, ChannelEncoding, ConnectionType, ErrorKind,
    ForceTorqueReading, FrameCodec, ReadFailurePolicy, Result, SensorConfig, Transport, UdpConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

const RAW: [f64; 6] = [1.0, 2.0, 3.0, 0.1, 0.2, 0.3];

mod fake_sensor {
    use super::*;

    /// Answers each poll request with the next scripted datagram, then exits
    /// after the script runs out or two idle seconds pass.
    pub fn spawn(replies: Vec<Vec<u8>>) -> (u16, thread::JoinHandle<usize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake sensor");
        socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = socket.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let mut answered = 0;
            for reply in replies {
                let Ok((n, from)) = socket.recv_from(&mut buf) else {
                    break;
                };
                assert_eq!(&buf[..n], &[0x01, 0x00], "unexpected request frame");
                socket.send_to(&reply, from).unwrap();
                answered += 1;
            }
            answered
        });

        (port, handle)
    }

    pub fn frame(channels: [f64; 6]) -> Vec<u8> {
        FrameCodec::default().encode(&ForceTorqueReading::from_channels(channels, 0.0))
    }
}

fn udp_sensor(port: u16, timeout_ms: u64) -> BotaSensor {
    let acquisition = AcquisitionConfig {
        calibration_interval_ms: 0,
        ..AcquisitionConfig::default()
    };
    let config = SensorConfig::udp(UdpConfig::new("127.0.0.1", port).with_timeout_ms(timeout_ms))
        .with_acquisition(acquisition);
    BotaSensor::new(config).expect("valid config")
}

#[test]
fn test_udp_read_roundtrip() {
    let (port, fake) = fake_sensor::spawn(vec![fake_sensor::frame(RAW)]);
    let mut sensor = udp_sensor(port, 2000);

    sensor.connect().unwrap();
    let reading = sensor.read_data().unwrap();
    assert_eq!(reading.channels(), RAW);
    assert!(reading.timestamp > 0.0);

    let info = sensor.get_info();
    assert_eq!(info.connection_type, ConnectionType::Udp);
    assert!(info.connected);

    sensor.disconnect();
    assert_eq!(fake.join().unwrap(), 1);
}

#[test]
fn test_udp_calibration_matches_sample_mean() {
    let mut rng = StdRng::seed_from_u64(0xB07A);
    let noise = Normal::new(0.0, 0.05).unwrap();

    let samples: Vec<[f64; 6]> = (0..200)
        .map(|_| std::array::from_fn(|i| RAW[i] + noise.sample(&mut rng)))
        .collect();
    let replies = samples.iter().map(|s| fake_sensor::frame(*s)).collect();

    let (port, fake) = fake_sensor::spawn(replies);
    let mut sensor = udp_sensor(port, 2000);
    sensor.connect().unwrap();

    let offset = sensor.calibrate(samples.len()).unwrap();
    assert_eq!(fake.join().unwrap(), samples.len());

    for channel in 0..6 {
        let column: Vec<f64> = samples.iter().map(|s| s[channel]).collect();
        let expected = column.iter().mean();
        assert!(
            (offset[channel] - expected).abs() < 1e-9,
            "channel {}: offset {} vs mean {}",
            channel,
            offset[channel],
            expected
        );
        assert!((offset[channel] - RAW[channel]).abs() < 0.02);
    }
}

#[test]
fn test_udp_timeout() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();
    let mut sensor = udp_sensor(port, 100);

    sensor.connect().unwrap();
    let err = sensor.read_data().unwrap_err();
    assert_eq!(err, BotaError::Timeout { timeout_ms: 100 });
    assert!(sensor.is_connected());
}

#[test]
fn test_udp_late_reply_does_not_shift_readings() {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let port = socket.local_addr().unwrap().port();

    let slow = thread::spawn(move || {
        let mut buf = [0u8; 16];
        let (_, from) = socket.recv_from(&mut buf).unwrap();
        thread::sleep(Duration::from_millis(150));
        socket.send_to(&fake_sensor::frame([1.0; 6]), from).unwrap();

        let (_, from) = socket.recv_from(&mut buf).unwrap();
        socket.send_to(&fake_sensor::frame([2.0; 6]), from).unwrap();
    });

    let mut sensor = udp_sensor(port, 100);
    sensor.connect().unwrap();

    assert_eq!(sensor.read_data().unwrap_err().kind(), ErrorKind::Timeout);
    thread::sleep(Duration::from_millis(150));

    let reading = sensor.read_data().unwrap();
    assert_eq!(reading.channels(), [2.0; 6]);
    slow.join().unwrap();
}

#[test]
fn test_udp_truncated_datagram() {
    let (port, fake) = fake_sensor::spawn(vec![vec![0u8; 20]]);
    let mut sensor = udp_sensor(port, 2000);

    sensor.connect().unwrap();
    assert_eq!(sensor.read_data().unwrap_err().kind(), ErrorKind::Data);
    fake.join().unwrap();
}

#[test]
fn test_udp_continuous_skip_policy() {
    let mut replies = vec![fake_sensor::frame(RAW); 3];
    replies.insert(1, vec![0xFF; 7]);
    let (port, fake) = fake_sensor::spawn(replies);

    let mut sensor = udp_sensor(port, 2000);
    sensor.set_read_failure_policy(ReadFailurePolicy::Skip);
    sensor.connect().unwrap();

    // Ticks at 0, 50, 100 and 150 ms.
    let capture = sensor.read_continuous(Duration::from_millis(200), 20.0).unwrap();
    assert_eq!(capture.failures.len(), 1);
    assert_eq!(capture.failures[0].error.kind(), ErrorKind::Data);
    assert_eq!(capture.len(), 3);
    fake.join().unwrap();
}

#[test]
fn test_session_scope_over_udp() {
    let (port, fake) = fake_sensor::spawn(vec![fake_sensor::frame(RAW)]);
    let mut sensor = udp_sensor(port, 2000);

    {
        let mut session = sensor.session().unwrap();
        session.set_calibration_offset(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]).unwrap();
        let reading = session.read_data().unwrap();
        assert_eq!(reading.channels(), [0.0, 1.0, 2.0, 0.1, 0.2, 0.3]);
    }

    assert!(!sensor.is_connected());
    assert_eq!(sensor.read_data().unwrap_err().kind(), ErrorKind::Connection);
    fake.join().unwrap();
}

#[test]
fn test_sensor_from_toml() {
    let config = SensorConfig::from_toml_str(
        r#"
        [connection]
        connection_type = "udp"
        host = "192.168.1.1"
        port = 1000
        timeout_ms = 250

        [acquisition]
        encoding = "f32le"
        on_read_error = "skip"
        scale_factor = 2.0
        "#,
    )
    .unwrap();

    let sensor = BotaSensor::new(config).unwrap();
    assert_eq!(sensor.codec().encoding(), ChannelEncoding::Float32Le);
    assert_eq!(sensor.codec().frame_len(), 24);
    assert_eq!(sensor.read_failure_policy(), ReadFailurePolicy::Skip);
    assert_eq!(sensor.scale_factor(), 2.0);
    assert!(!sensor.get_info().connected);
}

#[test]
fn test_serial_config_builds_without_device() {
    let config = SensorConfig::from_toml_str(
        r#"
        [connection]
        connection_type = "serial"
        port = "/dev/ttyUSB0"
        baudrate = 115200
        "#,
    )
    .unwrap();

    let sensor = BotaSensor::new(config).unwrap();
    assert_eq!(sensor.connection_type(), ConnectionType::Serial);
    assert!(!sensor.is_connected());
}

/// Replays a fixed list of frames; used to drive the sensor through the
/// public `Transport` trait.
struct ReplayTransport {
    frames: VecDeque<Vec<u8>>,
    open: bool,
}

impl Transport for ReplayTransport {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn receive(&mut self, _frame_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.frames.pop_front().ok_or(BotaError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Serial
    }
}

#[test]
fn test_custom_transport_scenario() {
    let transport = ReplayTransport {
        frames: VecDeque::from(vec![fake_sensor::frame(RAW), fake_sensor::frame(RAW)]),
        open: false,
    };
    let config = SensorConfig::udp(UdpConfig::new("192.168.1.1", 1000));
    let mut sensor = BotaSensor::with_transport(config, Box::new(transport)).unwrap();

    assert_eq!(sensor.read_data().unwrap_err().kind(), ErrorKind::Connection);
    sensor.connect().unwrap();
    assert_eq!(sensor.read_data().unwrap().to_vec(), RAW.to_vec());

    assert!(sensor.set_calibration_offset(&[1.0, 2.0, 3.0]).is_err());
    assert_eq!(sensor.get_calibration_offset(), [0.0; 6]);

    sensor.set_calibration_offset(&[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]).unwrap();
    assert_eq!(sensor.read_data().unwrap().to_vec(), vec![0.0, 1.0, 2.0, 0.1, 0.2, 0.3]);

    assert_eq!(sensor.read_data().unwrap_err().kind(), ErrorKind::Timeout);
}
