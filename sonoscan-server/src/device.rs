//! Device session: real transducer or deterministic emulation
//!
//! The two variants share one contract - `read()` performs a single
//! ping-and-listen exchange at the given angle and fills the caller's
//! intensity buffer - and are selected once at construction. Nothing else in
//! the driver branches on the device kind.

use std::time::Duration;

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncRead, AsyncWrite};

use sonoscan_core::protocol::ping360::{self, TransducerCommand};
use sonoscan_core::DeviceSettings;

use crate::error::DeviceError;
use crate::transport::SonarLink;

/// Deadline for a device-data response after a ping, in milliseconds
pub const DEVICE_DATA_TIMEOUT_MS: u64 = 8000;

/// Deadline for the initialization exchange, in milliseconds
pub const INIT_TIMEOUT_MS: u64 = 2000;

/// One ping/listen session, polymorphic over hardware and emulation.
pub enum SonarDevice<T> {
    Real(RealSonar<T>),
    Emulated(EmulatedSonar),
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SonarDevice<T> {
    /// Select and initialize the device variant.
    ///
    /// With a link present, the real sonar is probed first; if its
    /// initialization fails the session downgrades to the emulation when
    /// `fallback` permits it, and otherwise reports a fatal
    /// [`DeviceError::InitFailed`]. Without a link the emulation is used
    /// directly.
    pub async fn connect(link: Option<SonarLink<T>>, fallback: bool) -> Result<Self, DeviceError> {
        Self::connect_with_timeout(link, fallback, Duration::from_millis(INIT_TIMEOUT_MS)).await
    }

    /// [`connect`](Self::connect) with an explicit initialization deadline.
    pub async fn connect_with_timeout(
        link: Option<SonarLink<T>>,
        fallback: bool,
        init_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let Some(link) = link else {
            debug!("no transport given, using emulated sonar");
            return Ok(SonarDevice::Emulated(EmulatedSonar::new()));
        };

        match RealSonar::initialize(link, init_timeout).await {
            Ok(sonar) => Ok(SonarDevice::Real(sonar)),
            Err(e) if fallback => {
                warn!("sonar initialization failed ({e}), falling back to emulation");
                Ok(SonarDevice::Emulated(EmulatedSonar::new()))
            }
            Err(e) => Err(DeviceError::InitFailed(e.to_string())),
        }
    }

    /// Execute one ping/listen cycle at `angle` and fill `buf` with the
    /// returned intensity profile.
    ///
    /// `Ok(true)` means `buf` holds fresh data; `Ok(false)` is a failed cycle
    /// (timeout or malformed response), already logged, with no further side
    /// effect on device state. Transport failures are fatal and propagate.
    pub async fn read(
        &mut self,
        angle: u16,
        settings: &DeviceSettings,
        buf: &mut [u8],
    ) -> Result<bool, DeviceError> {
        match self {
            SonarDevice::Real(sonar) => sonar.read(angle, settings, buf).await,
            SonarDevice::Emulated(sonar) => {
                sonar.read(angle, settings, buf).await;
                Ok(true)
            }
        }
    }

    /// True when this session drives the emulation
    pub fn is_emulated(&self) -> bool {
        matches!(self, SonarDevice::Emulated(_))
    }
}

impl<T> std::fmt::Debug for SonarDevice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SonarDevice::Real(_) => f.write_str("SonarDevice::Real"),
            SonarDevice::Emulated(_) => f.write_str("SonarDevice::Emulated"),
        }
    }
}

/// Session against the physical transducer.
pub struct RealSonar<T> {
    link: SonarLink<T>,
    response_timeout: Duration,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RealSonar<T> {
    /// Probe the device: a silent step (transmit disabled) must produce a
    /// device-data response within the deadline.
    async fn initialize(mut link: SonarLink<T>, timeout: Duration) -> Result<Self, DeviceError> {
        let mut probe = TransducerCommand::new(&DeviceSettings::default(), 0);
        probe.transmit = 0;
        link.send(&probe.to_frame()).await?;
        let response = link.wait_message(ping360::DEVICE_DATA, timeout).await?;
        ping360::parse_device_data(&response)?;

        Ok(RealSonar {
            link,
            response_timeout: Duration::from_millis(DEVICE_DATA_TIMEOUT_MS),
        })
    }

    /// Override the response deadline (bridged transports, tests).
    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    async fn read(
        &mut self,
        angle: u16,
        settings: &DeviceSettings,
        buf: &mut [u8],
    ) -> Result<bool, DeviceError> {
        let command = TransducerCommand::new(settings, angle);
        self.link.send(&command.to_frame()).await?;

        let frame = match self
            .link
            .wait_message(ping360::DEVICE_DATA, self.response_timeout)
            .await
        {
            Ok(frame) => frame,
            Err(DeviceError::Timeout(ms)) => {
                warn!("no device data within {ms} ms, skipping cycle");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        match ping360::parse_device_data(&frame) {
            Ok(data) => {
                let n = data.intensities.len().min(buf.len());
                buf[..n].copy_from_slice(&data.intensities[..n]);
                Ok(true)
            }
            Err(e) => {
                warn!("malformed device data ({e}), skipping cycle");
                Ok(false)
            }
        }
    }
}

/// Deterministic emulation for benches without hardware.
///
/// Synthesizes a noisy return that grows stronger with range and peaks near
/// the 200-grad bearing (a fixed reflective target), then sleeps for the
/// transmit duration to reproduce real ping timing.
pub struct EmulatedSonar {
    rng: SmallRng,
}

impl EmulatedSonar {
    pub fn new() -> Self {
        EmulatedSonar {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Emulation with a fixed seed, for reproducible tests
    pub fn seeded(seed: u64) -> Self {
        EmulatedSonar {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    async fn read(&mut self, angle: u16, settings: &DeviceSettings, buf: &mut [u8]) {
        let length = buf.len();
        for (i, bin) in buf.iter_mut().enumerate() {
            let roll = self.rng.gen_range(0..length.max(1)) + length;
            let threshold = 1.1 * i as f64 + (angle as f64 - 200.0).abs();
            *bin = if (roll as f64) < threshold {
                120 + self.rng.gen_range(0..120u8)
            } else {
                0
            };
        }
        // simulate transmit duration
        tokio::time::sleep(Duration::from_micros(settings.transmit_duration as u64)).await;
    }
}

impl Default for EmulatedSonar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DeviceSettings {
        DeviceSettings::default()
    }

    /// Answer every transducer command on `link` with a device-data frame.
    fn spawn_fake_device(io: tokio::io::DuplexStream) {
        tokio::spawn(async move {
            let mut link = SonarLink::new(io);
            loop {
                let Ok(frame) = link
                    .wait_message(ping360::TRANSDUCER, Duration::from_secs(5))
                    .await
                else {
                    return;
                };
                let command: TransducerCommand =
                    bincode::deserialize(&frame.payload).expect("valid command");
                let samples = command.number_of_samples as usize;
                let intensities: Vec<u8> = (0..samples).map(|i| (i % 256) as u8).collect();
                let response =
                    ping360::encode_device_data(&settings(), command.angle, &intensities);
                if link.send(&response).await.is_err() {
                    return;
                }
            }
        });
    }

    #[tokio::test]
    async fn test_emulated_read_is_always_valid() {
        let mut device: SonarDevice<tokio::io::DuplexStream> =
            SonarDevice::Emulated(EmulatedSonar::seeded(7));
        let mut buf = vec![0u8; 200];
        for angle in [0u16, 100, 200, 399] {
            let valid = device.read(angle, &settings(), &mut buf).await.unwrap();
            assert!(valid);
            // bins are either silent or in the synthetic intensity band
            assert!(buf.iter().all(|&b| b == 0 || (120..240).contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_emulated_target_peaks_near_200_grads() {
        let mut sonar = EmulatedSonar::seeded(42);
        let mut near = vec![0u8; 200];
        let mut far = vec![0u8; 200];
        // accumulate hits over a few pings to smooth the noise out
        let mut hits_near = 0usize;
        let mut hits_far = 0usize;
        for _ in 0..10 {
            sonar.read(200, &settings(), &mut near).await;
            sonar.read(10, &settings(), &mut far).await;
            hits_near += near.iter().filter(|&&b| b > 0).count();
            hits_far += far.iter().filter(|&&b| b > 0).count();
        }
        assert!(hits_far > hits_near);
    }

    #[tokio::test]
    async fn test_connect_without_link_is_emulated() {
        let device: SonarDevice<tokio::io::DuplexStream> =
            SonarDevice::connect(None, false).await.unwrap();
        assert!(device.is_emulated());
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal_without_fallback() {
        let (near, _far) = tokio::io::duplex(256);
        let err = SonarDevice::connect_with_timeout(
            Some(SonarLink::new(near)),
            false,
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeviceError::InitFailed(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_falls_back_when_permitted() {
        let (near, _far) = tokio::io::duplex(256);
        let device = SonarDevice::connect_with_timeout(
            Some(SonarLink::new(near)),
            true,
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert!(device.is_emulated());
    }

    #[tokio::test]
    async fn test_real_read_fills_buffer() {
        let (near, far) = tokio::io::duplex(16384);
        spawn_fake_device(far);

        let mut device = SonarDevice::connect_with_timeout(
            Some(SonarLink::new(near)),
            false,
            Duration::from_millis(500),
        )
        .await
        .unwrap();
        assert!(!device.is_emulated());

        let mut buf = vec![0u8; 200];
        let valid = device.read(100, &settings(), &mut buf).await.unwrap();
        assert!(valid);
        assert_eq!(buf[1], 1);
        assert_eq!(buf[199], 199);
    }

    #[tokio::test]
    async fn test_real_read_timeout_is_not_an_error() {
        // a link with no responder: the read reports an invalid cycle
        // instead of failing
        let (near, _unanswered) = tokio::io::duplex(256);
        let mut sonar = RealSonar {
            link: SonarLink::new(near),
            response_timeout: Duration::from_millis(30),
        };
        let mut buf = vec![0u8; 8];
        let valid = sonar.read(0, &settings(), &mut buf).await.unwrap();
        assert!(!valid);
    }
}
