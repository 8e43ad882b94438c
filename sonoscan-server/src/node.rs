//! Scan orchestration and atomic reconfiguration
//!
//! [`SonarNode`] drives the cycle `advance -> ping -> outputs` and owns every
//! piece of state a reconfiguration touches: output enables, device settings,
//! the persistent polar image, the ranging arrays and the rasterizer.
//!
//! Reconfiguration is all-or-nothing: the proposed configuration is fully
//! validated before the first mutation, and everything after that point is a
//! total function of already-validated inputs, so a failure can never leave
//! the node half-updated. The caller serializes reconfiguration against scan
//! cycles by holding the node behind one mutex.

use std::sync::Arc;

use log::warn;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;

use sonoscan_core::{ConfigError, SectorRasterizer, SonarConfig};

use crate::device::SonarDevice;
use crate::error::DeviceError;
use crate::output::{EchoRecord, ImageFrame, RangingScan};
use crate::sonar::SonarInterface;

/// Ranges closer than this are blind zone and never reported, in meters
pub const SCAN_RANGE_MIN: f64 = 0.75;

const CHANNEL_CAPACITY: usize = 16;

/// The scan worker's state: sonar session, outputs and their buffers.
pub struct SonarNode<T> {
    sonar: SonarInterface<T>,
    config: SonarConfig,
    raster: SectorRasterizer,
    /// Row-major square image, side `config.image_size`
    image: Vec<u8>,
    scan_ranges: Vec<f32>,
    scan_intensities: Vec<f32>,
    echo_tx: broadcast::Sender<Arc<EchoRecord>>,
    scan_tx: broadcast::Sender<Arc<RangingScan>>,
    image_tx: broadcast::Sender<Arc<ImageFrame>>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SonarNode<T> {
    /// Build a node around a connected device and apply the initial
    /// configuration.
    pub fn new(device: SonarDevice<T>, config: SonarConfig) -> Result<Self, ConfigError> {
        let (echo_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (scan_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (image_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let mut node = SonarNode {
            sonar: SonarInterface::new(device),
            config: SonarConfig::default(),
            raster: SectorRasterizer::default(),
            image: Vec::new(),
            scan_ranges: Vec::new(),
            scan_intensities: Vec::new(),
            echo_tx,
            scan_tx,
            image_tx,
        };
        node.apply_config(&config)?;
        Ok(node)
    }

    /// Apply a full proposed configuration atomically.
    ///
    /// Field bounds are checked first, then the angular consistency via the
    /// scanner (the first and only fallible mutation, itself all-or-nothing).
    /// On any failure every component keeps its prior state and the error
    /// carries a descriptive reason. On success the commit order is: output
    /// enables, transducer settings and profile buffer, ranging metadata,
    /// image resize-and-zero when the size changed, rasterizer radius,
    /// threshold.
    pub fn apply_config(&mut self, proposed: &SonarConfig) -> Result<(), ConfigError> {
        proposed.validate()?;
        self.sonar
            .configure_angles(proposed.angle_min, proposed.angle_max, proposed.angle_step)?;

        // validation passed: everything below is infallible
        self.config = proposed.clone();
        self.sonar.configure_transducer(
            proposed.gain,
            proposed.samples,
            proposed.frequency,
            proposed.speed_of_sound,
            proposed.range_max as f64,
        );

        let count = self.sonar.scanner().angle_count();
        if self.scan_ranges.len() != count {
            self.scan_ranges = vec![0.0; count];
            self.scan_intensities = vec![0.0; count];
        }

        let size = proposed.image_size as usize;
        if self.image.len() != size * size {
            self.image = vec![0; size * size];
        }
        self.raster.configure(proposed.image_size / 2);
        Ok(())
    }

    /// Run one scan cycle: advance, ping, and fan out to the enabled
    /// outputs. A failed ping is logged and skips the outputs; the sweep has
    /// already advanced.
    pub async fn run_cycle(&mut self) -> Result<(), DeviceError> {
        let reading = self.sonar.read().await?;
        if !reading.valid {
            warn!("cannot communicate with sonar");
            return Ok(());
        }

        if self.config.publish_echo {
            self.publish_echo(reading.angle);
        }
        if self.config.publish_image {
            self.refresh_image(reading.angle);
        }
        if self.config.publish_scan {
            self.update_scan(reading.end_of_turn);
        }
        Ok(())
    }

    fn publish_echo(&self, angle: u16) {
        let record = EchoRecord {
            angle,
            gain: self.config.gain,
            range_max: self.config.range_max,
            speed_of_sound: self.config.speed_of_sound,
            number_of_samples: self.config.samples,
            transmit_frequency: self.config.frequency,
            // the profile buffer is reused next cycle, the record keeps a copy
            intensities: self.sonar.intensities_to_vec(),
        };
        let _ = self.echo_tx.send(Arc::new(record));
    }

    /// Paint the wedge between the previous and current beam angle.
    fn refresh_image(&mut self, angle: u16) {
        let size = self.config.image_size as i32;
        let half = size / 2;
        let step = self.sonar.scanner().angle_step();
        let intensities = self.sonar.intensities();

        self.raster.begin_sector(angle, step);
        while let Some(p) = self.raster.next_point() {
            if p.bin >= intensities.len() {
                // image resolution may exceed the number of range bins
                continue;
            }
            let row = half - p.y;
            let col = half - p.x;
            if (0..size).contains(&row) && (0..size).contains(&col) {
                self.image[(row * size + col) as usize] = intensities[p.bin];
            }
        }
    }

    /// Record the nearest valid return for the current direction; at end of
    /// turn, publish the completed revolution.
    fn update_scan(&mut self, end_of_turn: bool) {
        let index = self.sonar.scanner().angle_index();
        let intensities = self.sonar.intensities();
        let transducer = self.sonar.transducer();

        self.scan_ranges[index] = 0.0;
        self.scan_intensities[index] = 0.0;
        for (i, &intensity) in intensities.iter().enumerate() {
            if intensity >= self.config.scan_threshold {
                let range = transducer.range_from_bin(i);
                if range >= SCAN_RANGE_MIN && range < self.config.range_max as f64 {
                    self.scan_ranges[index] = range as f32;
                    self.scan_intensities[index] = intensity as f32 / 255.0;
                    break;
                }
            }
        }

        if end_of_turn {
            let scanner = self.sonar.scanner();
            let increment = scanner.angle_step_rad();
            let scan = RangingScan {
                angle_min: scanner.angle_min_rad(),
                angle_max: sonoscan_core::scanner::grad_to_rad(scanner.angle_max() as f64)
                    - increment,
                angle_increment: increment,
                time_increment: self.sonar.transducer().transmit_duration_secs(),
                range_min: SCAN_RANGE_MIN,
                range_max: self.config.range_max as f64,
                ranges: self.scan_ranges.clone(),
                intensities: self.scan_intensities.clone(),
            };
            let _ = self.scan_tx.send(Arc::new(scan));
        }
    }

    /// Snapshot the persistent image for the periodic publisher.
    pub fn publish_image(&self) {
        if !self.config.publish_image {
            return;
        }
        let frame = ImageFrame {
            size: self.config.image_size,
            data: self.image.clone(),
        };
        let _ = self.image_tx.send(Arc::new(frame));
    }

    /// Current configuration
    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Read-only view of the persistent image buffer
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn sonar(&self) -> &SonarInterface<T> {
        &self.sonar
    }

    pub fn rasterizer_radius(&self) -> u16 {
        self.raster.radius()
    }

    pub fn subscribe_echo(&self) -> broadcast::Receiver<Arc<EchoRecord>> {
        self.echo_tx.subscribe()
    }

    pub fn subscribe_scan(&self) -> broadcast::Receiver<Arc<RangingScan>> {
        self.scan_tx.subscribe()
    }

    pub fn subscribe_image(&self) -> broadcast::Receiver<Arc<ImageFrame>> {
        self.image_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::EmulatedSonar;

    fn node(config: SonarConfig) -> SonarNode<tokio::io::DuplexStream> {
        SonarNode::new(SonarDevice::Emulated(EmulatedSonar::seeded(11)), config).unwrap()
    }

    #[tokio::test]
    async fn test_rejected_config_mutates_nothing() {
        // angle_max == angle_min passes the field bounds but is inconsistent
        let mut node = node(SonarConfig::default());
        let before = node.config().clone();
        let settings_before = *node.sonar().settings();
        let image_len_before = node.image().len();

        let proposed = SonarConfig {
            angle_min: 200,
            angle_max: 200,
            samples: 700,
            image_size: 500,
            ..Default::default()
        };
        let err = node.apply_config(&proposed).unwrap_err();
        assert!(!err.to_string().is_empty());

        assert_eq!(node.config(), &before);
        assert_eq!(node.sonar().settings(), &settings_before);
        assert_eq!(node.image().len(), image_len_before);
        assert_eq!(node.rasterizer_radius(), before.image_size / 2);
    }

    #[tokio::test]
    async fn test_image_resize_discards_and_zeroes() {
        let mut node = node(SonarConfig {
            image_size: 300,
            angle_step: 20,
            publish_image: true,
            ..Default::default()
        });
        for _ in 0..20 {
            node.run_cycle().await.unwrap();
        }
        assert!(node.image().iter().any(|&b| b > 0));

        let resized = SonarConfig {
            image_size: 400,
            angle_step: 20,
            publish_image: true,
            ..Default::default()
        };
        node.apply_config(&resized).unwrap();
        assert_eq!(node.image().len(), 400 * 400);
        assert!(node.image().iter().all(|&b| b == 0));
        assert_eq!(node.rasterizer_radius(), 200);
    }

    #[tokio::test]
    async fn test_scan_published_once_per_revolution() {
        let mut node = node(SonarConfig {
            angle_step: 20,
            publish_scan: true,
            publish_image: false,
            ..Default::default()
        });
        let mut rx = node.subscribe_scan();

        for _ in 0..20 {
            node.run_cycle().await.unwrap();
        }
        let scan = rx.try_recv().unwrap();
        assert_eq!(scan.ranges.len(), 20);
        assert_eq!(scan.intensities.len(), 20);
        assert!(rx.try_recv().is_err(), "scan must publish exactly once");
        assert!((scan.range_min - SCAN_RANGE_MIN).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_echo_carries_profile_copy() {
        let mut node = node(SonarConfig {
            angle_step: 10,
            publish_echo: true,
            publish_image: false,
            ..Default::default()
        });
        let mut rx = node.subscribe_echo();
        node.run_cycle().await.unwrap();

        let echo = rx.try_recv().unwrap();
        assert_eq!(echo.angle, 10);
        assert_eq!(echo.intensities.len(), 200);
        assert_eq!(echo.number_of_samples, 200);
    }

    #[tokio::test]
    async fn test_image_snapshot_respects_enable_flag() {
        let node = node(SonarConfig {
            publish_image: false,
            ..Default::default()
        });
        let mut rx = node.subscribe_image();
        node.publish_image();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_revolution_paints_disc() {
        let mut node = node(SonarConfig {
            image_size: 100,
            angle_step: 20,
            samples: 100,
            publish_image: true,
            ..Default::default()
        });
        for _ in 0..20 {
            node.run_cycle().await.unwrap();
        }
        // the far bins are nearly always hit by the emulated target model,
        // so the outer rings of the image must contain painted pixels
        let size = 100usize;
        let painted = node.image().iter().filter(|&&b| b > 0).count();
        assert!(painted > size, "expected a painted disc, got {painted} pixels");
    }
}
