//! Sonar interface: scanner, settings, device and the shared profile buffer
//!
//! Binds the pure core components to one device session. The intensity
//! buffer is reused across cycles: [`SonarInterface::intensities`] borrows
//! it and the view is valid only until the next [`read`](SonarInterface::read)
//! overwrites it in place. Consumers that need the data past one cycle copy
//! it out with [`intensities_to_vec`](SonarInterface::intensities_to_vec).

use tokio::io::{AsyncRead, AsyncWrite};

use sonoscan_core::{AngleScanner, ConfigError, DeviceSettings, Transducer};

use crate::device::SonarDevice;
use crate::error::DeviceError;

/// Outcome of one scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SonarReading {
    /// Beam angle the profile was captured at, in grads
    pub angle: u16,
    /// Last interior step before the sweep wraps
    pub end_of_turn: bool,
    /// False when the device did not answer in time; the sweep advanced
    /// anyway and the buffer holds stale data
    pub valid: bool,
}

/// One scanning sonar: angle state, derived settings, device session and the
/// reused intensity buffer.
pub struct SonarInterface<T> {
    scanner: AngleScanner,
    transducer: Transducer,
    device: SonarDevice<T>,
    buffer: Vec<u8>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SonarInterface<T> {
    pub fn new(device: SonarDevice<T>) -> Self {
        let transducer = Transducer::default();
        let buffer = vec![0; transducer.settings().sample_count as usize];
        SonarInterface {
            scanner: AngleScanner::default(),
            transducer,
            device,
            buffer,
        }
    }

    /// Replace the sweep bounds; delegates the all-or-nothing contract to the
    /// scanner.
    pub fn configure_angles(&mut self, min: u16, max: u16, step: u16) -> Result<(), ConfigError> {
        self.scanner.configure(min, max, step)
    }

    /// Recompute the device settings and resize the profile buffer when the
    /// sample count changed. The old profile content is discarded.
    pub fn configure_transducer(
        &mut self,
        gain: u8,
        samples: u16,
        frequency: u16,
        speed_of_sound: u16,
        range: f64,
    ) {
        self.transducer
            .configure(gain, samples, frequency, speed_of_sound, range);
        if self.buffer.len() != samples as usize {
            self.buffer = vec![0; samples as usize];
        }
    }

    /// Advance the sweep by one step and perform a ping/listen exchange.
    ///
    /// The angle advances unconditionally, before the exchange, so a failed
    /// ping never stalls the sweep.
    pub async fn read(&mut self) -> Result<SonarReading, DeviceError> {
        // update angle before the ping in order to stay in sync
        let step = self.scanner.advance();
        let valid = self
            .device
            .read(step.angle, self.transducer.settings(), &mut self.buffer)
            .await?;
        Ok(SonarReading {
            angle: step.angle,
            end_of_turn: step.end_of_turn,
            valid,
        })
    }

    /// Borrowed view of the latest intensity profile.
    ///
    /// Invalidation rule: the underlying buffer is overwritten in place by
    /// the next [`read`](Self::read) call.
    pub fn intensities(&self) -> &[u8] {
        &self.buffer
    }

    /// Copy-out accessor for consumers retaining the profile past one cycle
    pub fn intensities_to_vec(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    pub fn scanner(&self) -> &AngleScanner {
        &self.scanner
    }

    pub fn transducer(&self) -> &Transducer {
        &self.transducer
    }

    pub fn settings(&self) -> &DeviceSettings {
        self.transducer.settings()
    }

    /// True when the session runs against the emulation
    pub fn is_emulated(&self) -> bool {
        self.device.is_emulated()
    }
}
