//! Sonar configuration model
//!
//! A [`SonarConfig`] is the full set of user-level parameters. It is applied
//! atomically: either every field passes validation and the whole proposed
//! configuration replaces the previous one, or nothing is mutated.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Full user-level configuration of the sonar node.
///
/// Serialized in camelCase for configuration files and the external API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SonarConfig {
    /// Sonar gain (0 = low, 1 = normal, 2 = high)
    pub gain: u8,
    /// Operating frequency in kHz
    pub frequency: u16,
    /// Maximum range in meters
    pub range_max: u16,
    /// Number of range bins per ping
    pub samples: u16,
    /// Minimum sweep angle in grads
    pub angle_min: u16,
    /// Maximum sweep angle in grads
    pub angle_max: u16,
    /// Angular step in grads
    pub angle_step: u16,
    /// Output image side length in pixels (even)
    pub image_size: u16,
    /// Intensity threshold for the ranging output
    pub scan_threshold: u8,
    /// Speed of sound in m/s
    pub speed_of_sound: u16,
    /// Image publishing period in milliseconds
    pub image_rate_ms: u64,
    /// Emit the accumulated image
    pub publish_image: bool,
    /// Emit the per-revolution ranging scan
    pub publish_scan: bool,
    /// Emit the raw echo of every ping
    pub publish_echo: bool,
}

impl Default for SonarConfig {
    fn default() -> Self {
        SonarConfig {
            gain: 0,
            frequency: 740,
            range_max: 2,
            samples: 200,
            angle_min: 0,
            angle_max: 400,
            angle_step: 1,
            image_size: 300,
            scan_threshold: 200,
            speed_of_sound: 1500,
            image_rate_ms: 100,
            publish_image: true,
            publish_scan: false,
            publish_echo: false,
        }
    }
}

fn check(name: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfBounds {
            name,
            value,
            min,
            max,
        })
    }
}

impl SonarConfig {
    /// Check every field against its accepted interval.
    ///
    /// Angular *consistency* (`angle_max > angle_min`, step dividing the arc)
    /// is the scanner's own contract and is validated when the configuration
    /// is applied; this only enforces per-field bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("gain", self.gain as i64, 0, 2)?;
        check("frequency", self.frequency as i64, 650, 850)?;
        check("range_max", self.range_max as i64, 1, 50)?;
        check("samples", self.samples as i64, 100, 1000)?;
        check("angle_min", self.angle_min as i64, 0, 200)?;
        check("angle_max", self.angle_max as i64, 200, 400)?;
        check("angle_step", self.angle_step as i64, 1, 20)?;
        check("image_size", self.image_size as i64, 100, 1000)?;
        check("scan_threshold", self.scan_threshold as i64, 1, 255)?;
        check("speed_of_sound", self.speed_of_sound as i64, 1000, 2000)?;
        check("image_rate_ms", self.image_rate_ms as i64, 50, 2000)?;
        if self.image_size % 2 != 0 {
            return Err(ConfigError::OddImageSize(self.image_size));
        }
        Ok(())
    }
}
