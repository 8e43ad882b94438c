//! Output records published by the scan worker
//!
//! Three independent channels, each optional per the output-enable flags:
//! the raw echo of every ping, the accumulated polar image on its own
//! cadence, and the per-revolution ranging scan.

use serde::Serialize;

/// Raw intensity profile of one ping, with the acoustic metadata it was
/// captured under. Holds its own copy of the profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoRecord {
    /// Beam angle in grads
    pub angle: u16,
    pub gain: u8,
    /// Maximum range in meters
    pub range_max: u16,
    /// Speed of sound in m/s
    pub speed_of_sound: u16,
    pub number_of_samples: u16,
    /// Acoustic frequency in kHz
    pub transmit_frequency: u16,
    pub intensities: Vec<u8>,
}

/// One full revolution of nearest-valid-range samples.
///
/// Angles are radians; `ranges[i]` and `intensities[i]` describe the sweep
/// slot at `angle_min + i * angle_increment`. A zero range means no bin
/// reached the threshold in that direction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangingScan {
    pub angle_min: f64,
    pub angle_max: f64,
    pub angle_increment: f64,
    /// Seconds between consecutive beams (the transmit duration)
    pub time_increment: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub ranges: Vec<f32>,
    /// Normalized to [0, 1]
    pub intensities: Vec<f32>,
}

/// Snapshot of the persistent polar image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFrame {
    /// Side length in pixels; the buffer is row-major `size * size`, one
    /// byte per pixel
    pub size: u16,
    pub data: Vec<u8>,
}
