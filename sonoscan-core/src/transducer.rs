//! Transducer timing and gain calculator
//!
//! Derives the device-level protocol fields (sample period, transmit
//! duration, gain, sample count, frequency) from user-level acoustic
//! parameters, clamped to the firmware limits of the transducer.

use serde::{Deserialize, Serialize};

/// Duration of one firmware sample-period tick, in seconds
pub const SAMPLE_PERIOD_TICK_DURATION: f64 = 25e-9;

/// Shortest transmit pulse the firmware accepts, in microseconds
pub const FIRMWARE_MIN_TRANSMIT_DURATION: f64 = 5.0;

/// Longest transmit pulse the firmware accepts, in microseconds
pub const FIRMWARE_MAX_TRANSMIT_DURATION: f64 = 500.0;

/// Ratio bounding the transmit duration by the sample period
pub const MAX_DURATION_RATIO: f64 = 64e6;

/// Device-level acoustic settings, as sent in the transducer command.
///
/// These are derived, never set independently: the whole structure is
/// recomputed by [`Transducer::configure`] on every reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    /// Operating mode (always 1 for this transducer)
    pub mode: u8,
    /// Gain setting (0 = low, 1 = normal, 2 = high)
    pub gain: u8,
    /// Number of range bins per ping
    pub sample_count: u16,
    /// Acoustic frequency in kHz
    pub transmit_frequency: u16,
    /// Sample period in firmware ticks of 25 ns
    pub sample_period: u16,
    /// Transmit pulse duration in microseconds
    pub transmit_duration: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            mode: 1,
            gain: 0,
            sample_count: 200,
            transmit_frequency: 740,
            sample_period: 533,
            transmit_duration: 10,
        }
    }
}

/// How the transmit duration is derived from the acoustic parameters.
///
/// The transducer's reference implementation carries a transmit-duration
/// computation that is known to output 0 µs in some input ranges (its
/// intermediate "sample period in ms" is off by several orders of magnitude,
/// which poisons the upper duration bound). Both behaviors are kept here,
/// explicitly versioned:
///
/// - [`Legacy`](TransmitDurationPolicy::Legacy) reproduces the reference
///   sequence bit for bit, for comparisons against deployed devices.
/// - [`Clamped`](TransmitDurationPolicy::Clamped) derives the millisecond
///   sample period from the tick-quantized value and applies a single clamp
///   into the firmware interval, which keeps the result in [5, 500] µs for
///   every valid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmitDurationPolicy {
    Legacy,
    #[default]
    Clamped,
}

/// Transmit duration per the reference firmware-limit sequence.
///
/// The checks are applied in this literal order, not as a single clamp: the
/// upper bound replaces the value with `max_duration`, and the firmware floor
/// compares the *target* (not the running value) last. With the reference
/// `sample_period_ms` this can produce sub-microsecond values that truncate
/// to 0 on the wire.
pub fn transmit_duration_legacy(sample_period_ms: f64, one_way_duration_ms: f64) -> f64 {
    let target = f64::max(2.5 * sample_period_ms, one_way_duration_ms);
    let max_duration = f64::min(
        FIRMWARE_MAX_TRANSMIT_DURATION,
        sample_period_ms * MAX_DURATION_RATIO,
    );
    let mut duration = target;
    if target > max_duration {
        duration = max_duration;
    }
    if target < FIRMWARE_MIN_TRANSMIT_DURATION {
        duration = FIRMWARE_MIN_TRANSMIT_DURATION;
    }
    duration
}

/// Corrected transmit duration: a plain clamp of the target into the
/// firmware interval, with the upper bound never below the lower one.
pub fn transmit_duration_clamped(sample_period_ms: f64, one_way_duration_ms: f64) -> f64 {
    let target = f64::max(2.5 * sample_period_ms, one_way_duration_ms);
    let max_duration = f64::min(
        FIRMWARE_MAX_TRANSMIT_DURATION,
        sample_period_ms * MAX_DURATION_RATIO,
    )
    .max(FIRMWARE_MIN_TRANSMIT_DURATION);
    target.clamp(FIRMWARE_MIN_TRANSMIT_DURATION, max_duration)
}

/// Owns the current [`DeviceSettings`] and the acoustic parameters they were
/// derived from.
#[derive(Debug, Clone)]
pub struct Transducer {
    settings: DeviceSettings,
    max_range: f64,
    speed_of_sound: u16,
    duration_policy: TransmitDurationPolicy,
}

impl Default for Transducer {
    fn default() -> Self {
        Transducer {
            settings: DeviceSettings::default(),
            max_range: 2.0,
            speed_of_sound: 1500,
            duration_policy: TransmitDurationPolicy::default(),
        }
    }
}

impl Transducer {
    /// Create a transducer with an explicit transmit-duration policy
    pub fn with_policy(duration_policy: TransmitDurationPolicy) -> Self {
        Transducer {
            duration_policy,
            ..Transducer::default()
        }
    }

    /// Recompute the whole [`DeviceSettings`] from user parameters.
    ///
    /// * `gain` - 0 to 2
    /// * `samples` - range bins per ping, 100 to 1000
    /// * `frequency` - acoustic frequency in kHz, 650 to 850
    /// * `speed_of_sound` - in m/s, 1000 to 2000
    /// * `range` - maximum range in meters, 1 to 50
    pub fn configure(
        &mut self,
        gain: u8,
        samples: u16,
        frequency: u16,
        speed_of_sound: u16,
        range: f64,
    ) -> &DeviceSettings {
        self.max_range = range;
        self.speed_of_sound = speed_of_sound;

        let sos = speed_of_sound as f64;
        let samples_f = samples as f64;

        // sample period [unit-less] depends on number of samples and max range
        let sample_period = (2.0 * range) / (samples_f * sos * SAMPLE_PERIOD_TICK_DURATION);
        let sample_period = sample_period as u16;

        let one_way_duration_ms = (8000.0 * range) / sos;
        let transmit_duration = match self.duration_policy {
            TransmitDurationPolicy::Legacy => {
                let sample_period_ms = (2.0 * range) / (samples_f * sos * 1000.0);
                transmit_duration_legacy(sample_period_ms, one_way_duration_ms)
            }
            TransmitDurationPolicy::Clamped => {
                let sample_period_ms =
                    sample_period as f64 * SAMPLE_PERIOD_TICK_DURATION * 1000.0;
                transmit_duration_clamped(sample_period_ms, one_way_duration_ms)
            }
        };

        self.settings = DeviceSettings {
            mode: 1,
            gain,
            sample_count: samples,
            transmit_frequency: frequency,
            sample_period,
            transmit_duration: transmit_duration as u16,
        };
        &self.settings
    }

    /// Current device settings
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Configured maximum range in meters
    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    /// Configured speed of sound in m/s
    pub fn speed_of_sound(&self) -> u16 {
        self.speed_of_sound
    }

    /// Physical range of bin `index`, in meters. Bin 0 is the nearest bin and
    /// bin indices map monotonically to range.
    pub fn range_from_bin(&self, index: usize) -> f64 {
        (index + 1) as f64 * self.max_range / self.settings.sample_count as f64
    }

    /// Transmit pulse duration in seconds, for scan timing metadata
    pub fn transmit_duration_secs(&self) -> f64 {
        self.settings.transmit_duration as f64 * 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_settings() {
        // samples=200, range=2 m, speed of sound=1500 m/s
        let mut transducer = Transducer::default();
        let settings = transducer.configure(0, 200, 740, 1500, 2.0);

        // 4 / (200 * 1500 * 25e-9) = 533.33
        assert_eq!(settings.sample_period, 533);
        // one-way duration 16000/1500 = 10.67 ms dominates the target
        assert_eq!(settings.transmit_duration, 10);
    }

    #[test]
    fn test_transmit_duration_within_firmware_bounds() {
        let mut transducer = Transducer::default();
        for samples in [100u16, 200, 500, 1000] {
            for range in [1.0f64, 2.0, 10.0, 25.0, 50.0] {
                for sos in [1000u16, 1450, 1500, 2000] {
                    let settings = transducer.configure(1, samples, 740, sos, range);
                    assert!(
                        (5..=500).contains(&settings.transmit_duration),
                        "duration {} out of [5, 500] for samples={} range={} sos={}",
                        settings.transmit_duration,
                        samples,
                        range,
                        sos
                    );
                }
            }
        }
    }

    #[test]
    fn test_legacy_outputs_zero_in_reference_range() {
        // The reference computation truncates to 0 µs here; kept as a pinned
        // reproduction of the deployed behavior.
        let mut transducer = Transducer::with_policy(TransmitDurationPolicy::Legacy);
        let settings = transducer.configure(0, 200, 740, 1500, 2.0);
        assert_eq!(settings.transmit_duration, 0);
    }

    #[test]
    fn test_legacy_floor_applies_after_upper_bound() {
        // A tiny max_duration loses to the firmware floor because the last
        // check compares the target, not the running value.
        let duration = transmit_duration_legacy(1e-9, 4.0);
        assert_eq!(duration, FIRMWARE_MIN_TRANSMIT_DURATION);
    }

    #[test]
    fn test_legacy_truncates_below_floor() {
        // target above the floor, max_duration below it: the legacy sequence
        // keeps the sub-floor value.
        let duration = transmit_duration_legacy(1.333e-8, 10.67);
        assert!(duration < 1.0);
    }

    #[test]
    fn test_range_from_bin() {
        let mut transducer = Transducer::default();
        transducer.configure(0, 200, 740, 1500, 2.0);
        assert!((transducer.range_from_bin(0) - 0.01).abs() < 1e-9);
        assert!((transducer.range_from_bin(199) - 2.0).abs() < 1e-9);
    }
}
