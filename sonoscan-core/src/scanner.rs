//! Beam angle state machine
//!
//! A mechanically scanning sonar steps its transducer through a configured
//! angular arc, one step per ping. This module tracks the current beam angle
//! in grads (400 grads = one full turn) and detects the end of each sweep.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use std::f64::consts::PI;

/// Grads in a full turn
pub const GRADS_PER_TURN: u16 = 400;

/// Convert an angle in grads to radians
#[inline]
pub fn grad_to_rad(grad: f64) -> f64 {
    grad * 2.0 * PI / GRADS_PER_TURN as f64
}

/// Result of advancing the scanner by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleStep {
    /// New beam angle in grads
    pub angle: u16,
    /// True on the last interior step before the sweep wraps back to its
    /// minimum angle. Signaled one step *before* the wrap so a full-sweep
    /// consumer can flush its output using the last interior sample.
    pub end_of_turn: bool,
}

/// Tracks the beam angle, step size and sweep bounds.
///
/// The scanner advances unconditionally every cycle: a failed ping does not
/// stall the sweep, it only skips that cycle's outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleScanner {
    angle: u16,
    angle_min: u16,
    angle_max: u16,
    angle_step: u16,
}

impl Default for AngleScanner {
    fn default() -> Self {
        AngleScanner {
            angle: 0,
            angle_min: 0,
            angle_max: GRADS_PER_TURN,
            angle_step: 1,
        }
    }
}

impl AngleScanner {
    /// Replace the sweep bounds atomically.
    ///
    /// Requires `max > min` and `(max - min) % step == 0` so the sweep lands
    /// exactly on `max`. On success the current angle is reset to `min`; on
    /// failure all prior state is left untouched. Reconfiguring with the
    /// bounds already in place is a no-op and does not reset the angle.
    pub fn configure(&mut self, min: u16, max: u16, step: u16) -> Result<(), ConfigError> {
        if self.angle_min == min && self.angle_max == max && self.angle_step == step {
            return Ok(());
        }

        if max <= min || step == 0 || (max - min) % step != 0 {
            return Err(ConfigError::InvalidAngles { min, max, step });
        }

        self.angle = min;
        self.angle_min = min;
        self.angle_max = max;
        self.angle_step = step;
        Ok(())
    }

    /// Advance the beam by one step and report end-of-turn.
    ///
    /// The angle is incremented first so it stays in sync with the ping that
    /// follows; when the increment reaches `angle_max` the angle wraps to
    /// `angle_min`. `end_of_turn` is true on the step where
    /// `angle + step == angle_max`, i.e. the call immediately preceding the
    /// wrap.
    pub fn advance(&mut self) -> AngleStep {
        self.angle += self.angle_step;
        let end_of_turn = self.angle + self.angle_step == self.angle_max;
        if self.angle == self.angle_max {
            self.angle = self.angle_min;
        }
        AngleStep {
            angle: self.angle,
            end_of_turn,
        }
    }

    /// Current beam angle in grads
    pub fn angle(&self) -> u16 {
        self.angle
    }

    /// Lower sweep bound in grads
    pub fn angle_min(&self) -> u16 {
        self.angle_min
    }

    /// Upper sweep bound in grads
    pub fn angle_max(&self) -> u16 {
        self.angle_max
    }

    /// Step size in grads
    pub fn angle_step(&self) -> u16 {
        self.angle_step
    }

    /// Number of steps in one full sweep
    pub fn angle_count(&self) -> usize {
        ((self.angle_max - self.angle_min) / self.angle_step) as usize
    }

    /// Slot index of the current angle within the sweep
    pub fn angle_index(&self) -> usize {
        ((self.angle - self.angle_min) / self.angle_step) as usize
    }

    /// Lower sweep bound in radians
    pub fn angle_min_rad(&self) -> f64 {
        grad_to_rad(self.angle_min as f64)
    }

    /// Step size in radians
    pub fn angle_step_rad(&self) -> f64 {
        grad_to_rad(self.angle_step as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_rejects_inverted_bounds() {
        let mut scanner = AngleScanner::default();
        let err = scanner.configure(100, 100, 1).unwrap_err();
        assert!(!err.to_string().is_empty());
        assert_eq!(scanner.angle_min(), 0);
        assert_eq!(scanner.angle_max(), 400);
        assert_eq!(scanner.angle_step(), 1);
    }

    #[test]
    fn test_configure_rejects_unaligned_step() {
        let mut scanner = AngleScanner::default();
        // (400 - 0) % 13 != 0
        assert!(scanner.configure(0, 400, 13).is_err());
        // failure leaves advance() behavior unchanged
        let step = scanner.advance();
        assert_eq!(step.angle, 1);
    }

    #[test]
    fn test_configure_resets_angle() {
        let mut scanner = AngleScanner::default();
        scanner.advance();
        scanner.advance();
        scanner.configure(0, 200, 10).unwrap();
        assert_eq!(scanner.angle(), 0);
    }

    #[test]
    fn test_noop_configure_keeps_angle() {
        let mut scanner = AngleScanner::default();
        scanner.configure(0, 400, 20).unwrap();
        scanner.advance();
        assert_eq!(scanner.angle(), 20);
        scanner.configure(0, 400, 20).unwrap();
        assert_eq!(scanner.angle(), 20);
    }

    #[test]
    fn test_full_revolution_visits_every_step() {
        // Scenario: angle_min=0, angle_max=400, angle_step=20 -> 20 steps
        let mut scanner = AngleScanner::default();
        scanner.configure(0, 400, 20).unwrap();
        assert_eq!(scanner.angle_count(), 20);

        let mut end_of_turns = 0;
        let mut visited = Vec::new();
        for _ in 0..20 {
            let step = scanner.advance();
            assert!(step.angle < 400);
            visited.push(step.angle);
            if step.end_of_turn {
                end_of_turns += 1;
                assert_eq!(step.angle, 380);
            }
        }
        // every multiple of step in [min+step, max), then the wrap to min
        let expected: Vec<u16> = (1..20).map(|i| i * 20).chain(std::iter::once(0)).collect();
        assert_eq!(visited, expected);
        assert_eq!(end_of_turns, 1);
        // next call starts the second revolution
        assert_eq!(scanner.advance().angle, 20);
    }

    #[test]
    fn test_end_of_turn_precedes_wrap_on_partial_arc() {
        let mut scanner = AngleScanner::default();
        scanner.configure(100, 300, 50).unwrap();
        let angles: Vec<(u16, bool)> = (0..4).map(|_| {
            let s = scanner.advance();
            (s.angle, s.end_of_turn)
        }).collect();
        assert_eq!(
            angles,
            vec![(150, false), (200, false), (250, true), (100, false)]
        );
    }

    #[test]
    fn test_angle_index() {
        let mut scanner = AngleScanner::default();
        scanner.configure(100, 300, 50).unwrap();
        assert_eq!(scanner.angle_index(), 0);
        scanner.advance();
        assert_eq!(scanner.angle_index(), 1);
    }

    #[test]
    fn test_configure_succeeds_iff_consistent() {
        for min in [0u16, 50, 200] {
            for max in [200u16, 300, 400] {
                for step in 1..=20u16 {
                    let mut scanner = AngleScanner::default();
                    let ok = scanner.configure(min, max, step).is_ok();
                    assert_eq!(ok, max > min && (max - min) % step == 0);
                }
            }
        }
    }
}
