//! Polar sector rasterization
//!
//! Maps one angular step's intensity profile onto a persistent square image.
//! Successive wedges must tile the disc: across one full revolution every
//! pixel of the disc is covered exactly once, and no pixel is yielded twice
//! within a single wedge.
//!
//! Each wedge traversal classifies the integer pixels of the wedge's bounding
//! box in polar coordinates: a pixel belongs to the wedge when its angle
//! falls in the half-open interval `[angle, angle + step)` (mod 400 grads)
//! and its rounded radius is within the disc. Because every pixel's angle
//! lies in exactly one wedge of the revolution and each pixel is classified
//! once per traversal, both coverage guarantees hold by construction.

use crate::scanner::{grad_to_rad, GRADS_PER_TURN};

/// One pixel produced by a wedge traversal.
///
/// `x` and `y` are offsets relative to the image center; consumers write
/// `image[half - y][half - x] = intensities[bin]`, skipping bins at or beyond
/// the profile length (image resolution may exceed the number of range bins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorPoint {
    pub x: i32,
    pub y: i32,
    /// Range-bin index: bin `i` maps to pixel radius `i + 1`, bin 0 nearest
    pub bin: usize,
}

/// Lazy, restartable traversal of angular wedges over a pixel disc.
#[derive(Debug, Clone)]
pub struct SectorRasterizer {
    radius: i32,
    // wedge under traversal, in grads
    start: f64,
    step: f64,
    // bounding box and cursor of the current traversal
    x_min: i32,
    x_max: i32,
    y_max: i32,
    x: i32,
    y: i32,
    done: bool,
}

impl Default for SectorRasterizer {
    fn default() -> Self {
        SectorRasterizer {
            radius: 150,
            start: 0.0,
            step: 0.0,
            x_min: 0,
            x_max: 0,
            y_max: 0,
            x: 0,
            y: 0,
            done: true,
        }
    }
}

impl SectorRasterizer {
    /// Set the disc radius in pixels (half the image side). Bin `i` maps to
    /// pixel radius `i + 1`.
    pub fn configure(&mut self, radius: u16) {
        self.radius = radius as i32;
        self.done = true;
    }

    /// Configured disc radius in pixels
    pub fn radius(&self) -> u16 {
        self.radius as u16
    }

    /// Start traversing the wedge `[angle, angle + step)`, both in grads.
    ///
    /// Restartable: calling this again rewinds the traversal, whether or not
    /// the previous one ran to completion.
    pub fn begin_sector(&mut self, angle: u16, step: u16) {
        self.start = (angle % GRADS_PER_TURN) as f64;
        self.step = step as f64;

        let (x_min, x_max, y_min, y_max) = self.wedge_bounds();
        self.x_min = x_min;
        self.x_max = x_max;
        self.y_max = y_max;
        self.x = x_min;
        self.y = y_min;
        self.done = step == 0;
    }

    /// Next pixel of the current wedge, or `None` when the wedge is done.
    pub fn next_point(&mut self) -> Option<SectorPoint> {
        while !self.done {
            let (x, y) = (self.x, self.y);
            self.advance_cursor();
            if let Some(bin) = self.classify(x, y) {
                return Some(SectorPoint { x, y, bin });
            }
        }
        None
    }

    fn advance_cursor(&mut self) {
        if self.x < self.x_max {
            self.x += 1;
        } else if self.y < self.y_max {
            self.x = self.x_min;
            self.y += 1;
        } else {
            self.done = true;
        }
    }

    /// Polar membership test: bin index when `(x, y)` lies in the wedge
    fn classify(&self, x: i32, y: i32) -> Option<usize> {
        let r = ((x * x + y * y) as f64).sqrt();
        let ring = r.round() as i32;
        if ring > self.radius {
            return None;
        }

        let angle = (y as f64).atan2(x as f64).to_degrees() / 0.9;
        let offset = (angle - self.start).rem_euclid(GRADS_PER_TURN as f64);
        if offset >= self.step {
            return None;
        }

        Some(ring.max(1) as usize - 1)
    }

    /// Pixel bounding box of the wedge, with a safety margin for rounding.
    ///
    /// Extremes occur at the sector corners (center and the two arc ends) and
    /// wherever the wedge crosses a cardinal direction.
    fn wedge_bounds(&self) -> (i32, i32, i32, i32) {
        let reach = self.radius as f64 + 0.5;
        let mut x_min: f64 = 0.0;
        let mut x_max: f64 = 0.0;
        let mut y_min: f64 = 0.0;
        let mut y_max: f64 = 0.0;

        let mut extend = |grad: f64| {
            let (sin, cos) = grad_to_rad(grad).sin_cos();
            x_min = x_min.min(reach * cos);
            x_max = x_max.max(reach * cos);
            y_min = y_min.min(reach * sin);
            y_max = y_max.max(reach * sin);
        };

        extend(self.start);
        extend(self.start + self.step);
        for cardinal in [0.0, 100.0, 200.0, 300.0] {
            if (cardinal - self.start).rem_euclid(GRADS_PER_TURN as f64) <= self.step {
                extend(cardinal);
            }
        }

        let clamp = |v: f64, round_up: bool| -> i32 {
            let v = if round_up { v.ceil() + 1.0 } else { v.floor() - 1.0 };
            (v as i32).clamp(-self.radius, self.radius)
        };
        (
            clamp(x_min, false),
            clamp(x_max, true),
            clamp(y_min, false),
            clamp(y_max, true),
        )
    }
}
