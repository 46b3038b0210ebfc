use crate::{
    error::{MotionError, Result},
    geometry::Point,
    polar::{PolarPoint, PolarSystem, polar_to_cartesian},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest per-tick step count a serial frame can carry.
pub const MAX_STEPS_PER_TICK: f64 = i8::MAX as f64;

/// Physical and run parameters of the machine.
///
/// All distances are millimetres. Surface bounds are expressed in the
/// machine frame: origin midway between the anchors, `y` growing downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Horizontal distance between the two cable anchors
    #[serde(default = "default_anchor_separation")]
    pub anchor_separation_mm: f64,

    /// Left cable length when the run starts
    #[serde(default = "default_start_length")]
    pub start_left_mm: f64,

    /// Right cable length when the run starts
    #[serde(default = "default_start_length")]
    pub start_right_mm: f64,

    #[serde(default = "default_max_speed")]
    pub max_speed_mm_s: f64,

    #[serde(default = "default_accel")]
    pub accel_mm_s2: f64,

    /// Control loop period
    #[serde(default = "default_tick_period")]
    pub tick_period_us: u32,

    /// Motor steps per millimetre of cable
    #[serde(default = "default_steps_per_mm")]
    pub steps_per_mm: f64,

    /// Number of upcoming points the planner inspects before committing to a speed
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Capacity of each queue between pipeline stages
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub surface: SurfaceBounds,
}

/// Rectangle the pen may visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for SurfaceBounds {
    fn default() -> Self {
        Self {
            min_x: -300.0,
            max_x: 300.0,
            min_y: 150.0,
            max_y: 900.0,
        }
    }
}

impl SurfaceBounds {
    pub fn contains(&self, p: Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            anchor_separation_mm: default_anchor_separation(),
            start_left_mm: default_start_length(),
            start_right_mm: default_start_length(),
            max_speed_mm_s: default_max_speed(),
            accel_mm_s2: default_accel(),
            tick_period_us: default_tick_period(),
            steps_per_mm: default_steps_per_mm(),
            lookahead: default_lookahead(),
            queue_capacity: default_queue_capacity(),
            surface: SurfaceBounds::default(),
        }
    }
}

fn default_anchor_separation() -> f64 {
    800.0
}

fn default_start_length() -> f64 {
    600.0
}

fn default_max_speed() -> f64 {
    80.0
}

fn default_accel() -> f64 {
    250.0
}

fn default_tick_period() -> u32 {
    2048
}

fn default_steps_per_mm() -> f64 {
    steps_per_mm(3200.0, 12.63)
}

fn default_lookahead() -> usize {
    32
}

fn default_queue_capacity() -> usize {
    1024
}

/// Steps per millimetre of cable for a spool of the given diameter.
pub fn steps_per_mm(steps_per_revolution: f64, spool_diameter_mm: f64) -> f64 {
    steps_per_revolution / (std::f64::consts::PI * spool_diameter_mm)
}

impl MotionConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(u64::from(self.tick_period_us))
    }

    pub fn tick_secs(&self) -> f64 {
        f64::from(self.tick_period_us) / 1_000_000.0
    }

    pub fn polar_system(&self) -> Result<PolarSystem> {
        PolarSystem::new(self.anchor_separation_mm)
    }

    pub fn start_lengths(&self) -> PolarPoint {
        PolarPoint::new(self.start_left_mm, self.start_right_mm)
    }

    /// Absolute machine position of the pen when the run starts.
    pub fn start_position(&self) -> Result<Point> {
        let system = self.polar_system()?;
        polar_to_cartesian(self.start_lengths(), &system).map_err(|err| {
            MotionError::Configuration(format!("starting cable lengths: {err}"))
        })
    }

    /// Slow the whole run down by `factor` (speed and acceleration both divided).
    pub fn with_slow_factor(mut self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(MotionError::Argument(format!(
                "slow factor must be at least 1, got {factor}"
            )));
        }
        self.max_speed_mm_s /= factor;
        self.accel_mm_s2 /= factor;
        Ok(self)
    }

    /// Check the configuration before any planning happens.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("anchor_separation_mm", self.anchor_separation_mm),
            ("start_left_mm", self.start_left_mm),
            ("start_right_mm", self.start_right_mm),
            ("max_speed_mm_s", self.max_speed_mm_s),
            ("accel_mm_s2", self.accel_mm_s2),
            ("steps_per_mm", self.steps_per_mm),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MotionError::Configuration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if self.tick_period_us == 0 {
            return Err(MotionError::Configuration(
                "tick_period_us must be positive".into(),
            ));
        }

        if self.lookahead < 2 {
            return Err(MotionError::Configuration(format!(
                "lookahead must hold at least 2 points, got {}",
                self.lookahead
            )));
        }

        if self.queue_capacity == 0 {
            return Err(MotionError::Configuration(
                "queue_capacity must be positive".into(),
            ));
        }

        if self.anchor_separation_mm > self.start_left_mm + self.start_right_mm {
            return Err(MotionError::Configuration(format!(
                "starting cable lengths {} + {} are shorter than the anchor separation {}",
                self.start_left_mm, self.start_right_mm, self.anchor_separation_mm
            )));
        }

        let s = self.surface;
        if !(s.min_x < s.max_x && s.min_y < s.max_y) || s.min_y <= 0.0 {
            return Err(MotionError::Configuration(format!(
                "surface bounds must be a non-empty rectangle below the anchors, got {s:?}"
            )));
        }

        let per_tick = self.accel_mm_s2 * self.tick_secs();
        if per_tick > self.max_speed_mm_s {
            return Err(MotionError::Configuration(format!(
                "acceleration of {per_tick} mm/s per tick exceeds the maximum speed"
            )));
        }

        // cable length changes by at most the carriage displacement
        let steps = self.max_speed_mm_s * self.tick_secs() * self.steps_per_mm;
        if steps + 1.0 > MAX_STEPS_PER_TICK {
            return Err(MotionError::Configuration(format!(
                "up to {steps:.1} steps per tick exceeds the limit of {MAX_STEPS_PER_TICK}"
            )));
        }

        let start = self.start_position()?;
        if !s.contains(start) {
            return Err(MotionError::Configuration(format!(
                "starting position ({:.3}, {:.3}) lies outside the drawing surface",
                start.x, start.y
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = MotionConfig::default();
        config.validate().unwrap();
        let start = config.start_position().unwrap();
        assert!(start.approx_eq(&Point::new(0.0, 200.0f64 * 5.0f64.sqrt())));
    }

    #[test]
    fn rejects_short_cables() {
        let config = MotionConfig {
            start_left_mm: 300.0,
            start_right_mm: 400.0,
            ..MotionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MotionError::Configuration(_)), "{err}");
    }

    #[test]
    fn rejects_start_outside_surface() {
        let config = MotionConfig {
            start_left_mm: 420.0,
            start_right_mm: 420.0,
            ..MotionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_too_many_steps_per_tick() {
        let config = MotionConfig {
            max_speed_mm_s: 2000.0,
            ..MotionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn slow_factor_divides_speed_and_accel() {
        let config = MotionConfig::default().with_slow_factor(2.0).unwrap();
        assert_eq!(config.max_speed_mm_s, 40.0);
        assert_eq!(config.accel_mm_s2, 125.0);
        assert!(MotionConfig::default().with_slow_factor(0.5).is_err());
    }

    #[test]
    fn tick_period_conversions() {
        let config = MotionConfig::default();
        assert_eq!(config.tick_period(), Duration::from_micros(2048));
        assert_eq!(config.tick_secs(), 0.002048);
    }
}
