// Two-cable (polar) kinematics

use crate::{
    error::{GeometryError, MotionError, Result},
    geometry::Point,
};
use serde::{Deserialize, Serialize};

/// Fixed geometry of a machine with two cable anchors on a horizontal line.
///
/// The origin sits midway between the anchors and `y` grows downward, so
/// the carriage always hangs at `y > 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolarSystem {
    anchor_separation: f64,
}

/// Lengths of the left and right cables, in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    pub left: f64,
    pub right: f64,
}

impl PolarPoint {
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }
}

impl PolarSystem {
    pub fn new(anchor_separation: f64) -> Result<Self> {
        if !anchor_separation.is_finite() || anchor_separation <= 0.0 {
            return Err(MotionError::Configuration(format!(
                "anchor separation must be positive, got {anchor_separation}"
            )));
        }
        Ok(Self { anchor_separation })
    }

    pub fn anchor_separation(&self) -> f64 {
        self.anchor_separation
    }

    pub fn left_anchor(&self) -> Point {
        Point::new(-self.anchor_separation / 2.0, 0.0)
    }

    pub fn right_anchor(&self) -> Point {
        Point::new(self.anchor_separation / 2.0, 0.0)
    }
}

/// Cable lengths needed to hold the carriage at `p`.
pub fn cartesian_to_polar(p: Point, system: &PolarSystem) -> PolarPoint {
    PolarPoint {
        left: p.distance(&system.left_anchor()),
        right: p.distance(&system.right_anchor()),
    }
}

/// Carriage position for a pair of cable lengths.
///
/// The positive root is taken for `y` because the carriage hangs below the
/// anchors. Lengths that cannot close a triangle with the anchor separation
/// are rejected.
pub fn polar_to_cartesian(
    pp: PolarPoint,
    system: &PolarSystem,
) -> std::result::Result<Point, GeometryError> {
    let d = system.anchor_separation;
    let infeasible = GeometryError::InfeasibleLengths {
        left: pp.left,
        right: pp.right,
        separation: d,
    };

    if !(pp.left.is_finite() && pp.right.is_finite()) || pp.left < 0.0 || pp.right < 0.0 {
        return Err(infeasible);
    }

    let x = (pp.left * pp.left - pp.right * pp.right) / (2.0 * d);
    let from_left = x + d / 2.0;
    let radicand = pp.left * pp.left - from_left * from_left;
    if radicand < 0.0 || !radicand.is_finite() {
        return Err(infeasible);
    }

    Ok(Point::new(x, radicand.sqrt()))
}
