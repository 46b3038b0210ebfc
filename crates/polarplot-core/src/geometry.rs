// Planar geometry primitives

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance for approximate comparisons, in millimetres.
pub const EPSILON: f64 = 1e-9;

/// A Cartesian location in millimetres, optionally travelled with the pen lifted.
///
/// `pen_up` is carried along with the coordinate but never takes part in
/// distance or angle math. Arithmetic keeps the flag of the left operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub pen_up: bool,
}

impl Point {
    pub const ORIGIN: Point = Point {
        x: 0.0,
        y: 0.0,
        pen_up: false,
    };

    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pen_up: false,
        }
    }

    /// A travel move with the pen lifted.
    pub const fn travel(x: f64, y: f64) -> Self {
        Self { x, y, pen_up: true }
    }

    pub fn len(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (*other - *self).len()
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn scaled(self, factor: f64) -> Self {
        self * factor
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.len();
        if len <= EPSILON || !len.is_finite() {
            return None;
        }
        Some(self * (1.0 / len))
    }

    /// Coordinate equality within [`EPSILON`], ignoring the pen flag.
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            pen_up: self.pen_up,
        }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            pen_up: self.pen_up,
        }
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point {
            x: self.x * rhs,
            y: self.y * rhs,
            pen_up: self.pen_up,
        }
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point {
            x: -self.x,
            y: -self.y,
            pen_up: self.pen_up,
        }
    }
}

/// Finite line between two points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineSegment {
    pub begin: Point,
    pub end: Point,
}

impl LineSegment {
    pub const fn new(begin: Point, end: Point) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> f64 {
        self.begin.distance(&self.end)
    }

    pub fn direction(&self) -> Point {
        self.end - self.begin
    }

    /// Point at parameter `t`, where 0 is `begin` and 1 is `end`.
    pub fn at(&self, t: f64) -> Point {
        self.begin + self.direction() * t
    }

    /// Intersection of two bounded segments.
    ///
    /// Parallel segments, and crossings outside either segment, report no
    /// intersection.
    pub fn intersect(&self, other: &LineSegment) -> Option<Point> {
        let (t, u) = solve_params(self.begin, self.direction(), other.begin, other.direction())?;
        (in_unit(t) && in_unit(u)).then(|| self.at(t))
    }

    /// Intersection of this segment with an unbounded line.
    pub fn intersect_line(&self, line: &Line) -> Option<Point> {
        let (t, _) = solve_params(self.begin, self.direction(), line.a, line.b - line.a)?;
        in_unit(t).then(|| self.at(t))
    }
}

/// Unbounded line through two distinct points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub const fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Points where `segment` crosses the circle, ordered from `segment.begin`.
    ///
    /// Returns no points for a miss, one for a tangent and up to two otherwise.
    pub fn intersect(&self, segment: &LineSegment) -> Vec<Point> {
        let d = segment.direction();
        let f = segment.begin - self.center;
        let a = d.dot(&d);
        if a <= EPSILON * EPSILON {
            return Vec::new();
        }
        let b = 2.0 * f.dot(&d);
        let c = f.dot(&f) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            return Vec::new();
        }

        let params = if discriminant == 0.0 {
            vec![-b / (2.0 * a)]
        } else {
            let root = discriminant.sqrt();
            vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
        };

        params
            .into_iter()
            .filter(|t| in_unit(*t))
            .map(|t| segment.at(t))
            .collect()
    }
}

// Endpoints count, including ones missed by rounding.
fn in_unit(t: f64) -> bool {
    (-EPSILON..=1.0 + EPSILON).contains(&t)
}

// Solves p + t*r = q + u*s for (t, u); None when the lines are parallel.
fn solve_params(p: Point, r: Point, q: Point, s: Point) -> Option<(f64, f64)> {
    let denom = r.cross(&s);
    if denom.abs() <= EPSILON {
        return None;
    }
    let qp = q - p;
    Some((qp.cross(&s) / denom, qp.cross(&r) / denom))
}
