use super::chord_angle;
use polarplot_core::Point;
use std::f64::consts::TAU;

/// Radius at which a spiral is considered finished.
const SPIRAL_END_RADIUS: f64 = 0.01;

/// Inward spiral starting at `(radius, 0)`, shrinking by `pitch` per turn.
///
/// Consecutive samples are roughly `step` apart along the curve.
pub fn spiral(radius: f64, pitch: f64, step: f64) -> impl Iterator<Item = Point> + Send {
    let mut radius = radius;
    let mut theta = 0.0f64;
    let body = std::iter::from_fn(move || {
        if radius < SPIRAL_END_RADIUS || pitch <= 0.0 {
            return None;
        }
        let point = Point::new(radius * theta.cos(), radius * theta.sin());
        let delta = chord_angle(step, radius);
        theta = (theta + delta) % TAU;
        radius -= pitch * delta / TAU;
        Some(point)
    });
    body.chain(std::iter::once(Point::ORIGIN))
}

/// `count` circles of `radius`, the centre sliding right by `displacement`
/// for every circle drawn.
pub fn sliding_circle(
    radius: f64,
    displacement: f64,
    count: u32,
    step: f64,
) -> impl Iterator<Item = Point> + Send {
    let delta = 1.4 * chord_angle(step, radius);
    let slide = displacement * delta / TAU;
    let mut theta = 0.0f64;
    let mut center = 0.0;
    let mut drawn = 0;
    let body = std::iter::from_fn(move || {
        if drawn >= count || delta <= 0.0 {
            return None;
        }
        center += slide;
        let point = Point::new(center + radius * theta.cos(), radius * theta.sin());
        theta += delta;
        if theta > TAU {
            theta -= TAU;
            drawn += 1;
        }
        Some(point)
    });
    body.chain(std::iter::once(Point::ORIGIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spiral_winds_inward_and_returns() {
        let points: Vec<Point> = spiral(20.0, 5.0, 0.5).collect();
        assert_eq!(points[0], Point::new(20.0, 0.0));
        assert_eq!(*points.last().unwrap(), Point::ORIGIN);

        let radii: Vec<f64> = points[..points.len() - 1].iter().map(Point::len).collect();
        assert!(radii.windows(2).all(|w| w[1] < w[0]));
        // four turns at roughly 2 samples per mm of arc
        assert!(points.len() > 400 && points.len() < 1000, "{}", points.len());
    }

    #[test]
    fn spiral_samples_are_evenly_spaced() {
        let points: Vec<Point> = spiral(50.0, 10.0, 1.0).take(200).collect();
        for pair in points.windows(2) {
            let gap = pair[0].distance(&pair[1]);
            assert!((0.8..1.2).contains(&gap), "gap {gap}");
        }
    }

    #[test]
    fn sliding_circle_draws_requested_turns() {
        let points: Vec<Point> = sliding_circle(10.0, 4.0, 3, 0.5).collect();
        assert_eq!(*points.last().unwrap(), Point::ORIGIN);

        let body = &points[..points.len() - 1];
        let last = body.last().unwrap();
        // three circles moved the centre by about three displacements
        let center_x = body.iter().map(|p| p.x).sum::<f64>() / body.len() as f64;
        assert!((last.x - 10.0 - 12.0).abs() < 1.0, "{last:?}");
        assert!(center_x > 4.0 && center_x < 8.0, "{center_x}");
    }
}
