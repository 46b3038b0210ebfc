use polarplot_core::{LineSegment, Point, SurfaceBounds};

/// Distance kept between the path and the surface edges, mm.
const EDGE_MARGIN: f64 = 1.0;

/// Hits closer than this to each other are the same bounce, mm.
const SAME_HIT: f64 = 1e-6;

/// A straight line that reflects off the edges of the drawing surface until
/// it has covered its total length.
///
/// Yields each bounce point followed by the end of the path.
pub struct BouncingLine {
    sides: [LineSegment; 4],
    position: Point,
    direction: Point,
    remaining: f64,
    finished: bool,
}

impl BouncingLine {
    /// `angle` is in radians; `surface` and `start` are in the machine frame.
    pub fn new(angle: f64, distance_m: f64, surface: &SurfaceBounds, start: Point) -> Self {
        let min_x = surface.min_x + EDGE_MARGIN - start.x;
        let max_x = surface.max_x - EDGE_MARGIN - start.x;
        let min_y = surface.min_y + EDGE_MARGIN - start.y;
        let max_y = surface.max_y - EDGE_MARGIN - start.y;
        let corners = [
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ];

        Self {
            sides: std::array::from_fn(|i| LineSegment::new(corners[i], corners[(i + 1) % 4])),
            position: Point::ORIGIN,
            direction: Point::new(angle.cos(), angle.sin()),
            remaining: distance_m * 1000.0,
            finished: false,
        }
    }
}

impl Iterator for BouncingLine {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.finished {
            return None;
        }

        let path = LineSegment::new(self.position, self.position + self.direction * self.remaining);
        let position = self.position;
        let hits = self
            .sides
            .map(|side| side.intersect(&path).filter(|p| !p.approx_eq(&position)));
        let nearest = hits
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| position.distance(a).total_cmp(&position.distance(b)));

        match nearest {
            Some(point) => {
                // a corner lies on two sides and reflects off both
                for (side, hit) in self.sides.iter().zip(hits) {
                    if hit.is_some_and(|hit| hit.distance(&point) <= SAME_HIT) {
                        let along = side.direction().normalized().unwrap_or(Point::ORIGIN);
                        let normal = Point::new(-along.y, along.x);
                        self.direction =
                            self.direction - normal * (2.0 * self.direction.dot(&normal));
                    }
                }
                self.remaining -= position.distance(&point);
                self.position = point;
            }
            None => {
                self.position = path.end;
                self.finished = true;
            }
        }
        Some(self.position)
    }
}
