// Straight-line figures: Hilbert curve, grid and string-art parabolas

use polarplot_core::Point;
use std::f64::consts::TAU;

/// Hilbert curve filling a `size` square on a `2^(degree + 1)` grid.
pub fn hilbert(size: f64, degree: u32) -> impl Iterator<Item = Point> + Send {
    let dim: u64 = 2 << degree;
    let scale = size / dim as f64;
    (0..dim * dim)
        .map(move |d| {
            let (x, y) = d2xy(dim, d);
            Point::new(x as f64 * scale, y as f64 * scale)
        })
        .chain(std::iter::once(Point::ORIGIN))
}

// Position of index `d` along the Hilbert curve of an `n` by `n` grid.
fn d2xy(n: u64, d: u64) -> (u64, u64) {
    let (mut x, mut y) = (0, 0);
    let mut t = d;
    let mut s = 1;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

/// A `width` square divided into `cells` by `cells`, drawn as two
/// boustrophedon passes.
pub fn grid(width: f64, cells: u32) -> Vec<Point> {
    let cell = width / f64::from(cells);
    let mut points = Vec::with_capacity(4 * cells as usize + 3);

    for row in 0..cells {
        let x = if row % 2 == 0 { width } else { 0.0 };
        let y = f64::from(row) * cell;
        points.push(Point::new(x, y));
        points.push(Point::new(x, y + cell));
    }
    points.push(Point::new(0.0, width));

    for col in 0..cells {
        let y = if col % 2 == 0 { 0.0 } else { width };
        let x = f64::from(col) * cell;
        points.push(Point::new(x, y));
        points.push(Point::new(x + cell, y));
    }
    if cells % 2 == 0 {
        points.push(Point::new(width, 0.0));
    }

    points.push(Point::ORIGIN);
    points
}

/// Parabolic envelopes between the spokes of a regular polygon.
///
/// Each of the `edges` sectors is filled with `lines` straight lines running
/// from one spoke to the next.
pub fn parabolic(radius: f64, edges: u32, lines: u32) -> Vec<Point> {
    let corners: Vec<Point> = (0..edges)
        .map(|edge| {
            let angle = TAU / f64::from(edges) * f64::from(edge);
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();

    let mut points = Vec::with_capacity(edges as usize * (2 * lines as usize + 1));
    for (edge, &spoke) in corners.iter().enumerate() {
        let next = corners[(edge + 1) % corners.len()];
        for line in 0..lines {
            let start = spoke + (Point::ORIGIN - spoke) * (f64::from(line) / f64::from(lines));
            let end = next * (f64::from(line + 1) / f64::from(lines));
            if line % 2 == 0 {
                points.extend([start, end]);
            } else {
                points.extend([end, start]);
            }
        }
        points.push(Point::ORIGIN);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn hilbert_visits_every_cell_once() {
        let points: Vec<Point> = hilbert(40.0, 1).collect();
        assert_eq!(points.len(), 17);
        assert_eq!(points[0], Point::ORIGIN);

        let body = &points[..16];
        let cells: HashSet<(u64, u64)> = body
            .iter()
            .map(|p| ((p.x / 10.0) as u64, (p.y / 10.0) as u64))
            .collect();
        assert_eq!(cells.len(), 16);
        for pair in body.windows(2) {
            assert!((pair[0].distance(&pair[1]) - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn hilbert_index_matches_reference() {
        let expected = [(0, 0), (1, 0), (1, 1), (0, 1), (0, 2), (0, 3), (1, 3), (1, 2)];
        for (d, xy) in expected.into_iter().enumerate() {
            assert_eq!(d2xy(4, d as u64), xy);
        }
        assert_eq!(d2xy(4, 15), (3, 0));
    }

    #[test]
    fn grid_stays_inside_square() {
        let points = grid(30.0, 3);
        assert_eq!(points.len(), 14);
        assert_eq!(*points.last().unwrap(), Point::ORIGIN);
        assert!(
            points
                .iter()
                .all(|p| (0.0..=30.0 + 1e-9).contains(&p.x) && (0.0..=30.0 + 1e-9).contains(&p.y))
        );
        assert_eq!(grid(30.0, 2).len(), 2 * 2 + 1 + 2 * 2 + 1 + 1);
    }

    #[test]
    fn parabolic_returns_to_centre_per_sector() {
        let points = parabolic(10.0, 4, 2);
        assert_eq!(points.len(), 4 * 5);
        for sector in points.chunks(5) {
            assert_eq!(sector[4], Point::ORIGIN);
        }
        assert!(points.iter().all(|p| p.len() <= 10.0 + 1e-9));
        assert_eq!(points[0], Point::new(10.0, 0.0));
    }
}
