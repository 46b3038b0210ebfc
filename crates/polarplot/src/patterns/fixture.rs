use polarplot_core::Point;

/// Short drawing that exercises straight runs, a sharp corner and pen changes.
pub fn fixture() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.1, 0.0),
        Point::new(10.1, 10.0),
        Point::travel(10.1, 10.0),
        Point::travel(20.1, 10.0),
        Point::new(20.1, 15.0),
        Point::travel(20.1, 15.0),
        Point::travel(0.0, 0.0),
    ]
}
