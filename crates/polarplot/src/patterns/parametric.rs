use polarplot_core::Point;
use std::f64::consts::{FRAC_PI_2, TAU};
use tracing::warn;

const SAMPLES_PER_TURN: f64 = 2000.0;
const DEFAULT_MAX_SAMPLES: u64 = 10_000_000;

/// Samples a closed parametric curve `t -> Point` until it returns to its
/// start, yielding a point whenever the pen has moved further than
/// `min_spacing` since the last one.
///
/// Curves that never close stop after a fixed number of samples.
pub struct Parametric<F> {
    curve: F,
    initial: Point,
    first_step: Point,
    last_emitted: Point,
    min_spacing: f64,
    index: u64,
    max_samples: u64,
    finished: bool,
}

impl<F> Parametric<F>
where
    F: Fn(f64) -> Point,
{
    pub fn new(curve: F, min_spacing: f64) -> Self {
        let initial = curve(0.0);
        let first_step = curve(Self::theta(1));
        Self {
            curve,
            initial,
            first_step,
            last_emitted: initial,
            min_spacing,
            index: 0,
            max_samples: DEFAULT_MAX_SAMPLES,
            finished: false,
        }
    }

    pub fn with_max_samples(mut self, max_samples: u64) -> Self {
        self.max_samples = max_samples;
        self
    }

    fn theta(index: u64) -> f64 {
        index as f64 * TAU / SAMPLES_PER_TURN
    }

    // Back at the start and heading the same way as the first sample.
    fn is_closed(&self, current: Point) -> bool {
        current.approx_eq(&self.initial)
            && (self.curve)(Self::theta(self.index + 1)).approx_eq(&self.first_step)
    }
}

impl<F> Iterator for Parametric<F>
where
    F: Fn(f64) -> Point,
{
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.finished {
            return None;
        }
        loop {
            self.index += 1;
            let current = (self.curve)(Self::theta(self.index));

            if self.is_closed(current) {
                self.finished = true;
                return Some(Point::ORIGIN);
            }
            if self.index >= self.max_samples {
                warn!(samples = self.index, "curve did not close, stopping");
                self.finished = true;
                return Some(current - self.initial);
            }
            if current.distance(&self.last_emitted) > self.min_spacing {
                self.last_emitted = current;
                return Some(current - self.initial);
            }
        }
    }
}

/// Lissajous figure with the given amplitude and axis frequencies.
pub fn lissajous(
    amplitude: f64,
    x_frequency: f64,
    y_frequency: f64,
    min_spacing: f64,
) -> Parametric<impl Fn(f64) -> Point + Send> {
    Parametric::new(
        move |t: f64| {
            Point::new(
                amplitude * (x_frequency * t + FRAC_PI_2).cos(),
                amplitude * (y_frequency * t).sin(),
            )
        },
        min_spacing,
    )
}

/// Hypotrochoid traced by a pen `pen` from the centre of a wheel of
/// radius `inner` rolling inside a ring of radius `outer`.
pub fn spirograph(
    outer: f64,
    inner: f64,
    pen: f64,
    min_spacing: f64,
) -> Parametric<impl Fn(f64) -> Point + Send> {
    let ratio = (outer - inner) / inner;
    Parametric::new(
        move |t: f64| {
            Point::new(
                (outer - inner) * t.cos() + pen * (ratio * t).cos(),
                (outer - inner) * t.sin() - pen * (ratio * t).sin(),
            )
        },
        min_spacing,
    )
}
