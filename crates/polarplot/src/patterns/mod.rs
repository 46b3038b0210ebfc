//! Point generators for the `draw` command.
//!
//! Every generator yields points in millimetres relative to the pen position
//! at the start of the run and ends back at `(0, 0)` unless noted.

mod bouncing;
mod fixture;
mod lines;
mod parametric;
mod spiral;

pub use bouncing::BouncingLine;
pub use fixture::fixture;
pub use lines::{grid, hilbert, parabolic};
pub use parametric::{Parametric, lissajous, spirograph};
pub use spiral::{sliding_circle, spiral};

use polarplot_core::{MotionConfig, Point};

/// Boxed point stream handed to the pipeline source.
pub type PointStream = Box<dyn Iterator<Item = Point> + Send>;

/// Distance the pen covers in `ticks` control periods at full speed.
pub fn sample_distance(config: &MotionConfig, ticks: f64) -> f64 {
    ticks * config.max_speed_mm_s * config.tick_secs()
}

/// Angle subtended by a chord of length `chord` on a circle of `radius`.
///
/// Chords longer than the diameter are treated as a half turn.
fn chord_angle(chord: f64, radius: f64) -> f64 {
    2.0 * (chord / (2.0 * radius)).clamp(-1.0, 1.0).asin()
}
