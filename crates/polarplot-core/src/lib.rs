//! Motion planning and step generation for two-cable drawing robots.
//!
//! This crate knows nothing about patterns or output devices; it turns a
//! stream of Cartesian targets into per-tick step counts for the two spools.

pub mod config;
pub mod error;
pub mod geometry;
pub mod lookahead;
pub mod pipeline;
pub mod planner;
pub mod polar;
pub mod step;

pub use config::{MotionConfig, SurfaceBounds};
pub use error::{GeometryError, Halt, MotionError, Result};
pub use geometry::{Circle, Line, LineSegment, Point};
pub use lookahead::LookaheadBuffer;
pub use pipeline::{CancelFlag, PlanReport};
pub use planner::{MotionPhase, Planner};
pub use polar::{PolarPoint, PolarSystem, cartesian_to_polar, polar_to_cartesian};
pub use step::{StepTick, TickSink};
