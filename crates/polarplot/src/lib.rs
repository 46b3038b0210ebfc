//! Command line driver for two-cable drawing robots.
//!
//! Pattern generators feed the planning pipeline from `polarplot-core`; the
//! resulting step stream goes to a serial controller, a file, a chart or a
//! counter.

pub mod cli;
pub mod config;
pub mod patterns;
pub mod sinks;
