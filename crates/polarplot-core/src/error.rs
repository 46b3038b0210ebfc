use std::fmt;
use thiserror::Error;

/// A point or cable-length pair that the machine cannot physically reach.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    #[error("cable lengths {left:.3} and {right:.3} cannot span anchors {separation:.3} apart")]
    InfeasibleLengths {
        left: f64,
        right: f64,
        separation: f64,
    },
    #[error("point ({x:.3}, {y:.3}) is not below the anchor line")]
    AboveAnchors { x: f64, y: f64 },
    #[error("point ({x:.3}, {y:.3}) lies outside the drawing surface")]
    OutsideSurface { x: f64, y: f64 },
}

/// Why a run stopped before the input was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The shared cancellation flag was raised.
    Cancelled,
    /// The downstream consumer went away.
    OutputClosed,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Cancelled => f.write_str("cancelled"),
            Halt::OutputClosed => f.write_str("output closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("run halted: {0}")]
    Halted(Halt),
}

pub type Result<T> = std::result::Result<T, MotionError>;
