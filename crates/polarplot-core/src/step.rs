use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One control period's motor command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTick {
    /// Signed steps for the left spool
    pub left: i32,
    /// Signed steps for the right spool
    pub right: i32,
    pub pen_up: bool,
    /// Planned pen position after this tick, relative to the run start
    pub x: f64,
    pub y: f64,
    /// Path speed during this tick, mm/s
    pub speed: f64,
}

/// Consumer of the planner's tick stream.
pub trait TickSink {
    fn emit(&mut self, tick: StepTick) -> Result<()>;
}

#[derive(Default, Debug)]
pub struct RecordingSink {
    pub ticks: Vec<StepTick>,
}

impl TickSink for RecordingSink {
    fn emit(&mut self, tick: StepTick) -> Result<()> {
        self.ticks.push(tick);
        Ok(())
    }
}

/// Quantizes a continuously changing cable length into whole steps.
///
/// The exact step position is always measured from the length at the start
/// of the run, and only the part not yet emitted goes out with each call.
/// The fractional remainder therefore stays in `[0, 1)` for the whole run
/// no matter how many ticks or direction reversals happen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepAccumulator {
    origin: f64,
    steps_per_mm: f64,
    emitted: i64,
}

impl StepAccumulator {
    pub fn new(origin: f64, steps_per_mm: f64) -> Self {
        Self {
            origin,
            steps_per_mm,
            emitted: 0,
        }
    }

    /// Steps to emit for the cable now being `length` long.
    pub fn advance(&mut self, length: f64) -> i32 {
        let exact = (length - self.origin) * self.steps_per_mm;
        let target = exact.floor() as i64;
        let steps = target - self.emitted;
        self.emitted = target;
        steps as i32
    }

    /// Net steps emitted since the start of the run.
    pub fn emitted(&self) -> i64 {
        self.emitted
    }

    /// Continuous position not yet covered by emitted steps, in steps.
    pub fn remainder(&self, length: f64) -> f64 {
        (length - self.origin) * self.steps_per_mm - self.emitted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_fractional_steps() {
        let mut acc = StepAccumulator::new(100.0, 10.0);
        // 0.04mm per call is 0.4 steps
        let steps: Vec<i32> = (1..=5).map(|i| acc.advance(100.0 + 0.04 * i as f64)).collect();
        assert_eq!(steps.iter().sum::<i32>(), 2);
        assert_eq!(acc.emitted(), 2);
        assert!(acc.remainder(100.2) < 1.0);
    }

    #[test]
    fn reversals_do_not_drift() {
        let mut acc = StepAccumulator::new(0.0, 80.0);
        let mut total = 0i64;
        let mut length = 0.0;
        for i in 0..10_000 {
            length += if i % 3 == 0 { -0.013 } else { 0.0071 };
            total += i64::from(acc.advance(length));
            let remainder = length * 80.0 - total as f64;
            assert!((0.0..1.0).contains(&remainder), "remainder {remainder}");
        }
    }

    #[test]
    fn returning_to_origin_cancels_out() {
        let mut acc = StepAccumulator::new(523.25, 80.64);
        let mut total = 0;
        for length in [524.0, 530.5, 520.125, 523.25] {
            total += acc.advance(length);
        }
        assert_eq!(total, 0);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::default();
        for left in 0..3 {
            sink.emit(StepTick {
                left,
                ..StepTick::default()
            })
            .unwrap();
        }
        let lefts: Vec<i32> = sink.ticks.iter().map(|t| t.left).collect();
        assert_eq!(lefts, vec![0, 1, 2]);
    }
}
