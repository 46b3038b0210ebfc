//! Lookahead motion planner and step generator.
//!
//! Targets are queued in a [`LookaheadBuffer`]; once it is full (or the input
//! has ended) the planner runs one control tick at a time. Every tick picks a
//! speed from a trapezoidal profile, moves the planned position along the
//! path, converts the result to cable lengths and quantizes the change into
//! whole steps.
//!
//! A tick always ends exactly `speed * dt` in a straight line from where it
//! began, so the motion the motors see between two ticks matches the planned
//! speed even when a corner is cut inside the tick. Only a forced stop (a pen
//! change, a corner too sharp for the current speed or the end of the path)
//! ends a tick early, and the shorter move then becomes the speed the next
//! tick ramps from.

use crate::{
    config::{MotionConfig, SurfaceBounds},
    error::{GeometryError, Halt, MotionError, Result},
    geometry::Point,
    lookahead::{BufferFull, LookaheadBuffer},
    pipeline::CancelFlag,
    polar::{PolarSystem, cartesian_to_polar},
    step::{RecordingSink, StepAccumulator, StepTick, TickSink},
};
use tracing::{debug, trace};

/// Exponent applied to the corner factor; higher values slow down earlier on
/// gentle turns.
const CORNER_SHARPNESS: i32 = 4;

/// Speed changes smaller than this are treated as cruising.
const SPEED_EPSILON: f64 = 1e-9;

/// Largest deviation, in motor steps, allowed when nearly collinear targets
/// are merged into one.
const MERGE_TOLERANCE_STEPS: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MotionPhase {
    #[default]
    Idle,
    Accelerating,
    Cruising,
    Decelerating,
}

/// Straight run ending at the newest queued target.
///
/// Later targets that keep every target seen so far within the tolerance of
/// the line from `base` replace the tail instead of taking a new slot, so a
/// densely sampled path still gives the lookahead enough distance to brake
/// from full speed. Each absorbed target narrows the cone of directions the
/// run may still take.
#[derive(Debug, Clone, Copy)]
struct StraightRun {
    base: Point,
    heading: Point,
    min_angle: f64,
    max_angle: f64,
    reach: f64,
}

impl StraightRun {
    fn new(base: Point, tail: Point, tolerance: f64) -> Option<Self> {
        let reach = base.distance(&tail);
        if reach <= tolerance {
            return None;
        }
        let heading = (tail - base).normalized()?;
        let spread = (tolerance / reach).asin();
        Some(Self {
            base,
            heading,
            min_angle: -spread,
            max_angle: spread,
            reach,
        })
    }

    // Moving backwards or leaving the cone ends the run.
    fn absorb(&mut self, point: Point, tolerance: f64) -> bool {
        let offset = point - self.base;
        let reach = offset.len();
        if reach < self.reach {
            return false;
        }
        let angle = self.heading.cross(&offset).atan2(self.heading.dot(&offset));
        if angle < self.min_angle || angle > self.max_angle {
            return false;
        }
        let spread = (tolerance / reach).asin();
        self.min_angle = self.min_angle.max(angle - spread);
        self.max_angle = self.max_angle.min(angle + spread);
        self.reach = reach;
        true
    }
}

pub struct Planner {
    system: PolarSystem,
    origin: Point,
    surface: SurfaceBounds,
    max_speed: f64,
    accel: f64,
    dt: f64,
    merge_tolerance: f64,
    queue: LookaheadBuffer<Point>,
    // scratch for the backward pass, one heading per queued point
    headings: Vec<Option<Point>>,
    run: Option<StraightRun>,
    position: Point,
    speed: f64,
    pen_up: bool,
    phase: MotionPhase,
    left: StepAccumulator,
    right: StepAccumulator,
    points: u64,
    ticks: u64,
    cancel: Option<CancelFlag>,
}

impl Planner {
    pub fn new(config: &MotionConfig) -> Result<Self> {
        config.validate()?;
        let system = config.polar_system()?;
        let origin = config.start_position()?;
        let start = cartesian_to_polar(origin, &system);

        debug!(
            x = origin.x,
            y = origin.y,
            left = start.left,
            right = start.right,
            "planner start position"
        );

        Ok(Self {
            system,
            origin,
            surface: config.surface,
            max_speed: config.max_speed_mm_s,
            accel: config.accel_mm_s2,
            dt: config.tick_secs(),
            merge_tolerance: MERGE_TOLERANCE_STEPS / config.steps_per_mm,
            queue: LookaheadBuffer::new(config.lookahead),
            headings: Vec::with_capacity(config.lookahead),
            run: None,
            position: Point::ORIGIN,
            speed: 0.0,
            pen_up: false,
            phase: MotionPhase::Idle,
            left: StepAccumulator::new(start.left, config.steps_per_mm),
            right: StepAccumulator::new(start.right, config.steps_per_mm),
            points: 0,
            ticks: 0,
            cancel: None,
        })
    }

    /// Check `cancel` at every tick boundary.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Absolute machine position of the run's `(0, 0)`.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn polar_system(&self) -> &PolarSystem {
        &self.system
    }

    /// Planned position relative to the run start.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Speed realized by the last tick, mm/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Targets waiting in the lookahead.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Net steps emitted per axis since the start of the run.
    pub fn net_steps(&self) -> (i64, i64) {
        (self.left.emitted(), self.right.emitted())
    }

    /// Queue a target, running ticks while the lookahead is full.
    ///
    /// A target the machine cannot reach fails immediately with the point
    /// as it was supplied.
    pub fn push<S: TickSink>(&mut self, point: Point, sink: &mut S) -> Result<()> {
        self.check_reachable(point)?;
        if self.merge(point) {
            self.points += 1;
            return Ok(());
        }

        let mut pending = point;
        while let Err(BufferFull(rejected)) = self.queue.enqueue(pending) {
            pending = rejected;
            self.tick(sink)?;
        }
        let base = match self.queue.len() {
            n if n >= 2 => self.queue.get(n - 2).copied(),
            _ => None,
        }
        .unwrap_or(self.position);
        self.run = StraightRun::new(base, point, self.merge_tolerance);
        self.points += 1;
        Ok(())
    }

    /// Drain every queued target, coming to rest on the last one.
    pub fn finish<S: TickSink>(&mut self, sink: &mut S) -> Result<()> {
        while !self.queue.is_empty() {
            self.tick(sink)?;
        }
        self.speed = 0.0;
        self.set_phase(MotionPhase::Idle);
        debug!(points = self.points, ticks = self.ticks, "planner drained");
        Ok(())
    }

    fn check_reachable(&self, point: Point) -> Result<()> {
        let absolute = self.origin + point;
        if !point.is_finite() || absolute.y <= 0.0 {
            return Err(GeometryError::AboveAnchors {
                x: point.x,
                y: point.y,
            }
            .into());
        }
        if !self.surface.contains(absolute) {
            return Err(GeometryError::OutsideSurface {
                x: point.x,
                y: point.y,
            }
            .into());
        }
        Ok(())
    }

    // Folds `point` into the queued tail when it repeats it or continues its
    // straight run with the same pen state.
    fn merge(&mut self, point: Point) -> bool {
        let tolerance = self.merge_tolerance;
        let Some(tail) = self.queue.last_mut() else {
            return false;
        };
        if tail.pen_up != point.pen_up {
            return false;
        }
        if tail.approx_eq(&point) {
            return true;
        }
        if self.run.as_mut().is_some_and(|run| run.absorb(point, tolerance)) {
            *tail = point;
            true
        } else {
            false
        }
    }

    fn tick<S: TickSink>(&mut self, sink: &mut S) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(MotionError::Halted(Halt::Cancelled));
        }

        // stationary targets need no motion, only their pen state counts
        while let Some(head) = self.queue.peek().copied() {
            if !head.approx_eq(&self.position) {
                break;
            }
            self.queue.dequeue();
            self.set_pen(head.pen_up);
        }
        let Some(head) = self.queue.peek().copied() else {
            return Ok(());
        };
        self.set_pen(head.pen_up);

        let exit = self.exit_speed();
        let remaining = self.position.distance(&head);
        let dv = self.accel * self.dt;
        // fastest speed that still stops in time after this tick's move
        let brake = (dv * dv + exit * exit + 2.0 * self.accel * remaining).sqrt() - dv;
        let commanded = (self.speed + dv)
            .min(brake)
            .min(self.max_speed)
            .max(self.speed - dv)
            .max(dv);

        let start = self.position;
        self.advance(commanded * self.dt, commanded);
        let speed = commanded.min(start.distance(&self.position) / self.dt);

        let phase = if speed > self.speed + SPEED_EPSILON {
            MotionPhase::Accelerating
        } else if speed < self.speed - SPEED_EPSILON {
            MotionPhase::Decelerating
        } else {
            MotionPhase::Cruising
        };
        self.set_phase(phase);
        self.speed = speed;
        self.emit(sink)
    }

    // Moves the planned position to the first point along the queued path
    // that lies `reach` mm in a straight line from where the tick started.
    // The path continues through a vertex when the corner allows `speed` and
    // the pen state is unchanged; otherwise the tick ends on the vertex.
    fn advance(&mut self, reach: f64, speed: f64) {
        let start = self.position;
        let mut heading = None;
        while let Some(target) = self.queue.peek().copied() {
            if target.pen_up != self.pen_up {
                return;
            }
            if start.distance(&target) >= reach {
                // leave the circle of radius `reach` around the start
                if let Some(direction) = (target - self.position).normalized() {
                    let offset = self.position - start;
                    let along = offset.dot(&direction);
                    let inside = (along * along - offset.dot(&offset) + reach * reach).max(0.0);
                    self.position = self.position + direction * (inside.sqrt() - along);
                }
                return;
            }

            let incoming = (target - self.position).normalized().or(heading);
            self.position = target;
            self.queue.dequeue();

            let Some(next) = self.queue.peek().copied() else {
                return;
            };
            if let (Some(din), Some(dout)) = (incoming, (next - target).normalized()) {
                if self.corner_limit(din, dout) < speed {
                    return;
                }
            }
            heading = incoming;
        }
    }

    // Highest speed allowed on arrival at the head target. Walks the queue
    // backwards from its last point, which is treated as a stop.
    fn exit_speed(&mut self) -> f64 {
        self.headings.clear();
        let mut prev = self.position;
        let mut heading = None;
        for target in self.queue.iter() {
            heading = (*target - prev).normalized().or(heading);
            self.headings.push(heading);
            prev = *target;
        }

        let mut limit = 0.0f64;
        for i in (0..self.queue.len().saturating_sub(1)).rev() {
            let (Some(here), Some(next)) = (self.queue.get(i), self.queue.get(i + 1)) else {
                continue;
            };
            let corner = if here.pen_up != next.pen_up {
                0.0
            } else {
                match (self.headings[i], (*next - *here).normalized()) {
                    (Some(din), Some(dout)) => self.corner_limit(din, dout),
                    _ => self.max_speed,
                }
            };
            let reachable = (limit * limit + 2.0 * self.accel * here.distance(next)).sqrt();
            limit = corner.min(reachable);
        }
        limit
    }

    // Full speed when going straight, zero on a reversal.
    fn corner_limit(&self, incoming: Point, outgoing: Point) -> f64 {
        let factor = ((1.0 + incoming.dot(&outgoing)) / 2.0).clamp(0.0, 1.0);
        self.max_speed * factor.powi(CORNER_SHARPNESS)
    }

    fn emit<S: TickSink>(&mut self, sink: &mut S) -> Result<()> {
        let lengths = cartesian_to_polar(self.origin + self.position, &self.system);
        let tick = StepTick {
            left: self.left.advance(lengths.left),
            right: self.right.advance(lengths.right),
            pen_up: self.pen_up,
            x: self.position.x,
            y: self.position.y,
            speed: self.speed,
        };
        self.ticks += 1;
        sink.emit(tick)
    }

    fn set_pen(&mut self, pen_up: bool) {
        if self.pen_up != pen_up {
            trace!(pen_up, speed = self.speed, tick = self.ticks, "pen change");
            self.pen_up = pen_up;
        }
    }

    fn set_phase(&mut self, phase: MotionPhase) {
        if self.phase != phase {
            trace!(from = ?self.phase, to = ?phase, tick = self.ticks, "phase change");
            self.phase = phase;
        }
    }
}

/// Plan a complete point sequence in one go and collect the ticks.
pub fn plan<I>(config: &MotionConfig, points: I) -> Result<Vec<StepTick>>
where
    I: IntoIterator<Item = Point>,
{
    let mut planner = Planner::new(config)?;
    let mut sink = RecordingSink::default();
    for point in points {
        planner.push(point, &mut sink)?;
    }
    planner.finish(&mut sink)?;
    Ok(sink.ticks)
}
