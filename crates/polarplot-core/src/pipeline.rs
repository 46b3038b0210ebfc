//! Staged point pipeline.
//!
//! A run is a chain of stages joined by bounded queues: a point source, an
//! optional mirroring stage, the planner and a tick consumer. Each stage
//! closes its output when its input ends, so shutdown ripples downstream.
//! Every stage watches the same [`CancelFlag`].

use crate::{
    config::MotionConfig,
    error::{Halt, MotionError, Result},
    geometry::Point,
    planner::Planner,
    step::{StepTick, TickSink},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

/// Run-wide stop request shared by every stage.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of a planning stage that ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanReport {
    pub points: u64,
    pub ticks: u64,
    /// Set when the run stopped early
    pub halted: Option<Halt>,
    /// Planned position when the stage stopped, relative to the run start
    pub final_position: Point,
    /// Net steps per axis since the run start
    pub net_steps: (i64, i64),
}

pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(capacity)
}

/// Mirror a point about the run start.
pub fn flip(mut point: Point, flip_x: bool, flip_y: bool) -> Point {
    if flip_x {
        point.x = -point.x;
    }
    if flip_y {
        point.y = -point.y;
    }
    point
}

/// Feed `points` into `tx` from a blocking thread.
///
/// Resolves to the number of points sent.
pub fn spawn_source<I>(points: I, tx: Sender<Point>, cancel: CancelFlag) -> JoinHandle<u64>
where
    I: IntoIterator<Item = Point> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut sent = 0;
        for point in points {
            if cancel.is_cancelled() {
                debug!(sent, "source cancelled");
                break;
            }
            if tx.blocking_send(point).is_err() {
                debug!(sent, "source output closed");
                break;
            }
            sent += 1;
        }
        sent
    })
}

pub fn spawn_flip(
    flip_x: bool,
    flip_y: bool,
    mut rx: Receiver<Point>,
    tx: Sender<Point>,
    cancel: CancelFlag,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(point) = rx.recv().await {
            if cancel.is_cancelled() {
                break;
            }
            if tx.send(flip(point, flip_x, flip_y)).await.is_err() {
                break;
            }
        }
    })
}

/// Run the planner on a blocking thread, reading points from `rx` and
/// writing ticks to `tx`.
///
/// Cancellation and a closed output end the stage with a [`PlanReport`]
/// whose `halted` is set. Any other error is returned and raises `cancel`
/// so the remaining stages wind down.
pub fn spawn_planner(
    config: MotionConfig,
    mut rx: Receiver<Point>,
    tx: Sender<StepTick>,
    cancel: CancelFlag,
) -> JoinHandle<Result<PlanReport>> {
    tokio::task::spawn_blocking(move || {
        let result = plan_stream(&config, &mut rx, tx, &cancel);
        if let Err(err) = &result {
            error!(%err, "planning failed");
            cancel.cancel();
        }
        result
    })
}

struct ChannelSink {
    tx: Sender<StepTick>,
}

impl TickSink for ChannelSink {
    fn emit(&mut self, tick: StepTick) -> Result<()> {
        self.tx
            .blocking_send(tick)
            .map_err(|_| MotionError::Halted(Halt::OutputClosed))
    }
}

fn plan_stream(
    config: &MotionConfig,
    rx: &mut Receiver<Point>,
    tx: Sender<StepTick>,
    cancel: &CancelFlag,
) -> Result<PlanReport> {
    let mut planner = Planner::new(config)?.with_cancel(cancel.clone());
    let mut sink = ChannelSink { tx };

    let halted = match drive(&mut planner, rx, &mut sink) {
        Ok(()) => None,
        Err(MotionError::Halted(halt)) => {
            warn!(%halt, ticks = planner.ticks(), "planning halted");
            Some(halt)
        }
        Err(err) => return Err(err),
    };

    Ok(PlanReport {
        points: planner.points(),
        ticks: planner.ticks(),
        halted,
        final_position: planner.position(),
        net_steps: planner.net_steps(),
    })
}

fn drive(planner: &mut Planner, rx: &mut Receiver<Point>, sink: &mut ChannelSink) -> Result<()> {
    while let Some(point) = rx.blocking_recv() {
        planner.push(point, sink)?;
    }
    planner.finish(sink)
}
