//! Consumers of the planner's tick stream.
//!
//! Each sink drains a tick queue into an [`tokio::io::AsyncWrite`] and stops
//! when the queue closes or the run is cancelled.

mod chart;
mod count;
mod file;
mod serial;

pub use chart::{CHART_HEADER, write_chart};
pub use count::{StepCount, count_steps};
pub use file::write_steps;
pub use serial::{FRAME_LEN, bridge, encode_frame, open_port, write_serial};

use polarplot_core::{CancelFlag, StepTick};
use tokio::sync::mpsc::Receiver;

async fn next_tick(rx: &mut Receiver<StepTick>, cancel: &CancelFlag) -> Option<StepTick> {
    if cancel.is_cancelled() {
        return None;
    }
    rx.recv().await
}

#[cfg(test)]
pub(crate) mod test_util {
    use polarplot_core::StepTick;
    use tokio::sync::mpsc::{self, Receiver};

    /// A closed queue pre-filled with `ticks`.
    pub fn queue(ticks: &[StepTick]) -> Receiver<StepTick> {
        let (tx, rx) = mpsc::channel(ticks.len().max(1));
        for tick in ticks {
            tx.try_send(*tick).unwrap();
        }
        rx
    }

    pub fn tick(left: i32, right: i32, pen_up: bool) -> StepTick {
        StepTick {
            left,
            right,
            pen_up,
            ..StepTick::default()
        }
    }
}
