use super::next_tick;
use anyhow::Result;
use polarplot_core::{CancelFlag, StepTick};
use std::{fmt, time::Duration};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc::Receiver,
};

/// Totals over a tick stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCount {
    pub ticks: u64,
    /// Sum of step magnitudes on the left spool
    pub left_steps: u64,
    pub right_steps: u64,
    pub pen_down_ticks: u64,
    pub tick_period: Duration,
}

impl StepCount {
    pub fn new(tick_period: Duration) -> Self {
        Self {
            tick_period,
            ..Self::default()
        }
    }

    pub fn record(&mut self, tick: &StepTick) {
        self.ticks += 1;
        self.left_steps += u64::from(tick.left.unsigned_abs());
        self.right_steps += u64::from(tick.right.unsigned_abs());
        if !tick.pen_up {
            self.pen_down_ticks += 1;
        }
    }

    /// Time the machine needs to play the counted ticks.
    pub fn draw_time(&self) -> Duration {
        Duration::from_secs_f64(self.tick_period.as_secs_f64() * self.ticks as f64)
    }
}

impl fmt::Display for StepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks: {}", self.ticks)?;
        writeln!(f, "left steps: {}", self.left_steps)?;
        writeln!(f, "right steps: {}", self.right_steps)?;
        writeln!(f, "pen down ticks: {}", self.pen_down_ticks)?;
        writeln!(f, "draw time: {:.2}s", self.draw_time().as_secs_f64())
    }
}

/// Count the ticks and write a summary to `out` once the stream ends.
pub async fn count_steps<W>(
    mut rx: Receiver<StepTick>,
    mut out: W,
    tick_period: Duration,
    cancel: CancelFlag,
) -> Result<StepCount>
where
    W: AsyncWrite + Unpin,
{
    let mut count = StepCount::new(tick_period);
    while let Some(tick) = next_tick(&mut rx, &cancel).await {
        count.record(&tick);
    }
    out.write_all(count.to_string().as_bytes()).await?;
    out.flush().await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::test_util::{queue, tick};

    #[tokio::test]
    async fn counts_step_magnitudes() {
        let rx = queue(&[tick(3, -2, false), tick(-4, 0, true), tick(1, 1, false)]);
        let mut out = Vec::new();
        let count = count_steps(rx, &mut out, Duration::from_millis(2), CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(count.ticks, 3);
        assert_eq!(count.left_steps, 8);
        assert_eq!(count.right_steps, 3);
        assert_eq!(count.pen_down_ticks, 2);
        assert_eq!(count.draw_time(), Duration::from_millis(6));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ticks: 3\n"));
        assert!(text.contains("draw time: 0.01s"));
    }

    #[tokio::test]
    async fn cancelled_count_stops_early() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let rx = queue(&[tick(1, 1, false)]);
        let count = count_steps(rx, Vec::new(), Duration::from_millis(2), cancel)
            .await
            .unwrap();
        assert_eq!(count.ticks, 0);
    }
}
