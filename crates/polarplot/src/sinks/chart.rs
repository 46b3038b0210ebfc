use super::next_tick;
use anyhow::Result;
use polarplot_core::{CancelFlag, StepTick};
use std::time::Duration;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc::Receiver,
};

pub const CHART_HEADER: &str = "time_s,x_mm,y_mm,speed_mm_s,left,right,pen_up\n";

/// Write a CSV trace of position and speed, one row per tick.
pub async fn write_chart<W>(
    mut rx: Receiver<StepTick>,
    out: W,
    tick_period: Duration,
    cancel: CancelFlag,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let dt = tick_period.as_secs_f64();
    let mut out = BufWriter::new(out);
    out.write_all(CHART_HEADER.as_bytes()).await?;

    let mut rows = 0u64;
    while let Some(tick) = next_tick(&mut rx, &cancel).await {
        rows += 1;
        let row = format!(
            "{:.6},{:.4},{:.4},{:.4},{},{},{}\n",
            rows as f64 * dt,
            tick.x,
            tick.y,
            tick.speed,
            tick.left,
            tick.right,
            u8::from(tick.pen_up)
        );
        out.write_all(row.as_bytes()).await?;
    }
    out.flush().await?;
    Ok(rows)
}
