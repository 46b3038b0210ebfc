use super::next_tick;
use anyhow::Result;
use polarplot_core::{CancelFlag, StepTick};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc::Receiver,
};

/// Write one `left right pen_up` line per tick. Returns the number of lines.
pub async fn write_steps<W>(mut rx: Receiver<StepTick>, out: W, cancel: CancelFlag) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut out = BufWriter::new(out);
    let mut written = 0;
    while let Some(tick) = next_tick(&mut rx, &cancel).await {
        let line = format!("{} {} {}\n", tick.left, tick.right, u8::from(tick.pen_up));
        out.write_all(line.as_bytes()).await?;
        written += 1;
    }
    out.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::test_util::{queue, tick};

    #[tokio::test]
    async fn one_line_per_tick() {
        let rx = queue(&[tick(12, -7, false), tick(0, 3, true)]);
        let mut out = Vec::new();
        let written = write_steps(rx, &mut out, CancelFlag::new()).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "12 -7 0\n0 3 1\n");
    }

    #[tokio::test]
    async fn writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.txt");
        let file = tokio::fs::File::create(&path).await.unwrap();

        write_steps(queue(&[tick(1, 2, false)]), file, CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 2 0\n");
    }
}
