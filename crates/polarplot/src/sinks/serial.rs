// Paced frame writer for the motor controller

use super::next_tick;
use crate::config::SerialConfig;
use anyhow::{Context, Result};
use polarplot_core::{CancelFlag, StepTick};
use std::{io::Write, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream},
    runtime::Handle,
    sync::mpsc::Receiver,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

/// Bytes per tick on the wire: left steps, right steps, pen state.
pub const FRAME_LEN: usize = 3;

pub fn encode_frame(tick: &StepTick) -> Result<[u8; FRAME_LEN]> {
    let left = i8::try_from(tick.left)
        .with_context(|| format!("left step count {} does not fit a frame", tick.left))?;
    let right = i8::try_from(tick.right)
        .with_context(|| format!("right step count {} does not fit a frame", tick.right))?;
    Ok([left as u8, right as u8, u8::from(tick.pen_up)])
}

/// Frames buffered between the paced writer and the port.
const BRIDGE_FRAMES: usize = 16;

/// Open the controller's port with the configured line settings.
pub fn open_port(config: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>> {
    let port = config
        .builder()?
        .open()
        .with_context(|| format!("failed to open serial device {}", config.device))?;
    info!(
        device = %config.device,
        baud_rate = config.baud_rate,
        "serial port open"
    );
    Ok(port)
}

/// Hand a blocking writer to a blocking thread and return an async handle
/// to it.
///
/// Bytes written to the returned stream are copied to `port` in order. The
/// task ends when the stream is dropped and resolves to the port, or fails
/// on the first write error. Must be called from within a tokio runtime.
pub fn bridge<P>(mut port: P) -> (DuplexStream, JoinHandle<Result<P>>)
where
    P: Write + Send + 'static,
{
    let (writer, mut reader) = tokio::io::duplex(FRAME_LEN * BRIDGE_FRAMES);
    let handle = Handle::current();
    let task = tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; FRAME_LEN * BRIDGE_FRAMES];
        let mut total = 0u64;
        loop {
            let n = handle.block_on(reader.read(&mut buf))?;
            if n == 0 {
                break;
            }
            port.write_all(&buf[..n]).context("serial port write failed")?;
            port.flush().context("serial port flush failed")?;
            total += n as u64;
        }
        debug!(bytes = total, "serial bridge closed");
        Ok(port)
    });
    (writer, task)
}

/// Write one frame per tick, released at the control period.
///
/// Frames that fall behind schedule are sent back to back until the writer
/// has caught up.
pub async fn write_serial<W>(
    mut rx: Receiver<StepTick>,
    mut out: W,
    tick_period: Duration,
    cancel: CancelFlag,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut pacer = interval(tick_period);
    pacer.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let mut frames = 0;
    while let Some(tick) = next_tick(&mut rx, &cancel).await {
        let frame = encode_frame(&tick)?;
        pacer.tick().await;
        out.write_all(&frame).await.context("serial write failed")?;
        out.flush().await?;
        frames += 1;
    }
    debug!(frames, "serial output finished");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::test_util::{queue, tick};
    use tokio::time::Instant;

    #[test]
    fn frames_are_signed_bytes() {
        assert_eq!(encode_frame(&tick(5, -3, true)).unwrap(), [5, 0xfd, 1]);
        assert_eq!(encode_frame(&tick(-128, 127, false)).unwrap(), [0x80, 0x7f, 0]);
        assert!(encode_frame(&tick(200, 0, false)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_paced() {
        let ticks: Vec<StepTick> = (0..10).map(|i| tick(i, -i, i % 2 == 0)).collect();
        let period = Duration::from_micros(2048);
        let start = Instant::now();

        let mut out = Vec::new();
        let frames = write_serial(queue(&ticks), &mut out, period, CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(frames, 10);
        assert_eq!(out.len(), 10 * FRAME_LEN);
        assert_eq!(&out[3..6], &[1, 0xff, 0]);
        assert!(start.elapsed() >= period * 9);
    }

    #[tokio::test]
    async fn bridge_forwards_frames_in_order() {
        let ticks: Vec<StepTick> = (0..40).map(|i| tick(i, 1 - i, i % 3 == 0)).collect();
        let (stream, port) = bridge(Vec::new());

        let frames = write_serial(
            queue(&ticks),
            stream,
            Duration::from_micros(1),
            CancelFlag::new(),
        )
        .await
        .unwrap();
        let written = port.await.unwrap().unwrap();

        assert_eq!(frames, 40);
        assert_eq!(written.len(), 40 * FRAME_LEN);
        let expected: Vec<u8> = ticks
            .iter()
            .flat_map(|t| encode_frame(t).unwrap())
            .collect();
        assert_eq!(written, expected);
    }

    #[derive(Debug)]
    struct Unplugged;

    impl Write for Unplugged {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn bridge_reports_port_errors() {
        let ticks: Vec<StepTick> = (0..200).map(|i| tick(i % 5, 0, false)).collect();
        let (stream, port) = bridge(Unplugged);

        let sent = write_serial(
            queue(&ticks),
            stream,
            Duration::from_micros(1),
            CancelFlag::new(),
        )
        .await;
        assert!(sent.is_err());

        let err = port.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("serial port write failed"), "{err}");
    }

    #[tokio::test]
    async fn out_of_range_tick_fails() {
        let err = write_serial(
            queue(&[tick(300, 0, false)]),
            Vec::new(),
            Duration::from_micros(10),
            CancelFlag::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }
}
