use crate::{
    cli::{nonzero, positive},
    config::{Config, DEFAULT_CONFIG_PATH},
    patterns::{self, BouncingLine, PointStream},
    sinks,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use polarplot_core::{CancelFlag, MotionConfig, PlanReport, pipeline};
use std::path::PathBuf;
use tokio::{fs::File, io::AsyncWrite, task::JoinHandle};
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct DrawArgs {
    /// Path to the configuration file (TOML or JSON).
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Where the step stream goes.
    #[arg(long, value_enum, default_value_t = Output::Serial)]
    pub output: Output,

    /// Output file for count, file and chart output. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Serial device, overriding the configuration.
    #[arg(long)]
    pub device: Option<String>,

    /// Divide maximum speed and acceleration by this factor.
    #[arg(long, default_value_t = 1.0)]
    pub slow_factor: f64,

    /// Mirror the drawing left to right.
    #[arg(long)]
    pub flip_x: bool,

    /// Mirror the drawing top to bottom.
    #[arg(long)]
    pub flip_y: bool,

    #[command(subcommand)]
    pub pattern: Pattern,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Output {
    /// Print totals and the estimated drawing time
    Count,
    /// One `left right pen_up` line per tick
    File,
    /// CSV trace of position and speed
    Chart,
    /// Paced frames to the motor controller
    #[default]
    Serial,
}

/// Shapes the plotter can draw. Distances are millimetres, angles radians.
#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Pattern {
    /// Short test drawing with pen lifts
    Test,
    /// Inward spiral
    Spiral {
        /// Starting radius
        #[arg(value_parser = positive)]
        radius: f64,
        /// Radius lost per revolution
        #[arg(value_parser = positive)]
        pitch: f64,
    },
    /// Circles that slide sideways as they are drawn
    #[command(allow_negative_numbers = true)]
    Circle {
        #[arg(value_parser = positive)]
        radius: f64,
        /// Horizontal shift per circle
        #[arg(value_parser = nonzero)]
        displacement: f64,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Hilbert curve
    Hilbert {
        /// Side of the square
        #[arg(value_parser = positive)]
        size: f64,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        degree: u32,
    },
    /// Square grid
    Grid {
        #[arg(value_parser = positive)]
        width: f64,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        cells: u32,
    },
    /// Parabolic string art on a polygon
    Parabolic {
        #[arg(value_parser = positive)]
        radius: f64,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        edges: u32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        lines: u32,
    },
    /// Lissajous curve
    #[command(allow_negative_numbers = true)]
    Lissa {
        #[arg(value_parser = positive)]
        amplitude: f64,
        #[arg(value_parser = nonzero)]
        x_frequency: f64,
        #[arg(value_parser = nonzero)]
        y_frequency: f64,
    },
    /// Spirograph curve
    #[command(allow_negative_numbers = true)]
    Spiro {
        /// Radius of the fixed ring
        #[arg(value_parser = positive)]
        outer: f64,
        /// Radius of the rolling wheel
        #[arg(value_parser = positive)]
        inner: f64,
        /// Pen offset from the wheel centre
        #[arg(value_parser = nonzero)]
        pen: f64,
    },
    /// Line bouncing off the surface edges
    #[command(allow_negative_numbers = true)]
    Line {
        #[arg(value_parser = nonzero)]
        angle: f64,
        /// Total length in metres
        #[arg(value_parser = positive)]
        distance_m: f64,
    },
}

impl Pattern {
    pub fn points(&self, motion: &MotionConfig) -> Result<PointStream> {
        let near = patterns::sample_distance(motion, 4.0);
        let far = patterns::sample_distance(motion, 10.0);

        let points: PointStream = match *self {
            Pattern::Test => Box::new(patterns::fixture().into_iter()),
            Pattern::Spiral { radius, pitch } => Box::new(patterns::spiral(radius, pitch, near)),
            Pattern::Circle {
                radius,
                displacement,
                count,
            } => Box::new(patterns::sliding_circle(radius, displacement, count, near)),
            Pattern::Hilbert { size, degree } => Box::new(patterns::hilbert(size, degree)),
            Pattern::Grid { width, cells } => Box::new(patterns::grid(width, cells).into_iter()),
            Pattern::Parabolic {
                radius,
                edges,
                lines,
            } => Box::new(patterns::parabolic(radius, edges, lines).into_iter()),
            Pattern::Lissa {
                amplitude,
                x_frequency,
                y_frequency,
            } => Box::new(patterns::lissajous(amplitude, x_frequency, y_frequency, far)),
            Pattern::Spiro { outer, inner, pen } => {
                Box::new(patterns::spirograph(outer, inner, pen, far))
            }
            Pattern::Line { angle, distance_m } => {
                let start = motion.start_position()?;
                Box::new(BouncingLine::new(angle, distance_m, &motion.surface, start))
            }
        };
        Ok(points)
    }
}

/// Result of a finished `draw` run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSummary {
    pub plan: PlanReport,
    /// Ticks consumed by the output
    pub written: u64,
}

impl DrawArgs {
    pub fn run(&self) -> Result<()> {
        let mut config = Config::load(&self.config)?;
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        config.motion = config.motion.with_slow_factor(self.slow_factor)?;
        config.validate()?;

        info!(
            max_speed = config.motion.max_speed_mm_s,
            accel = config.motion.accel_mm_s2,
            pattern = ?self.pattern,
            "starting draw"
        );

        let points = self.pattern.points(&config.motion)?;
        execute(self, &config, points)
    }
}

#[tokio::main]
async fn execute(args: &DrawArgs, config: &Config, points: PointStream) -> Result<()> {
    let cancel = CancelFlag::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping the run");
            interrupt.cancel();
        }
    });

    let (out, port) = open_output(args, config).await?;
    let drawn = draw(
        &config.motion,
        points,
        args.flip_x,
        args.flip_y,
        args.output,
        out,
        cancel,
    )
    .await;

    // a port failure takes precedence over the broken pipe it causes
    if let Some(port) = port {
        port.await.context("serial writer task failed")??;
    }
    let summary = drawn?;

    if let Some(halt) = summary.plan.halted {
        info!(%halt, written = summary.written, "draw stopped");
    }
    Ok(())
}

type BoxedOutput = Box<dyn AsyncWrite + Unpin + Send>;
type PortTask = JoinHandle<Result<Box<dyn serialport::SerialPort>>>;

async fn open_output(
    args: &DrawArgs,
    config: &Config,
) -> Result<(BoxedOutput, Option<PortTask>)> {
    let opened: (BoxedOutput, Option<PortTask>) = match (args.output, &args.out) {
        (Output::Serial, _) => {
            let (stream, task) = sinks::bridge(sinks::open_port(&config.serial)?);
            (Box::new(stream), Some(task))
        }
        (_, Some(path)) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            (Box::new(file), None)
        }
        (_, None) => (Box::new(tokio::io::stdout()), None),
    };
    Ok(opened)
}

/// Run the staged pipeline from `points` to `out`.
///
/// A fatal planning error is returned in preference to the output error it
/// causes.
pub async fn draw<W>(
    motion: &MotionConfig,
    points: PointStream,
    flip_x: bool,
    flip_y: bool,
    output: Output,
    out: W,
    cancel: CancelFlag,
) -> Result<DrawSummary>
where
    W: AsyncWrite + Unpin,
{
    let capacity = motion.queue_capacity;
    let (point_tx, point_rx) = pipeline::channel(capacity);
    let source = pipeline::spawn_source(points, point_tx, cancel.clone());

    let point_rx = if flip_x || flip_y {
        let (flip_tx, flip_rx) = pipeline::channel(capacity);
        pipeline::spawn_flip(flip_x, flip_y, point_rx, flip_tx, cancel.clone());
        flip_rx
    } else {
        point_rx
    };

    let (tick_tx, tick_rx) = pipeline::channel(capacity);
    let planner = pipeline::spawn_planner(motion.clone(), point_rx, tick_tx, cancel.clone());

    let period = motion.tick_period();
    let written = match output {
        Output::Count => sinks::count_steps(tick_rx, out, period, cancel.clone())
            .await
            .map(|count| count.ticks),
        Output::File => sinks::write_steps(tick_rx, out, cancel.clone()).await,
        Output::Chart => sinks::write_chart(tick_rx, out, period, cancel.clone()).await,
        Output::Serial => sinks::write_serial(tick_rx, out, period, cancel.clone()).await,
    };
    if written.is_err() {
        cancel.cancel();
    }

    let plan = planner.await.context("planner task failed")??;
    let sent = source.await.context("point source failed")?;
    let written = written?;
    debug!(sent, written, "pipeline finished");

    match plan.halted {
        Some(halt) => warn!(%halt, ticks = plan.ticks, "run stopped early"),
        None => info!(points = plan.points, ticks = plan.ticks, "run complete"),
    }
    Ok(DrawSummary { plan, written })
}
