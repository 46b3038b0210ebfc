use polarplot::{
    cli::draw::{Output, Pattern, draw},
    patterns,
    sinks::CHART_HEADER,
};
use polarplot_core::{CancelFlag, Halt, MotionConfig, MotionError, Point};

fn chart_rows(text: &str) -> Vec<Vec<f64>> {
    text.lines()
        .skip(1)
        .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
        .collect()
}

#[tokio::test]
async fn chart_respects_motion_limits() {
    let motion = MotionConfig::default();
    let points = Pattern::Hilbert {
        size: 40.0,
        degree: 2,
    }
    .points(&motion)
    .unwrap();

    let mut out = Vec::new();
    let summary = draw(
        &motion,
        points,
        false,
        false,
        Output::Chart,
        &mut out,
        CancelFlag::new(),
    )
    .await
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(CHART_HEADER));
    let rows = chart_rows(&text);
    assert_eq!(rows.len() as u64, summary.written);
    assert_eq!(summary.plan.points, 8 * 8 + 1);
    assert_eq!(summary.plan.net_steps, (0, 0));

    let dt = motion.tick_secs();
    let dv = motion.accel_mm_s2 * dt;
    // positions are rounded to 1e-4 mm, which blurs each speed by up to this much
    let rounding = 2.0 * 1e-4 / dt;
    let mut prev = Point::ORIGIN;
    let mut prev_speed = 0.0;
    for row in &rows {
        let position = Point::new(row[1], row[2]);
        let speed = prev.distance(&position) / dt;
        assert!(speed <= motion.max_speed_mm_s + rounding);
        assert!((row[3] - speed).abs() <= rounding, "{} vs {speed}", row[3]);
        assert!((speed - prev_speed).abs() <= dv + 2.0 * rounding, "{prev_speed} -> {speed}");
        prev = position;
        prev_speed = speed;
    }
}

#[tokio::test]
async fn flipped_run_mirrors_positions() {
    let motion = MotionConfig::default();
    let mut plain = Vec::new();
    let mut flipped = Vec::new();

    for (flip, out) in [(false, &mut plain), (true, &mut flipped)] {
        draw(
            &motion,
            Box::new(patterns::fixture().into_iter()),
            flip,
            flip,
            Output::Chart,
            out,
            CancelFlag::new(),
        )
        .await
        .unwrap();
    }

    let plain = chart_rows(&String::from_utf8(plain).unwrap());
    let flipped = chart_rows(&String::from_utf8(flipped).unwrap());
    assert_eq!(plain.len(), flipped.len());
    for (a, b) in plain.iter().zip(&flipped) {
        assert_eq!(a[1], -b[1]);
        assert_eq!(a[2], -b[2]);
        assert_eq!(a[6], b[6]);
    }
}

#[tokio::test]
async fn count_output_reports_totals() {
    let motion = MotionConfig::default();
    let mut out = Vec::new();
    let summary = draw(
        &motion,
        Pattern::Grid {
            width: 50.0,
            cells: 5,
        }
        .points(&motion)
        .unwrap(),
        false,
        false,
        Output::Count,
        &mut out,
        CancelFlag::new(),
    )
    .await
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("ticks: {}\n", summary.written)));
    assert!(summary.plan.halted.is_none());
}

#[tokio::test]
async fn unreachable_pattern_fails_the_run() {
    let motion = MotionConfig::default();
    let points = vec![Point::new(10.0, 0.0), Point::new(10.0, -1000.0)];
    let err = draw(
        &motion,
        Box::new(points.into_iter()),
        false,
        false,
        Output::File,
        Vec::new(),
        CancelFlag::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MotionError>(),
        Some(MotionError::Geometry(_))
    ));
}

#[tokio::test]
async fn cancelled_run_is_not_an_error() {
    let motion = MotionConfig::default();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let summary = draw(
        &motion,
        Box::new(patterns::spiral(50.0, 2.0, 0.5)),
        false,
        false,
        Output::File,
        Vec::new(),
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(summary.written, 0);
    assert_ne!(summary.plan.halted, Some(Halt::OutputClosed));
}
