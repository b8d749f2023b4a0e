use std::path::Path;

use anyhow::bail;
use plotters::prelude::*;

use crate::report::ScoreSummary;

const BIN_COUNT: usize = 20;
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;

/// Renders the score distribution as a 20-bin histogram with mean and median
/// reference lines. Reporting artifact only; the scores themselves are
/// already on disk by the time this runs.
pub fn render_histogram(
    path: &Path,
    scores: &[f64],
    summary: &ScoreSummary,
) -> anyhow::Result<()> {
    if scores.is_empty() {
        bail!("no graded scores to plot");
    }

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // All-identical scores still need a nonzero axis span.
    let span = if max > min { max - min } else { 1.0 };
    let bin_width = span / BIN_COUNT as f64;

    let mut counts = vec![0u32; BIN_COUNT];
    for &score in scores {
        let mut bin = ((score - min) / bin_width) as usize;
        if bin >= BIN_COUNT {
            bin = BIN_COUNT - 1;
        }
        counts[bin] += 1;
    }
    let y_top = counts.iter().copied().max().unwrap_or(1) + 1;

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Distribution of Peer Evaluation Scores",
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(45)
        .build_cartesian_2d(min..(min + span), 0u32..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Peer evaluation score")
        .y_desc("Count")
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(bin, &count)| {
        let x0 = min + bin_width * bin as f64;
        let x1 = x0 + bin_width;
        Rectangle::new([(x0, 0), (x1, count)], BLUE.mix(0.5).filled())
    }))?;

    chart
        .draw_series(LineSeries::new(
            vec![(summary.mean, 0), (summary.mean, y_top)],
            RED.stroke_width(2),
        ))?
        .label(format!("mean {:.2}", summary.mean))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            vec![(summary.median, 0), (summary.median, y_top)],
            GREEN.stroke_width(2),
        ))?
        .label(format!("median {:.2}", summary.median))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
