// PNG charts for the report.
use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;

use crate::error::ReportError;
use crate::model::Trend;

fn chart_err(path: &Path) -> impl Fn(Box<dyn std::error::Error>) -> ReportError + '_ {
    move |e| ReportError::Chart {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Draws the favorite's yearly win share, with the fitted trend when given.
pub fn plot_favorite_trend(
    path: &Path,
    yearly: &[(i32, f64)],
    trend: Option<&Trend>,
) -> Result<(), ReportError> {
    draw_favorite_trend(path, yearly, trend).map_err(chart_err(path))
}

fn draw_favorite_trend(
    path: &Path,
    yearly: &[(i32, f64)],
    trend: Option<&Trend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let first = yearly.iter().map(|&(y, _)| y).min().unwrap_or(2000);
    let last = yearly.iter().map(|&(y, _)| y).max().unwrap_or(first).max(first + 1);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Favorite win share by year", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first..last, 0.0..100.0)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Favorite wins (%)")
        .draw()?;

    chart.draw_series(LineSeries::new(yearly.iter().copied(), &GREEN))?;
    chart.draw_series(
        yearly
            .iter()
            .map(|&(year, share)| Circle::new((year, share), 4, GREEN.filled())),
    )?;

    if let Some(trend) = trend {
        chart.draw_series(LineSeries::new(
            [(first, trend.predict(first)), (last, trend.predict(last))],
            BLACK.mix(0.6),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Histogram of winner-minus-loser age in one-year bins, with a zero line.
pub fn plot_age_difference(path: &Path, bins: &BTreeMap<i32, usize>) -> Result<(), ReportError> {
    draw_histogram(path, "Age difference (winner - loser)", "Years", bins, true)
        .map_err(chart_err(path))
}

/// Histogram of the winner's age in one-year bins.
pub fn plot_winner_age(path: &Path, bins: &BTreeMap<i32, usize>) -> Result<(), ReportError> {
    draw_histogram(path, "Winner age", "Age (years)", bins, false).map_err(chart_err(path))
}

fn draw_histogram(
    path: &Path,
    caption: &str,
    x_desc: &str,
    bins: &BTreeMap<i32, usize>,
    zero_line: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lo = bins.keys().next().copied().unwrap_or(0);
    let mut hi = bins.keys().next_back().copied().unwrap_or(0).saturating_add(1);
    if zero_line {
        lo = lo.min(-1);
        hi = hi.max(2);
    }
    // A bin at i32::MAX saturates `hi` onto `lo`.
    if hi <= lo {
        lo = hi.saturating_sub(1);
    }
    let tallest = bins.values().copied().max().unwrap_or(0).max(1);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0..tallest + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Fights")
        .draw()?;

    // Only occupied bins are drawn, however wide the axis.
    chart.draw_series(bins.iter().map(|(&b, &count)| {
        Rectangle::new(
            [(b, 0), (b.saturating_add(1), count)],
            RGBColor(255, 161, 90).mix(0.8).filled(),
        )
    }))?;

    if zero_line {
        chart.draw_series(LineSeries::new([(0, 0), (0, tallest + 1)], &BLACK))?;
    }

    root.present()?;
    Ok(())
}

/// Colour per finish method; anything else is grey.
fn finish_color(finish: &str) -> RGBColor {
    match finish {
        "KO/TKO" => RGBColor(255, 75, 75),
        "SUB" => RGBColor(255, 165, 0),
        "U-DEC" => RGBColor(0, 204, 150),
        "S-DEC" => RGBColor(171, 99, 250),
        "M-DEC" => RGBColor(25, 211, 243),
        _ => RGBColor(128, 128, 128),
    }
}

/// Scatter of the winner's strikes rate against takedown rate, coloured by
/// how the fight ended.
pub fn plot_style(path: &Path, points: &[(f64, f64, &str)]) -> Result<(), ReportError> {
    draw_style(path, points).map_err(chart_err(path))
}

fn draw_style(path: &Path, points: &[(f64, f64, &str)]) -> Result<(), Box<dyn std::error::Error>> {
    let max_x = points.iter().map(|p| p.0).fold(1.0_f64, f64::max) * 1.05;
    let max_y = points.iter().map(|p| p.1).fold(1.0_f64, f64::max) * 1.05;

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Winner style: strikes vs takedowns", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..max_x, 0.0..max_y)?;

    chart
        .configure_mesh()
        .x_desc("Significant strikes landed (avg)")
        .y_desc("Takedowns landed (avg)")
        .draw()?;

    chart.draw_series(points.iter().map(|&(x, y, finish)| {
        Circle::new((x, y), 4, finish_color(finish).mix(0.7).filled())
    }))?;

    root.present()?;
    Ok(())
}
