// crates/semdrift-analysis/src/chart.rs
//
// Two-panel SVG chart: corruption level vs cosine distance (left) and
// corruption level vs cosine similarity (right).

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use semdrift_core::{DistanceResult, DriftError};

use crate::report::ensure_parent;
use crate::statistics::regress;

const DISTANCE_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const SIMILARITY_COLOR: RGBColor = RGBColor(0x27, 0xae, 0x60);
const CHART_SIZE: (u32, u32) = (1400, 600);
const X_DESC: &str = "Spelling Error Percentage (%)";

/// Render the two-panel chart for a run to an SVG file.
pub fn to_chart(results: &[DistanceResult], path: &Path) -> Result<(), DriftError> {
    if results.is_empty() {
        return Err(DriftError::Render("no results to plot".to_string()));
    }
    ensure_parent(path)?;
    draw(results, path).map_err(|e| {
        DriftError::Render(format!("Failed to render chart {}: {}", path.display(), e))
    })?;
    tracing::info!("Wrote chart to {}", path.display());
    Ok(())
}

fn draw(results: &[DistanceResult], path: &Path) -> Result<(), Box<dyn Error>> {
    let mut sorted: Vec<&DistanceResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.corruption_level);

    let distances: Vec<(f64, f64)> = sorted
        .iter()
        .map(|r| (r.corruption_level as f64, r.cosine_distance))
        .collect();
    let similarities: Vec<(f64, f64)> = sorted
        .iter()
        .map(|r| (r.corruption_level as f64, r.cosine_similarity))
        .collect();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let x_range = padded_range(distances.iter().map(|p| p.0), 5.0);

    // Fitted line over the observed levels only.
    let trend = regress(results).ok().map(|reg| {
        let first = distances[0].0;
        let last = distances[distances.len() - 1].0;
        vec![(first, reg.predict(first)), (last, reg.predict(last))]
    });

    draw_panel(
        &panels[0],
        "Translation Chain: Error Impact on Semantic Distance",
        "Cosine Distance",
        &distances,
        x_range.clone(),
        DISTANCE_COLOR,
        trend,
    )?;
    draw_panel(
        &panels[1],
        "Translation Chain: Semantic Preservation",
        "Cosine Similarity",
        &similarities,
        x_range,
        SIMILARITY_COLOR,
        None,
    )?;

    root.present()?;
    Ok(())
}

fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    x_range: std::ops::Range<f64>,
    color: RGBColor,
    trend: Option<Vec<(f64, f64)>>,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let y_range = padded_range(points.iter().map(|p| p.1), 0.05);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(X_DESC)
        .y_desc(y_desc)
        .draw()?;

    if let Some(line) = trend {
        chart.draw_series(std::iter::once(PathElement::new(line, BLACK.mix(0.35))))?;
    }
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 5, color.filled())),
    )?;
    Ok(())
}

/// Data range widened by 10% on each side, or by `min_pad` when flat.
fn padded_range(values: impl Iterator<Item = f64>, min_pad: f64) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = ((hi - lo) * 0.1).max(min_pad);
    (lo - pad)..(hi + pad)
}
