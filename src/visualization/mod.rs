//! Visualization tools for scores and labeled photons.
//!
//! This module renders PNG images with the plotters library:
//! - grouped per-fold score bar charts
//! - score tables
//! - a 2x3 grid of per-dataset metric panels with mean lines
//! - along-track scatter plots of classified photons

use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::{PlotConfig, ViewerConfig};
use crate::core::loaders::LabeledPhoton;
use crate::core::writers::{ensure_parent_dirs, WriteError};
use crate::processors::summary::{FoldBars, MetricPanel, ScoreTable, CHART_METRICS};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Nothing to plot")]
    EmptyInput,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Series palette, one color per metric.
const SERIES_COLORS: &[(u8, u8, u8)] = &[
    (0, 143, 213),  // Blue
    (252, 79, 48),  // Red
    (229, 174, 56), // Yellow
    (109, 144, 79), // Green
    (139, 139, 139), // Gray
    (129, 15, 124), // Purple
];

/// Color for labels with no configured color.
const UNKNOWN_LABEL_COLOR: (u8, u8, u8) = (128, 128, 128);

/// Fraction of a group slot taken up by its bars.
const GROUP_WIDTH: f64 = 0.8;

fn font(size: f64, style: FontStyle) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, style)
}

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

fn series_color(index: usize) -> RGBColor {
    let c = SERIES_COLORS[index % SERIES_COLORS.len()];
    RGBColor(c.0, c.1, c.2)
}

/// Left and right x of bar `bar` out of `bars` in group `group`.
///
/// Groups are centered on integer x positions.
pub fn bar_span(group: usize, bar: usize, bars: usize) -> (f64, f64) {
    let width = GROUP_WIDTH / bars as f64;
    let left = group as f64 - GROUP_WIDTH / 2.0 + bar as f64 * width;
    (left, left + width)
}

/// Map an x key point to the label of the group centered on it.
fn group_label(x: f64, labels: &[String]) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// Plot a grouped bar chart of per-fold scores and save as PNG.
///
/// Each fold gets one bar per metric in [`CHART_METRICS`]; the y axis spans
/// `[0, 1]`.
pub fn plot_fold_summaries(
    output_path: &Path,
    groups: &[FoldBars],
    title: Option<&str>,
    config: &PlotConfig,
) -> Result<()> {
    if groups.is_empty() {
        return Err(VisualizationError::EmptyInput);
    }
    ensure_parent_dirs(output_path)?;

    let n = groups.len();
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();

    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60);
    if let Some(title) = title {
        builder.caption(title, font(28.0, FontStyle::Normal));
    }

    let mut chart = builder
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..1.0)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x: &f64| group_label(*x, &labels))
        .y_labels(11)
        .x_desc("fold number")
        .y_desc("score")
        .draw()
        .map_err(plot_err)?;

    let bars = CHART_METRICS.len();
    for (j, metric) in CHART_METRICS.iter().enumerate() {
        let color = series_color(j);
        chart
            .draw_series(groups.iter().enumerate().map(|(i, group)| {
                let (x0, x1) = bar_span(i, j, bars);
                let value = group.values.get(j).copied().unwrap_or(0.0);
                Rectangle::new([(x0, 0.0), (x1, value)], color.filled())
            }))
            .map_err(plot_err)?
            .label(metric.display_name())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;

    Ok(())
}

/// Render a score table as a PNG grid of centered cells.
pub fn render_score_table(
    output_path: &Path,
    table: &ScoreTable,
    title: Option<&str>,
    config: &PlotConfig,
) -> Result<()> {
    if table.rows.is_empty() {
        return Err(VisualizationError::EmptyInput);
    }
    ensure_parent_dirs(output_path)?;

    let cols = table.headers.len();
    let rows = table.rows.len() + 1;
    let font_size = config.font_size.max(8);
    let size = font_size as f64;
    let row_height = font_size * 2;
    let title_height = if title.is_some() { row_height } else { 0 };

    // Column widths from the longest cell, roughly 0.6 em per character.
    let char_width = (font_size as f64 * 0.6).ceil() as u32;
    let col_widths: Vec<u32> = (0..cols)
        .map(|c| {
            let longest = table
                .rows
                .iter()
                .map(|r| r[c].chars().count())
                .chain(std::iter::once(table.headers[c].chars().count()))
                .max()
                .unwrap_or(1);
            longest as u32 * char_width + 2 * font_size
        })
        .collect();

    let width = col_widths.iter().sum::<u32>() + 2 * font_size;
    let height = title_height + rows as u32 * row_height + 2 * font_size;

    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let margin = font_size as i32;
    let center = Pos::new(HPos::Center, VPos::Center);
    let cell_style = TextStyle::from(font(size, FontStyle::Normal)).pos(center);
    let header_style = TextStyle::from(font(size, FontStyle::Bold)).pos(center);

    if let Some(title) = title {
        root.draw(&Text::new(
            title.to_string(),
            (width as i32 / 2, margin + row_height as i32 / 2),
            TextStyle::from(font(size + 2.0, FontStyle::Normal)).pos(center),
        ))
        .map_err(plot_err)?;
    }

    let top = margin + title_height as i32;
    let right = margin + col_widths.iter().sum::<u32>() as i32;

    for r in 0..rows {
        let y = top + (r as u32 * row_height) as i32;
        let mut x = margin;

        if r == 0 {
            root.draw(&Rectangle::new(
                [(margin, y), (right, y + row_height as i32)],
                RGBColor(230, 230, 230).filled(),
            ))
            .map_err(plot_err)?;
        }

        for (c, &w) in col_widths.iter().enumerate() {
            let (text, style) = if r == 0 {
                (table.headers[c], &header_style)
            } else {
                (table.rows[r - 1][c].as_str(), &cell_style)
            };
            root.draw(&Text::new(
                text.to_string(),
                (x + w as i32 / 2, y + row_height as i32 / 2),
                style.clone(),
            ))
            .map_err(plot_err)?;
            root.draw(&Rectangle::new(
                [(x, y), (x + w as i32, y + row_height as i32)],
                BLACK.stroke_width(1),
            ))
            .map_err(plot_err)?;
            x += w as i32;
        }
    }

    root.present().map_err(plot_err)?;

    Ok(())
}

/// Plot a 2x3 grid of per-dataset metric panels and save as PNG.
///
/// Each panel shows one metric as bars sorted ascending, a horizontal line
/// at the mean and an `average=` annotation.
pub fn plot_metric_panels(
    output_path: &Path,
    panels: &[MetricPanel],
    title: Option<&str>,
    config: &PlotConfig,
) -> Result<()> {
    if panels.is_empty() || panels.iter().all(|p| p.values.is_empty()) {
        return Err(VisualizationError::EmptyInput);
    }
    ensure_parent_dirs(output_path)?;

    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let root = match title {
        Some(title) => root.titled(title, font(28.0, FontStyle::Normal)).map_err(plot_err)?,
        None => root,
    };

    let areas = root.split_evenly((2, 3));

    for (k, (area, panel)) in areas.iter().zip(panels).enumerate() {
        let color = series_color(k);
        let n = panel.values.len().max(1);

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(10)
            .y_label_area_size(55)
            .build_cartesian_2d(-1.0..(n as f64), 0.0..1.0)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_labels(11)
            .y_desc(panel.metric.display_name())
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(panel.values.iter().enumerate().map(|(i, &(_, value))| {
                let (x0, x1) = bar_span(i, 0, 1);
                Rectangle::new([(x0, 0.0), (x1, value)], color.filled())
            }))
            .map_err(plot_err)?;

        let mean_line = vec![(-1.0, panel.mean), (n as f64, panel.mean)];
        chart
            .draw_series(LineSeries::new(mean_line.clone(), BLACK.stroke_width(2)))
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(mean_line, color.stroke_width(1)))
            .map_err(plot_err)?;

        chart
            .draw_series(std::iter::once(Text::new(
                format!("average={:.2}", panel.mean),
                (0.0, (panel.mean - 0.05).max(0.02)),
                font(16.0, FontStyle::Normal).color(&BLACK),
            )))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;

    Ok(())
}

/// Compute the bounds (min/max) for x and y coordinates.
fn compute_bounds(photons: &[LabeledPhoton]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    for p in photons {
        if p.along_track_dist < x_min { x_min = p.along_track_dist; }
        if p.along_track_dist > x_max { x_max = p.along_track_dist; }
        if p.elevation < y_min { y_min = p.elevation; }
        if p.elevation > y_max { y_max = p.elevation; }
    }

    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}

/// Widen the y range so one meter spans the same pixels on both axes.
///
/// `pixels` is the approximate plotting area in pixels.
pub fn equal_aspect_y_range(
    x_range: (f64, f64),
    y_range: (f64, f64),
    pixels: (u32, u32),
) -> (f64, f64) {
    let meters_per_pixel = (x_range.1 - x_range.0) / pixels.0.max(1) as f64;
    let span = meters_per_pixel * pixels.1.max(1) as f64;
    let current = y_range.1 - y_range.0;
    if span <= current {
        return y_range;
    }
    let mid = (y_range.0 + y_range.1) / 2.0;
    (mid - span / 2.0, mid + span / 2.0)
}

/// Options for one segment scatter plot.
#[derive(Debug, Clone)]
pub struct SegmentPlot<'a> {
    /// Exclusive along-track bounds of the segment.
    pub x_range: (f64, f64),
    pub title: Option<&'a str>,
    /// Scale the y axis to match the x axis.
    pub equal_aspect: bool,
}

/// Plot classified photons of one segment, colored by label, and save as PNG.
///
/// Labels missing from the viewer config are drawn in gray and named by
/// their number in the legend.
pub fn plot_segment(
    output_path: &Path,
    photons: &[LabeledPhoton],
    options: &SegmentPlot<'_>,
    viewer: &ViewerConfig,
    plot: &PlotConfig,
) -> Result<()> {
    ensure_parent_dirs(output_path)?;

    let (x_min, x_max) = options.x_range;
    let (y_min, y_max) = if photons.is_empty() {
        (-1.0, 1.0)
    } else {
        let (_, _, y0, y1) = compute_bounds(photons);
        let pad = (y1 - y0) * 0.05;
        (y0 - pad, y1 + pad)
    };
    let (y_min, y_max) = if options.equal_aspect {
        let plot_area = (
            plot.width.saturating_sub(100),
            plot.height.saturating_sub(100),
        );
        equal_aspect_y_range((x_min, x_max), (y_min, y_max), plot_area)
    } else {
        (y_min, y_max)
    };

    let root = BitMapBackend::new(output_path, (plot.width, plot.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60);
    if let Some(title) = options.title {
        builder.caption(title, font(24.0, FontStyle::Normal));
    }

    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Along-track distance (m)")
        .y_desc("Elevation (m)")
        .draw()
        .map_err(plot_err)?;

    let mut labels: Vec<i64> = photons.iter().map(|p| p.label).collect();
    labels.sort_unstable();
    labels.dedup();

    for label in labels {
        let color = viewer
            .label_colors
            .get(&label)
            .map(|c| RGBColor(c[0], c[1], c[2]))
            .unwrap_or(RGBColor(
                UNKNOWN_LABEL_COLOR.0,
                UNKNOWN_LABEL_COLOR.1,
                UNKNOWN_LABEL_COLOR.2,
            ));
        let name = viewer
            .label_names
            .get(&label)
            .cloned()
            .unwrap_or_else(|| label.to_string());
        let size = viewer.marker_size;

        chart
            .draw_series(
                photons
                    .iter()
                    .filter(|p| p.label == label)
                    .map(|p| Circle::new((p.along_track_dist, p.elevation), size, color.filled())),
            )
            .map_err(plot_err)?
            .label(name)
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::ScoreRow;
    use crate::processors::summary::{build_score_table, fold_bar_groups, metric_panels};
    use tempfile::tempdir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn small_plot() -> PlotConfig {
        PlotConfig {
            width: 640,
            height: 480,
            ..PlotConfig::default()
        }
    }

    fn score_rows() -> Vec<ScoreRow> {
        (0..3)
            .map(|i| {
                let base = 0.5 + i as f64 * 0.1;
                ScoreRow {
                    fold: Some(i as f64),
                    acc: base,
                    f1: base + 0.01,
                    f1_r0: base + 0.02,
                    wght_f1: base + 0.03,
                    wght_f1_r0: base + 0.04,
                    ba: base + 0.05,
                }
            })
            .collect()
    }

    /// A rendered chart must be a PNG on disk. Hosts without any system font
    /// cannot draw text; that surfaces as a plotting error and is reported
    /// instead of failing.
    fn assert_rendered(result: Result<()>, path: &Path) {
        match result {
            Ok(()) => {
                let bytes = std::fs::read(path).unwrap();
                assert!(bytes.starts_with(PNG_MAGIC), "{} is not a PNG", path.display());
            }
            Err(VisualizationError::PlottingError(msg)) => {
                eprintln!("rendering {} unavailable: {}", path.display(), msg);
            }
            Err(e) => panic!("unexpected error rendering {}: {}", path.display(), e),
        }
    }

    #[test]
    fn test_bar_span_centers_groups() {
        let bars = 5;
        let (left, _) = bar_span(2, 0, bars);
        let (_, right) = bar_span(2, bars - 1, bars);
        assert!((left - 1.6).abs() < 1e-12);
        assert!((right - 2.4).abs() < 1e-12);

        let (a0, a1) = bar_span(0, 1, bars);
        let (b0, _) = bar_span(0, 2, bars);
        assert!((a1 - b0).abs() < 1e-12);
        assert!(a0 < a1);
    }

    #[test]
    fn test_group_label() {
        let labels = vec!["0".to_string(), "1".to_string()];
        assert_eq!(group_label(1.0, &labels), "1");
        assert_eq!(group_label(0.5, &labels), "");
        assert_eq!(group_label(2.0, &labels), "");
        assert_eq!(group_label(-1.0, &labels), "");
    }

    #[test]
    fn test_equal_aspect_widens_y() {
        let (y0, y1) = equal_aspect_y_range((0.0, 1000.0), (-10.0, 10.0), (1000, 500));
        assert!((y0 + 250.0).abs() < 1e-9);
        assert!((y1 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_aspect_keeps_taller_range() {
        let range = equal_aspect_y_range((0.0, 10.0), (-50.0, 50.0), (1000, 500));
        assert_eq!(range, (-50.0, 50.0));
    }

    #[test]
    fn test_compute_bounds_degenerate() {
        let photons = vec![LabeledPhoton {
            along_track_dist: 5.0,
            elevation: 2.0,
            label: 0,
        }];
        assert_eq!(compute_bounds(&photons), (4.0, 6.0, 1.0, 3.0));
    }

    #[test]
    fn test_empty_inputs_rejected_before_drawing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let config = PlotConfig::default();

        assert!(matches!(
            plot_fold_summaries(&path, &[], None, &config),
            Err(VisualizationError::EmptyInput)
        ));
        assert!(matches!(
            plot_metric_panels(&path, &[], None, &config),
            Err(VisualizationError::EmptyInput)
        ));

        let table = ScoreTable {
            headers: vec!["Fold"],
            rows: Vec::new(),
        };
        assert!(matches!(
            render_score_table(&path, &table, None, &config),
            Err(VisualizationError::EmptyInput)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_render_fold_chart_and_table() {
        let dir = tempdir().unwrap();
        let rows = score_rows();

        let chart = dir.path().join("charts/folds.png");
        let groups = fold_bar_groups(&rows).unwrap();
        assert_rendered(
            plot_fold_summaries(&chart, &groups, Some("Fold scores"), &small_plot()),
            &chart,
        );

        let table_png = dir.path().join("table.png");
        let table = build_score_table(&rows).unwrap();
        assert_rendered(
            render_score_table(&table_png, &table, Some("Scores"), &small_plot()),
            &table_png,
        );
    }

    #[test]
    fn test_render_metric_panels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.png");
        let panels = metric_panels(&score_rows()).unwrap();

        assert_rendered(plot_metric_panels(&path, &panels, None, &small_plot()), &path);
    }

    #[test]
    fn test_render_segment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment.png");
        let points = [(1.0, 0.2, 41), (2.0, -3.0, 40), (3.0, -1.0, 45), (4.0, 5.0, 7)];
        let photons: Vec<LabeledPhoton> = points
            .iter()
            .map(|&(x, h, label)| LabeledPhoton {
                along_track_dist: x,
                elevation: h,
                label,
            })
            .collect();
        let options = SegmentPlot {
            x_range: (0.0, 10.0),
            title: Some("segment 0"),
            equal_aspect: true,
        };

        assert_rendered(
            plot_segment(&path, &photons, &options, &ViewerConfig::default(), &small_plot()),
            &path,
        );
    }
}
