//! Two-panel time-series chart: average response time and requests/s for
//! both systems over a shared time axis.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;

use super::render::SystemLabels;
use super::{HistoryPoint, HistorySeries};
use crate::error::ApiloadError;

const CANVAS: (u32, u32) = (1000, 1200);
const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
const LEFT_COLOR: RGBColor = BLUE;
const RIGHT_COLOR: RGBColor = RED;

struct Panel {
    title: &'static str,
    y_desc: &'static str,
    value: fn(&HistoryPoint) -> f64,
}

const PANELS: [Panel; 2] = [
    Panel {
        title: "Average Response Time Over Time",
        y_desc: "Response Time (ms)",
        value: avg_response_time,
    },
    Panel {
        title: "Requests per Second Over Time",
        y_desc: "Requests/s",
        value: requests_per_second,
    },
];

fn avg_response_time(p: &HistoryPoint) -> f64 {
    p.total_avg_response_time
}

fn requests_per_second(p: &HistoryPoint) -> f64 {
    p.requests_per_second
}

/// Render both series to `path`.
///
/// Returns `Ok(None)` when either series is absent. Files ending in `.svg`
/// are written as SVG; anything else is encoded as PNG.
pub fn plot_comparison(
    left: Option<&HistorySeries>,
    right: Option<&HistorySeries>,
    labels: &SystemLabels,
    path: impl AsRef<Path>,
) -> Result<Option<PathBuf>, ApiloadError> {
    let (Some(left), Some(right)) = (left, right) else {
        tracing::error!("Missing history data for plotting");
        return Ok(None);
    };
    let path = path.as_ref();
    ensure_font()?;
    let axis = TimeAxis::spanning(left, right);

    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let drawn = if is_svg {
        let root = SVGBackend::new(path, CANVAS).into_drawing_area();
        draw_panels(&root, left, right, labels, &axis).map_err(|e| e.to_string())
    } else {
        let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
        draw_panels(&root, left, right, labels, &axis).map_err(|e| e.to_string())
    };
    drawn.map_err(|e| ApiloadError::Plot(format!("{}: {e}", path.display())))?;

    tracing::debug!("wrote comparison chart to {}", path.display());
    Ok(Some(path.to_path_buf()))
}

/// Text layout and rasterisation need a registered face; the bundled one is
/// installed under the family name every chart element uses.
fn ensure_font() -> Result<(), ApiloadError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if registered {
        Ok(())
    } else {
        Err(ApiloadError::Plot("bundled chart font could not be loaded".to_string()))
    }
}

/// Maps timestamps onto seconds since the earliest bucket of either series.
struct TimeAxis {
    origin: DateTime<Utc>,
    span: f64,
}

impl TimeAxis {
    fn spanning(left: &HistorySeries, right: &HistorySeries) -> Self {
        let stamps = || left.iter().chain(right.iter()).map(|p| p.timestamp);
        let origin = stamps().min().unwrap_or_else(Utc::now);
        let end = stamps().max().unwrap_or(origin);
        let span = (end - origin).num_milliseconds() as f64 / 1000.0;
        Self {
            origin,
            span: if span > 0.0 { span } else { 1.0 },
        }
    }

    fn offset(&self, ts: DateTime<Utc>) -> f64 {
        (ts - self.origin).num_milliseconds() as f64 / 1000.0
    }

    fn label(&self, secs: f64) -> String {
        let ts = self.origin + chrono::Duration::milliseconds((secs * 1000.0) as i64);
        ts.format("%H:%M:%S").to_string()
    }
}

fn draw_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    left: &HistorySeries,
    right: &HistorySeries,
    labels: &SystemLabels,
    axis: &TimeAxis,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let areas = root.split_evenly((PANELS.len(), 1));

    for (area, panel) in areas.iter().zip(PANELS.iter()) {
        let y_max = left
            .iter()
            .chain(right.iter())
            .map(panel.value)
            .fold(0.0_f64, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

        let mut chart = ChartBuilder::on(area)
            .caption(panel.title, (FONT_FAMILY, 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..axis.span, 0.0..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc(panel.y_desc)
            .x_label_formatter(&|secs: &f64| axis.label(*secs))
            .draw()?;

        for (series, name, color) in [
            (left, labels.left.as_str(), LEFT_COLOR),
            (right, labels.right.as_str(), RIGHT_COLOR),
        ] {
            let points = series.iter().map(|p| (axis.offset(p.timestamp), (panel.value)(p)));
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))?
                .label(name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: i64, values: &[(f64, f64)]) -> HistorySeries {
        values
            .iter()
            .enumerate()
            .map(|(i, &(avg, rps))| HistoryPoint {
                timestamp: DateTime::from_timestamp(start + i as i64, 0).unwrap(),
                total_avg_response_time: avg,
                requests_per_second: rps,
            })
            .collect()
    }

    fn labels() -> SystemLabels {
        SystemLabels::new("OpenAI", "Hugging Face")
    }

    #[test]
    fn absent_series_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let s = series(0, &[(1.0, 1.0)]);
        assert!(plot_comparison(None, Some(&s), &labels(), &path).unwrap().is_none());
        assert!(plot_comparison(Some(&s), None, &labels(), &path).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn writes_svg_with_titles_and_legend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance_comparison.svg");
        let left = series(1_700_000_000, &[(120.0, 2.0), (130.0, 3.0), (125.0, 2.5)]);
        let right = series(1_700_000_001, &[(300.0, 1.0), (280.0, 1.5)]);

        let written = plot_comparison(Some(&left), Some(&right), &labels(), &path)
            .unwrap()
            .expect("chart path");
        assert_eq!(written, path);

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Average Response Time Over Time"));
        assert!(svg.contains("Requests per Second Over Time"));
        assert!(svg.contains("Hugging Face"));
    }

    #[test]
    fn writes_png_for_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance_comparison.png");
        let left = series(10, &[(100.0, 1.0), (110.0, 2.0)]);
        let right = series(10, &[(90.0, 1.0)]);
        plot_comparison(Some(&left), Some(&right), &labels(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn empty_series_still_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        let empty = HistorySeries::new();
        assert!(plot_comparison(Some(&empty), Some(&empty), &labels(), &path)
            .unwrap()
            .is_some());
    }

    #[test]
    fn missing_output_directory_is_plot_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("chart.png");
        let s = series(0, &[(1.0, 1.0)]);
        let err = plot_comparison(Some(&s), Some(&s), &labels(), &path).unwrap_err();
        assert!(matches!(err, ApiloadError::Plot(_)));
    }

    #[test]
    fn bundled_font_lays_out_text() {
        ensure_font().unwrap();
        let (w, h) = (FONT_FAMILY, 24).into_font().box_size("Requests/s").unwrap();
        assert!(w > 0 && h > 0);
    }

    #[test]
    fn time_axis_starts_at_earliest_bucket() {
        let left = series(100, &[(1.0, 1.0), (1.0, 1.0)]);
        let right = series(95, &[(1.0, 1.0)]);
        let axis = TimeAxis::spanning(&left, &right);
        assert_eq!(axis.offset(DateTime::from_timestamp(95, 0).unwrap()), 0.0);
        assert_eq!(axis.span, 6.0);
    }

    #[test]
    fn single_instant_gets_nonzero_span() {
        let s = series(5, &[(1.0, 1.0)]);
        let axis = TimeAxis::spanning(&s, &s);
        assert_eq!(axis.span, 1.0);
    }
}
