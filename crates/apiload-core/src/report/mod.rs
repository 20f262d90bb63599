pub mod driver;
pub mod history;
pub mod insights;
pub mod plot;
pub mod render;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use driver::{run_analysis, AnalysisConfig, AnalysisOutcome, SystemSpec};
pub use history::read_history;
pub use insights::{derive_insights, recommendations, Insights, Recommendation, Side};
pub use plot::plot_comparison;
pub use render::{report_comparison, ComparisonReport, SystemLabels};
pub use stats::read_stat_summary;

/// Name locust gives the synthetic totals row in its stats files.
pub const AGGREGATE_ROW_NAME: &str = "Aggregated";

/// Scalar metrics for one endpoint, read from a stats CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatSummary {
    pub endpoint: String,
    pub requests: u64,
    pub failures: u64,
    /// Percentage of failed requests; 0 when no requests were made.
    pub failure_rate: f64,
    pub avg_response_time: f64,
    pub median_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub requests_per_second: f64,
    pub percentile_90: f64,
    pub percentile_95: f64,
    pub percentile_99: f64,
}

impl StatSummary {
    /// p95 / median. Lower means more consistent latency; a zero median is
    /// treated as infinitely inconsistent.
    pub fn stability_ratio(&self) -> f64 {
        if self.median_response_time > 0.0 {
            self.percentile_95 / self.median_response_time
        } else {
            f64::INFINITY
        }
    }
}

/// `failures / requests * 100`, or 0 when there were no requests.
pub fn failure_rate(requests: u64, failures: u64) -> f64 {
    if requests > 0 {
        failures as f64 / requests as f64 * 100.0
    } else {
        0.0
    }
}

/// One retained time bucket from a history CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    /// Cumulative average response time up to this bucket (ms).
    pub total_avg_response_time: f64,
    pub requests_per_second: f64,
}

/// History buckets in file order, with zero-traffic buckets removed.
pub type HistorySeries = Vec<HistoryPoint>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_rate_zero_requests_is_exactly_zero() {
        assert_eq!(failure_rate(0, 0), 0.0);
    }

    #[test]
    fn failure_rate_is_percentage() {
        assert!((failure_rate(100, 5) - 5.0).abs() < 1e-9);
        assert!((failure_rate(3, 1) - 33.333_333).abs() < 1e-4);
        assert!((failure_rate(7, 7) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stability_ratio_divides_p95_by_median() {
        let mut s = fixtures::summary("/x", 100.0, 1.0);
        s.median_response_time = 200.0;
        s.percentile_95 = 500.0;
        assert!((s.stability_ratio() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn stability_ratio_zero_median_is_infinite() {
        let mut s = fixtures::summary("/x", 100.0, 1.0);
        s.median_response_time = 0.0;
        assert!(s.stability_ratio().is_infinite());
    }
}
