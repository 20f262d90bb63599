pub mod export;

use serde::{Deserialize, Serialize};

pub use export::{write_failures_csv, write_history_csv, write_reports, write_stats_csv};

/// Percentile columns of the stats file: (fraction, header label).
pub const PERCENTILES: [(f64, &str); 11] = [
    (0.50, "50%"),
    (0.66, "66%"),
    (0.75, "75%"),
    (0.80, "80%"),
    (0.90, "90%"),
    (0.95, "95%"),
    (0.98, "98%"),
    (0.99, "99%"),
    (0.999, "99.9%"),
    (0.9999, "99.99%"),
    (1.0, "100%"),
];

/// One row of `<prefix>_stats.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatsRow {
    /// HTTP method; empty on the aggregate row.
    pub method: String,
    pub name: String,
    pub request_count: u64,
    pub failure_count: u64,
    pub median_ms: u64,
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub average_content_size: f64,
    pub requests_per_second: f64,
    pub failures_per_second: f64,
    /// One entry per [`PERCENTILES`] column; `None` when there were no samples.
    pub percentiles: Vec<Option<u64>>,
}

/// One row of `<prefix>_stats_history.csv`, always for the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryRow {
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub user_count: u32,
    pub name: String,
    pub requests_per_second: f64,
    pub failures_per_second: f64,
    pub total_request_count: u64,
    pub total_failure_count: u64,
    pub total_median_ms: u64,
    pub total_average_ms: f64,
    pub total_min_ms: u64,
    pub total_max_ms: u64,
}

/// One row of `<prefix>_failures.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FailureRow {
    pub method: String,
    pub name: String,
    pub error: String,
    pub occurrences: u64,
}

/// Everything a finished load test produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadTestReport {
    pub stats: Vec<StatsRow>,
    pub history: Vec<HistoryRow>,
    pub failures: Vec<FailureRow>,
}

impl LoadTestReport {
    /// The trailing aggregate row, if any.
    pub fn aggregate(&self) -> Option<&StatsRow> {
        self.stats.last()
    }
}
