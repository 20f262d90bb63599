//! Summary extraction from a locust-format `*_stats.csv`.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::{failure_rate, StatSummary, AGGREGATE_ROW_NAME};
use crate::error::ExtractError;

#[derive(Debug, Deserialize)]
struct StatsCsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Request Count")]
    request_count: u64,
    #[serde(rename = "Failure Count")]
    failure_count: u64,
    #[serde(rename = "Average Response Time")]
    average: f64,
    #[serde(rename = "Median Response Time")]
    median: f64,
    #[serde(rename = "Min Response Time")]
    min: f64,
    #[serde(rename = "Max Response Time")]
    max: f64,
    #[serde(rename = "Requests/s")]
    requests_per_second: f64,
    #[serde(rename = "90%", deserialize_with = "percentile_cell")]
    p90: f64,
    #[serde(rename = "95%", deserialize_with = "percentile_cell")]
    p95: f64,
    #[serde(rename = "99%", deserialize_with = "percentile_cell")]
    p99: f64,
}

/// Locust writes `N/A` for percentiles of endpoints that saw no samples.
fn percentile_cell<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("N/A") {
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Read the first non-aggregate row of a stats file.
pub fn read_stat_summary(path: impl AsRef<Path>) -> Result<StatSummary, ExtractError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| ExtractError::parse(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| ExtractError::parse(path, e))?
        .clone();
    let name_idx = headers
        .iter()
        .position(|h| h == "Name")
        .ok_or_else(|| ExtractError::parse(path, "missing column `Name`"))?;

    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::parse(path, e))?;
        if record.get(name_idx) == Some(AGGREGATE_ROW_NAME) {
            continue;
        }

        let row: StatsCsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| ExtractError::parse(path, e))?;
        return summary_from_row(path, row);
    }

    Err(ExtractError::NoDataRow(path.to_path_buf()))
}

fn summary_from_row(path: &Path, row: StatsCsvRow) -> Result<StatSummary, ExtractError> {
    if row.failure_count > row.request_count {
        return Err(ExtractError::parse(
            path,
            format!(
                "failure count {} exceeds request count {}",
                row.failure_count, row.request_count
            ),
        ));
    }

    Ok(StatSummary {
        failure_rate: failure_rate(row.request_count, row.failure_count),
        endpoint: row.name,
        requests: row.request_count,
        failures: row.failure_count,
        avg_response_time: row.average,
        median_response_time: row.median,
        min_response_time: row.min,
        max_response_time: row.max,
        requests_per_second: row.requests_per_second,
        percentile_90: row.p90,
        percentile_95: row.p95,
        percentile_99: row.p99,
    })
}
