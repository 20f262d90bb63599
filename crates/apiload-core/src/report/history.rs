//! Time-series extraction from a locust-format `*_stats_history.csv`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{HistoryPoint, HistorySeries};
use crate::error::ExtractError;

#[derive(Debug, Deserialize)]
struct HistoryCsvRow {
    #[serde(rename = "Timestamp")]
    timestamp: f64,
    #[serde(rename = "Total Request Count")]
    total_request_count: u64,
    #[serde(rename = "Total Average Response Time")]
    total_average_response_time: f64,
    #[serde(rename = "Requests/s")]
    requests_per_second: f64,
}

/// Read every bucket that saw traffic, in file order.
pub fn read_history(path: impl AsRef<Path>) -> Result<HistorySeries, ExtractError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| ExtractError::parse(path, e))?;
    let mut series = Vec::new();

    for row in reader.deserialize::<HistoryCsvRow>() {
        let row = row.map_err(|e| ExtractError::parse(path, e))?;
        let timestamp = epoch_seconds(row.timestamp).ok_or_else(|| {
            ExtractError::parse(path, format!("timestamp {} is out of range", row.timestamp))
        })?;
        if row.total_request_count == 0 {
            continue;
        }
        series.push(HistoryPoint {
            timestamp,
            total_avg_response_time: row.total_average_response_time,
            requests_per_second: row.requests_per_second,
        });
    }

    Ok(series)
}

fn epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
