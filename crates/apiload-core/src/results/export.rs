use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{FailureRow, HistoryRow, LoadTestReport, StatsRow, PERCENTILES};
use crate::error::ApiloadError;

const STATS_HEADER: [&str; 11] = [
    "Type",
    "Name",
    "Request Count",
    "Failure Count",
    "Median Response Time",
    "Average Response Time",
    "Min Response Time",
    "Max Response Time",
    "Average Content Size",
    "Requests/s",
    "Failures/s",
];

const HISTORY_HEADER: [&str; 12] = [
    "Timestamp",
    "User Count",
    "Type",
    "Name",
    "Requests/s",
    "Failures/s",
    "Total Request Count",
    "Total Failure Count",
    "Total Median Response Time",
    "Total Average Response Time",
    "Total Min Response Time",
    "Total Max Response Time",
];

const FAILURES_HEADER: [&str; 4] = ["Method", "Name", "Error", "Occurrences"];

// ---------------------------------------------------------------------------
// Per-file writers
// ---------------------------------------------------------------------------

/// Write the stats table. Percentiles of rows with no samples are `N/A`.
pub fn write_stats_csv<W: Write>(rows: &[StatsRow], out: W) -> Result<(), ApiloadError> {
    let mut writer = csv::Writer::from_writer(out);
    let header: Vec<&str> = STATS_HEADER
        .iter()
        .copied()
        .chain(PERCENTILES.iter().map(|(_, label)| *label))
        .collect();
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.method.clone(),
            row.name.clone(),
            row.request_count.to_string(),
            row.failure_count.to_string(),
            row.median_ms.to_string(),
            row.average_ms.to_string(),
            row.min_ms.to_string(),
            row.max_ms.to_string(),
            row.average_content_size.to_string(),
            row.requests_per_second.to_string(),
            row.failures_per_second.to_string(),
        ];
        record.extend(
            (0..PERCENTILES.len()).map(|i| match row.percentiles.get(i).copied().flatten() {
                Some(ms) => ms.to_string(),
                None => "N/A".to_string(),
            }),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_history_csv<W: Write>(rows: &[HistoryRow], out: W) -> Result<(), ApiloadError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HISTORY_HEADER)?;
    for row in rows {
        writer.write_record([
            row.timestamp.to_string(),
            row.user_count.to_string(),
            String::new(),
            row.name.clone(),
            row.requests_per_second.to_string(),
            row.failures_per_second.to_string(),
            row.total_request_count.to_string(),
            row.total_failure_count.to_string(),
            row.total_median_ms.to_string(),
            row.total_average_ms.to_string(),
            row.total_min_ms.to_string(),
            row.total_max_ms.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_failures_csv<W: Write>(rows: &[FailureRow], out: W) -> Result<(), ApiloadError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(FAILURES_HEADER)?;
    for row in rows {
        writer.write_record([
            row.method.as_str(),
            row.name.as_str(),
            row.error.as_str(),
            &row.occurrences.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// All three files
// ---------------------------------------------------------------------------

/// Write `<prefix>_stats.csv`, `<prefix>_stats_history.csv` and
/// `<prefix>_failures.csv`, creating the parent directory if needed.
pub fn write_reports(
    prefix: impl AsRef<Path>,
    report: &LoadTestReport,
) -> Result<Vec<PathBuf>, ApiloadError> {
    let prefix = prefix.as_ref();
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let stats = with_suffix(prefix, "_stats.csv");
    write_stats_csv(&report.stats, fs::File::create(&stats)?)?;
    let history = with_suffix(prefix, "_stats_history.csv");
    write_history_csv(&report.history, fs::File::create(&history)?)?;
    let failures = with_suffix(prefix, "_failures.csv");
    write_failures_csv(&report.failures, fs::File::create(&failures)?)?;

    tracing::info!("wrote load test reports with prefix {}", prefix.display());
    Ok(vec![stats, history, failures])
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
