use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::report::AGGREGATE_ROW_NAME;
use crate::results::{FailureRow, HistoryRow, StatsRow, PERCENTILES};

/// Seconds of trailing traffic used for the "current" requests/s figure.
pub const CURRENT_RPS_WINDOW_SECS: u64 = 10;

/// One completed request as reported by a virtual user.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub method: String,
    pub name: String,
    pub elapsed_ms: u64,
    pub size_bytes: u64,
    /// Failure description; `None` for a successful request.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// EndpointStats: running totals for one (method, name) pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct EndpointStats {
    requests: u64,
    failures: u64,
    /// Response time (ms) to number of requests that took exactly that long.
    /// Percentiles walk this in order, so snapshots never copy or sort.
    response_times: BTreeMap<u64, u64>,
    sum_ms: u64,
    min_ms: u64,
    max_ms: u64,
    content_bytes: u64,
}

impl EndpointStats {
    fn new() -> Self {
        Self {
            requests: 0,
            failures: 0,
            response_times: BTreeMap::new(),
            sum_ms: 0,
            min_ms: u64::MAX,
            max_ms: 0,
            content_bytes: 0,
        }
    }

    fn record(&mut self, sample: &RequestSample) {
        self.requests += 1;
        if sample.error.is_some() {
            self.failures += 1;
        }
        *self.response_times.entry(sample.elapsed_ms).or_insert(0) += 1;
        self.sum_ms += sample.elapsed_ms;
        self.min_ms = self.min_ms.min(sample.elapsed_ms);
        self.max_ms = self.max_ms.max(sample.elapsed_ms);
        self.content_bytes += sample.size_bytes;
    }

    fn mean_ms(&self) -> f64 {
        if self.requests > 0 {
            self.sum_ms as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    fn min_ms(&self) -> u64 {
        if self.min_ms == u64::MAX {
            0
        } else {
            self.min_ms
        }
    }

    fn avg_content_size(&self) -> f64 {
        if self.requests > 0 {
            self.content_bytes as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Nearest-rank percentile: the smallest time whose cumulative count
    /// reaches `ceil(p * n)`. `None` with no samples.
    fn percentile(&self, p: f64) -> Option<u64> {
        if self.requests == 0 {
            return None;
        }
        let rank = ((p * self.requests as f64).ceil() as u64).clamp(1, self.requests);
        let mut seen = 0;
        for (&ms, &count) in &self.response_times {
            seen += count;
            if seen >= rank {
                return Some(ms);
            }
        }
        Some(self.max_ms)
    }

    fn percentiles(&self, ps: &[f64]) -> Vec<Option<u64>> {
        ps.iter().map(|&p| self.percentile(p)).collect()
    }

    fn median_ms(&self) -> u64 {
        self.percentile(0.5).unwrap_or(0)
    }

    fn to_row(&self, method: &str, name: &str, elapsed_secs: f64) -> StatsRow {
        let per_sec = |n: u64| {
            if elapsed_secs > 0.0 {
                n as f64 / elapsed_secs
            } else {
                0.0
            }
        };
        StatsRow {
            method: method.to_string(),
            name: name.to_string(),
            request_count: self.requests,
            failure_count: self.failures,
            median_ms: self.median_ms(),
            average_ms: self.mean_ms(),
            min_ms: self.min_ms(),
            max_ms: self.max_ms,
            average_content_size: self.avg_content_size(),
            requests_per_second: per_sec(self.requests),
            failures_per_second: per_sec(self.failures),
            percentiles: self.percentiles(&PERCENTILES.map(|(p, _)| p)),
        }
    }
}

// ---------------------------------------------------------------------------
// StatsAggregator
// ---------------------------------------------------------------------------

/// Collects request samples during a load test and produces the rows of the
/// stats, history and failures reports.
pub struct StatsAggregator {
    start_time: Instant,
    endpoints: BTreeMap<(String, String), EndpointStats>,
    total: EndpointStats,
    /// Occurrences keyed by (method, name, error).
    failures: BTreeMap<(String, String, String), u64>,
    /// Requests per whole second since start.
    time_buckets: BTreeMap<u64, (u64, u64)>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            endpoints: BTreeMap::new(),
            total: EndpointStats::new(),
            failures: BTreeMap::new(),
            time_buckets: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, sample: &RequestSample) {
        let second = self.start_time.elapsed().as_secs();
        self.record_in_second(sample, second);
    }

    pub(crate) fn record_in_second(&mut self, sample: &RequestSample, second: u64) {
        self.endpoints
            .entry((sample.method.clone(), sample.name.clone()))
            .or_insert_with(EndpointStats::new)
            .record(sample);
        self.total.record(sample);

        let bucket = self.time_buckets.entry(second).or_insert((0, 0));
        bucket.0 += 1;
        if let Some(error) = &sample.error {
            bucket.1 += 1;
            *self
                .failures
                .entry((sample.method.clone(), sample.name.clone(), error.clone()))
                .or_insert(0) += 1;
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.total.requests
    }

    pub fn total_failures(&self) -> u64 {
        self.total.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// (requests/s, failures/s) over the completed seconds of the trailing
    /// window ending at `now_second`.
    pub(crate) fn current_rates(&self, now_second: u64) -> (f64, f64) {
        let window = now_second.min(CURRENT_RPS_WINDOW_SECS);
        if window == 0 {
            return (0.0, 0.0);
        }
        let (requests, failures) = self
            .time_buckets
            .range(now_second - window..now_second)
            .fold((0, 0), |acc, (_, &(r, f))| (acc.0 + r, acc.1 + f));
        (requests as f64 / window as f64, failures as f64 / window as f64)
    }

    /// Per-endpoint rows followed by the aggregate row.
    pub fn stats_rows(&self, elapsed: Duration) -> Vec<StatsRow> {
        let secs = elapsed.as_secs_f64();
        let mut rows: Vec<StatsRow> = self
            .endpoints
            .iter()
            .map(|((method, name), stats)| stats.to_row(method, name, secs))
            .collect();
        rows.push(self.total.to_row("", AGGREGATE_ROW_NAME, secs));
        rows
    }

    pub fn history_row(&self, timestamp: DateTime<Utc>, user_count: u32) -> HistoryRow {
        self.history_row_at(timestamp, user_count, self.start_time.elapsed().as_secs())
    }

    pub(crate) fn history_row_at(
        &self,
        timestamp: DateTime<Utc>,
        user_count: u32,
        now_second: u64,
    ) -> HistoryRow {
        let (rps, fps) = self.current_rates(now_second);
        HistoryRow {
            timestamp: timestamp.timestamp(),
            user_count,
            name: AGGREGATE_ROW_NAME.to_string(),
            requests_per_second: rps,
            failures_per_second: fps,
            total_request_count: self.total.requests,
            total_failure_count: self.total.failures,
            total_median_ms: self.total.median_ms(),
            total_average_ms: self.total.mean_ms(),
            total_min_ms: self.total.min_ms(),
            total_max_ms: self.total.max_ms,
        }
    }

    pub fn failure_rows(&self) -> Vec<FailureRow> {
        self.failures
            .iter()
            .map(|((method, name, error), &occurrences)| FailureRow {
                method: method.clone(),
                name: name.clone(),
                error: error.clone(),
                occurrences,
            })
            .collect()
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
