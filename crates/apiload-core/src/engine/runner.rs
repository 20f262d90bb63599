use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::aggregator::{RequestSample, StatsAggregator};
use crate::engine::virtual_user::run_virtual_user;
use crate::error::ApiloadError;
use crate::results::LoadTestReport;
use crate::target::ApiTarget;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Bounds of the random pause each user takes between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    pub min: Duration,
    pub max: Duration,
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestConfig {
    /// Number of concurrent users.
    pub users: u32,
    /// Users start evenly spaced over this period.
    pub ramp_up: Duration,
    /// Measured from the start of the test, ramp-up included.
    pub run_time: Duration,
    pub wait: WaitTime,
    pub request_timeout: Duration,
    /// How often a row is appended to the history.
    pub history_interval: Duration,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            users: 1,
            ramp_up: Duration::ZERO,
            run_time: Duration::from_secs(60),
            wait: WaitTime::default(),
            request_timeout: Duration::from_secs(30),
            history_interval: Duration::from_secs(1),
        }
    }
}

impl LoadTestConfig {
    pub fn validate(&self) -> Result<(), ApiloadError> {
        if self.users == 0 {
            return Err(ApiloadError::Validation(
                "users must be greater than zero".to_string(),
            ));
        }
        if self.run_time.is_zero() {
            return Err(ApiloadError::Validation(
                "run time must be greater than zero".to_string(),
            ));
        }
        if self.wait.min > self.wait.max {
            return Err(ApiloadError::Validation(format!(
                "minimum wait ({:?}) exceeds maximum wait ({:?})",
                self.wait.min, self.wait.max
            )));
        }
        if self.history_interval.is_zero() {
            return Err(ApiloadError::Validation(
                "history interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Pause between consecutive user starts.
    fn ramp_delay(&self) -> Duration {
        if self.ramp_up.is_zero() || self.users <= 1 {
            Duration::ZERO
        } else {
            self.ramp_up / (self.users - 1)
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Drive `target` with `config.users` users until the run time elapses or
/// `cancel` fires, then return the collected stats.
///
/// Individual request failures are recorded in the report, never returned as
/// errors.
pub async fn run_load_test(
    target: ApiTarget,
    config: &LoadTestConfig,
    cancel: CancellationToken,
) -> Result<LoadTestReport, ApiloadError> {
    config.validate()?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(format!("apiload/{}", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .brotli(true)
        .build()?;

    tracing::info!(
        system = target.system_name(),
        url = %target.url(),
        users = config.users,
        run_time_secs = config.run_time.as_secs_f64(),
        "starting load test"
    );

    let deadline = Instant::now() + config.run_time;
    let active_users = Arc::new(AtomicU32::new(0));
    let (tx, mut rx) = mpsc::channel::<RequestSample>(4096);

    let spawner = tokio::spawn(spawn_users(
        Arc::new(target),
        Arc::new(client),
        config.clone(),
        deadline,
        cancel.clone(),
        tx,
        Arc::clone(&active_users),
    ));

    let mut aggregator = StatsAggregator::new();
    let mut history = Vec::new();
    let mut ticker = interval(config.history_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The channel closes once every user has exited and the spawner is done.
    loop {
        tokio::select! {
            sample = rx.recv() => match sample {
                Some(sample) => aggregator.record(&sample),
                None => break,
            },
            _ = ticker.tick() => {
                let users = active_users.load(Ordering::Relaxed);
                history.push(aggregator.history_row(Utc::now(), users));
            }
        }
    }

    spawner
        .await
        .map_err(|e| ApiloadError::Engine(format!("user spawner failed: {e}")))?;
    history.push(aggregator.history_row(Utc::now(), 0));

    let elapsed = aggregator.elapsed();
    tracing::info!(
        requests = aggregator.total_requests(),
        failures = aggregator.total_failures(),
        elapsed_secs = elapsed.as_secs_f64(),
        cancelled = cancel.is_cancelled(),
        "load test finished"
    );

    Ok(LoadTestReport {
        stats: aggregator.stats_rows(elapsed),
        history,
        failures: aggregator.failure_rows(),
    })
}

// ---------------------------------------------------------------------------
// Internal implementation
// ---------------------------------------------------------------------------

/// Start every user, staggered by the ramp delay, and wait for all of them.
async fn spawn_users(
    target: Arc<ApiTarget>,
    client: Arc<reqwest::Client>,
    config: LoadTestConfig,
    deadline: Instant,
    cancel: CancellationToken,
    tx: mpsc::Sender<RequestSample>,
    active_users: Arc<AtomicU32>,
) {
    let ramp_delay = config.ramp_delay();
    let mut users: JoinSet<()> = JoinSet::new();

    for user_id in 0..config.users {
        if cancel.is_cancelled() || Instant::now() >= deadline {
            break;
        }
        if user_id > 0 && !ramp_delay.is_zero() {
            tokio::select! {
                _ = sleep(ramp_delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        let target = Arc::clone(&target);
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        let tx = tx.clone();
        let active = Arc::clone(&active_users);
        let wait = config.wait;

        active_users.fetch_add(1, Ordering::Relaxed);
        users.spawn(async move {
            run_virtual_user(user_id, target, client, wait, deadline, cancel, tx).await;
            active.fetch_sub(1, Ordering::Relaxed);
        });
    }

    drop(tx);
    while users.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::report::AGGREGATE_ROW_NAME;

    fn unreachable_target() -> ApiTarget {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        ApiTarget::openai(&settings)
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
    }

    fn quick_config() -> LoadTestConfig {
        LoadTestConfig {
            users: 2,
            run_time: Duration::from_millis(400),
            wait: WaitTime {
                min: Duration::from_millis(10),
                max: Duration::from_millis(20),
            },
            request_timeout: Duration::from_secs(2),
            history_interval: Duration::from_millis(100),
            ..LoadTestConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let config = LoadTestConfig::default();
        assert_eq!(config.users, 1);
        assert_eq!(config.run_time, Duration::from_secs(60));
        assert_eq!(config.wait.min, Duration::from_secs(1));
        assert_eq!(config.wait.max, Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_users_is_invalid() {
        let config = LoadTestConfig {
            users: 0,
            ..LoadTestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ApiloadError::Validation(_))));
    }

    #[test]
    fn zero_run_time_is_invalid() {
        let config = LoadTestConfig {
            run_time: Duration::ZERO,
            ..LoadTestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ApiloadError::Validation(_))));
    }

    #[test]
    fn inverted_wait_is_invalid() {
        let config = LoadTestConfig {
            wait: WaitTime {
                min: Duration::from_secs(3),
                max: Duration::from_secs(1),
            },
            ..LoadTestConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("minimum wait"));
    }

    #[test]
    fn ramp_delay_spreads_users_evenly() {
        let config = LoadTestConfig {
            users: 5,
            ramp_up: Duration::from_secs(4),
            ..LoadTestConfig::default()
        };
        assert_eq!(config.ramp_delay(), Duration::from_secs(1));

        let single = LoadTestConfig {
            users: 1,
            ramp_up: Duration::from_secs(4),
            ..LoadTestConfig::default()
        };
        assert_eq!(single.ramp_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_running() {
        let config = LoadTestConfig {
            users: 0,
            ..quick_config()
        };
        let err = run_load_test(unreachable_target(), &config, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiloadError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_host_records_failures() {
        let report = run_load_test(unreachable_target(), &quick_config(), CancellationToken::new())
            .await
            .unwrap();

        let aggregate = report.aggregate().unwrap();
        assert_eq!(aggregate.name, AGGREGATE_ROW_NAME);
        assert!(aggregate.request_count > 0);
        assert_eq!(aggregate.failure_count, aggregate.request_count);

        assert_eq!(report.stats.len(), 2);
        assert_eq!(report.stats[0].name, "/v1/chat/completions");
        assert!(!report.failures.is_empty());
        let occurrences: u64 = report.failures.iter().map(|f| f.occurrences).sum();
        assert_eq!(occurrences, aggregate.failure_count);

        assert!(report.history.len() >= 2);
        let last = report.history.last().unwrap();
        assert_eq!(last.total_request_count, aggregate.request_count);
        assert_eq!(last.user_count, 0);
    }

    #[tokio::test]
    async fn successful_responses_have_no_failures() {
        let addr = crate::testing::serve_fixed(200, r#"{"choices":[]}"#).await;
        let target = unreachable_target().with_base_url(crate::testing::base_url(addr));
        let report = run_load_test(target, &quick_config(), CancellationToken::new())
            .await
            .unwrap();

        let aggregate = report.aggregate().unwrap();
        assert!(aggregate.request_count > 0);
        assert_eq!(aggregate.failure_count, 0);
        assert!(report.failures.is_empty());
        assert!(aggregate.average_content_size > 0.0);
    }

    #[tokio::test]
    async fn pre_cancelled_run_sends_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = run_load_test(unreachable_target(), &quick_config(), cancel)
            .await
            .unwrap();
        assert_eq!(report.aggregate().unwrap().request_count, 0);
        assert!(report.failures.is_empty());
    }
}
