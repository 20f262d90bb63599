use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::aggregator::RequestSample;
use crate::engine::runner::WaitTime;
use crate::target::{ApiTarget, Outcome};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run one simulated user until `deadline` or cancellation: send a request,
/// report the sample, wait, repeat.
///
/// Cancellation is checked between requests and interrupts the wait; an
/// in-flight request is allowed to finish.
pub async fn run_virtual_user(
    user_id: u32,
    target: Arc<ApiTarget>,
    client: Arc<reqwest::Client>,
    wait: WaitTime,
    deadline: Instant,
    cancel: CancellationToken,
    result_tx: mpsc::Sender<RequestSample>,
) {
    tracing::debug!(user_id, "virtual user started");
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            break;
        }

        let sample = execute_request(&target, &client).await;
        if let Some(error) = &sample.error {
            tracing::warn!(user_id, "{error}");
        }
        // Receiver gone means the run is over.
        if result_tx.send(sample).await.is_err() {
            break;
        }

        let pause = pick_wait(&wait);
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            _ = tokio::time::sleep(pause.min(remaining)) => {}
            _ = cancel.cancelled() => break,
        }
    }
    tracing::debug!(user_id, "virtual user stopped");
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Uniform random pause in `[min, max]`.
///
/// Kept synchronous so the thread-local RNG never lives across an await.
fn pick_wait(wait: &WaitTime) -> Duration {
    if wait.max <= wait.min {
        return wait.min;
    }
    let min_ms = wait.min.as_millis() as u64;
    let max_ms = wait.max.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Send one request and turn the response, or the transport error, into a
/// sample. Never fails.
async fn execute_request(target: &ApiTarget, client: &reqwest::Client) -> RequestSample {
    let start = Instant::now();
    let result = send(target, client).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let (size_bytes, error) = match result {
        Ok((status, body)) => {
            let error = match target.classify(status, &body) {
                Outcome::Success => None,
                Outcome::Failure(message) => Some(message),
            };
            (body.len() as u64, error)
        }
        Err(e) => (0, Some(e.to_string())),
    };

    RequestSample {
        method: target.method().to_string(),
        name: target.path(),
        elapsed_ms,
        size_bytes,
        error,
    }
}

async fn send(target: &ApiTarget, client: &reqwest::Client) -> Result<(u16, String), reqwest::Error> {
    let response = target.request(client).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn unreachable_target() -> Arc<ApiTarget> {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        // Port 9 (discard) on loopback is closed in test environments.
        Arc::new(
            ApiTarget::openai(&settings)
                .unwrap()
                .with_base_url("http://127.0.0.1:9"),
        )
    }

    #[test]
    fn wait_is_within_bounds() {
        let wait = WaitTime {
            min: Duration::from_millis(10),
            max: Duration::from_millis(20),
        };
        for _ in 0..100 {
            let d = pick_wait(&wait);
            assert!(d >= wait.min && d <= wait.max, "{d:?}");
        }
    }

    #[test]
    fn fixed_wait_returns_min() {
        let wait = WaitTime {
            min: Duration::from_millis(5),
            max: Duration::from_millis(5),
        };
        assert_eq!(pick_wait(&wait), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_sample() {
        let target = unreachable_target();
        let client = reqwest::Client::new();
        let sample = execute_request(&target, &client).await;
        assert_eq!(sample.method, "POST");
        assert_eq!(sample.name, "/v1/chat/completions");
        assert_eq!(sample.size_bytes, 0);
        assert!(sample.error.is_some());
    }

    #[tokio::test]
    async fn cancelled_user_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_virtual_user(
            0,
            unreachable_target(),
            Arc::new(reqwest::Client::new()),
            WaitTime::default(),
            Instant::now() + Duration::from_secs(5),
            cancel,
            tx,
        )
        .await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn user_stops_at_deadline() {
        let (tx, mut rx) = mpsc::channel(64);
        let wait = WaitTime {
            min: Duration::from_millis(10),
            max: Duration::from_millis(10),
        };
        run_virtual_user(
            0,
            unreachable_target(),
            Arc::new(reqwest::Client::new()),
            wait,
            Instant::now() + Duration::from_millis(200),
            CancellationToken::new(),
            tx,
        )
        .await;

        let mut count = 0;
        while let Some(sample) = rx.recv().await {
            assert!(sample.error.is_some());
            count += 1;
        }
        assert!(count >= 1);
    }
}
