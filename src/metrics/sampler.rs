use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{MetricsStore, Reduction, Snapshot};

/// Floor of the placeholder response time (ms)
const BASE_RESPONSE_MS: f64 = 10.0;

/// Spread of the placeholder response time on top of the base
const RESPONSE_SPREAD: u64 = 50;

/// Periodic background task that turns accumulated request counters into
/// one published [`Snapshot`] per interval.
pub struct Sampler {
    store: Arc<MetricsStore>,
    interval: Duration,
}

impl Sampler {
    pub fn new(store: Arc<MetricsStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Spawn [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Tick until `cancel` fires. A cycle that has started always finishes;
    /// cancellation is only observed while idle.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first sample is due one
        // full interval after start.
        ticker.tick().await;
        self.store.mark_interval_start();

        debug!(interval_ms = self.interval.as_millis() as u64, "sampler started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sample_once();
                }
            }
        }

        debug!("sampler stopped");
    }

    /// One reduce + publish cycle.
    pub fn sample_once(&self) -> Snapshot {
        let now = Utc::now();
        let reduction = self.store.reduce_at(now);
        let snapshot = compute_snapshot(&reduction, now);
        self.store.publish(snapshot);

        if reduction.had_activity() {
            info!(
                rps = %format_args!("{:.2}", snapshot.requests_per_sec),
                bandwidth_in = snapshot.bandwidth_in,
                bandwidth_out = snapshot.bandwidth_out,
                requests = reduction.request_count,
                "collected metrics"
            );
        } else {
            debug!("no activity detected in this interval");
        }

        snapshot
    }
}

/// Turn one drained interval into rates.
pub fn compute_snapshot(reduction: &Reduction, timestamp: DateTime<Utc>) -> Snapshot {
    // Reduction already clamps, this only guards hand-built values.
    let elapsed = if reduction.elapsed_secs > 0.0 {
        reduction.elapsed_secs
    } else {
        1.0
    };

    let (active_connections, avg_response_time) = approximate_load(reduction.request_count);

    Snapshot {
        timestamp,
        bandwidth_in: (reduction.bytes_in as f64 / elapsed).floor() as u64,
        bandwidth_out: (reduction.bytes_out as f64 / elapsed).floor() as u64,
        requests_per_sec: reduction.request_count as f64 / elapsed,
        active_connections,
        avg_response_time,
    }
}

/// Placeholder for connection and latency tracking: derives both from the
/// interval's request count instead of measuring them.
fn approximate_load(request_count: u64) -> (u64, f64) {
    let avg_response_time = BASE_RESPONSE_MS + (request_count % RESPONSE_SPREAD) as f64;
    (request_count, avg_response_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reduction(request_count: u64, bytes_in: u64, bytes_out: u64, elapsed_secs: f64) -> Reduction {
        Reduction {
            request_count,
            bytes_in,
            bytes_out,
            elapsed_secs,
        }
    }

    #[test]
    fn requests_per_second_over_a_minute() {
        let now = Utc.timestamp_opt(60, 0).unwrap();
        let snap = compute_snapshot(&reduction(120, 0, 0, 60.0), now);
        assert_eq!(snap.requests_per_sec, 2.0);
        assert_eq!(snap.timestamp, now);
    }

    #[test]
    fn bandwidth_is_floored_bytes_per_second() {
        let snap = compute_snapshot(&reduction(1, 6000, 1000, 3.0), Utc::now());
        assert_eq!(snap.bandwidth_in, 2000);
        assert_eq!(snap.bandwidth_out, 333);
    }

    #[test]
    fn degenerate_interval_is_treated_as_one_second() {
        for elapsed in [0.0, -4.0] {
            let snap = compute_snapshot(&reduction(5, 300, 40, elapsed), Utc::now());
            assert_eq!(snap.requests_per_sec, 5.0);
            assert_eq!(snap.bandwidth_in, 300);
            assert_eq!(snap.bandwidth_out, 40);
        }
    }

    #[test]
    fn load_approximation_follows_request_count() {
        let snap = compute_snapshot(&reduction(73, 0, 0, 1.0), Utc::now());
        assert_eq!(snap.active_connections, 73);
        assert_eq!(snap.avg_response_time, 33.0);

        let idle = compute_snapshot(&reduction(0, 0, 0, 1.0), Utc::now());
        assert_eq!(idle.active_connections, 0);
        assert_eq!(idle.avg_response_time, 10.0);
    }

    #[test]
    fn sample_once_drains_and_publishes() {
        let store = Arc::new(MetricsStore::new(4));
        store.increment_request(10, 20);
        store.increment_request(10, 20);

        let sampler = Sampler::new(store.clone(), Duration::from_secs(1));
        let snap = sampler.sample_once();

        assert_eq!(store.current(), snap);
        assert_eq!(store.history().len(), 1);
        assert_eq!(snap.active_connections, 2);
        assert_eq!(store.reduce().request_count, 0);
    }

    #[tokio::test]
    async fn run_publishes_until_cancelled() {
        let store = Arc::new(MetricsStore::new(100));
        let cancel = CancellationToken::new();
        let handle = Sampler::new(store.clone(), Duration::from_millis(20)).spawn(cancel.clone());

        store.increment_request(1, 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sampler did not stop after cancellation")
            .unwrap();

        let published = store.history_len();
        assert!(published >= 2, "expected several samples, got {published}");
        assert_eq!(store.totals().requests, 1);

        let history = store.history();
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.history_len(), published);
    }

    #[tokio::test]
    async fn cancelled_before_first_tick_publishes_nothing() {
        let store = Arc::new(MetricsStore::new(10));
        let cancel = CancellationToken::new();
        cancel.cancel();

        Sampler::new(store.clone(), Duration::from_secs(60))
            .run(cancel)
            .await;

        assert_eq!(store.history_len(), 0);
    }
}
