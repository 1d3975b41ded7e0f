use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::warn;

use super::{HistoryEntry, Snapshot};
use crate::AppState;

/// Process-lifetime counters for `/api/summary`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub total_bytes_in: u64,
    pub total_bytes_out: u64,
    pub samples_collected: u64,
    pub history_len: usize,
    pub history_capacity: usize,
    pub refresh_interval_ms: u64,
}

// ─── GET /api/metrics ────────────────────────────────────────────
/// Latest published snapshot.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.metrics.current())
}

// ─── GET /api/history ────────────────────────────────────────────
/// Chart series, oldest first.

pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<HistoryEntry>> {
    Json(state.metrics.history())
}

// ─── GET /api/summary ────────────────────────────────────────────

pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<Summary> {
    let totals = state.metrics.totals();
    Json(Summary {
        uptime_secs: state.started_at.elapsed().as_secs(),
        total_requests: totals.requests,
        total_bytes_in: totals.bytes_in,
        total_bytes_out: totals.bytes_out,
        samples_collected: totals.samples,
        history_len: state.metrics.history_len(),
        history_capacity: state.metrics.capacity(),
        refresh_interval_ms: state.config.refresh_interval.as_millis() as u64,
    })
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the current `Snapshot` as JSON once per sampling interval, so the
/// dashboard sees each new sample without polling.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.config.refresh_interval);

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.metrics.current();
        Ok(Event::default().event("metrics").data(encode_frame(&snapshot)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// JSON for one SSE frame; a value that fails to serialize becomes an empty
/// frame and a warning instead of ending the stream.
fn encode_frame<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize metrics frame");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::MetricsStore;
    use chrono::{TimeZone, Utc};

    fn state(capacity: usize) -> Arc<AppState> {
        let config = Config {
            history_size: capacity,
            ..Config::default()
        };
        Arc::new(AppState::new(config, Arc::new(MetricsStore::new(capacity))))
    }

    #[tokio::test]
    async fn metrics_returns_current_snapshot() {
        let state = state(3);
        let snap = Snapshot {
            timestamp: Utc.timestamp_opt(5, 0).unwrap(),
            requests_per_sec: 4.0,
            ..Snapshot::default()
        };
        state.metrics.publish(snap);

        let Json(body) = get_metrics(State(state)).await;
        assert_eq!(body, snap);
    }

    #[tokio::test]
    async fn history_returns_ring_contents() {
        let state = state(2);
        for t in 1..=3 {
            state.metrics.publish(Snapshot {
                timestamp: Utc.timestamp_opt(t, 0).unwrap(),
                ..Snapshot::default()
            });
        }

        let Json(body) = get_history(State(state)).await;
        let stamps: Vec<i64> = body.iter().map(|h| h.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![2, 3]);
    }

    #[test]
    fn frame_encodes_snapshot_json() {
        let frame = encode_frame(&Snapshot::default());
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["requestsPerSec"], 0.0);
    }

    #[test]
    fn unserializable_frame_is_empty() {
        // serde_json rejects non-string map keys
        let mut bad = std::collections::HashMap::new();
        bad.insert((1u8, 2u8), 3u8);
        assert_eq!(encode_frame(&bad), "");
    }

    #[tokio::test]
    async fn summary_reports_lifetime_totals() {
        let state = state(4);
        state.metrics.increment_request(3, 4);
        state.metrics.increment_request(3, 4);
        state.metrics.publish(Snapshot::default());

        let Json(summary) = get_summary(State(state)).await;
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.total_bytes_in, 6);
        assert_eq!(summary.total_bytes_out, 8);
        assert_eq!(summary.samples_collected, 1);
        assert_eq!(summary.history_len, 1);
        assert_eq!(summary.history_capacity, 4);
        assert_eq!(summary.refresh_interval_ms, 1000);
    }
}
