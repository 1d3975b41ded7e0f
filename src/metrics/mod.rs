pub mod sampler;
pub mod store;
pub mod stream;

pub use sampler::Sampler;
pub use store::{MetricsStore, Reduction};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One published metrics sample.
/// This is the "read" side: the sampler builds these, handlers serialize them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// Inbound bytes per second over the last interval
    pub bandwidth_in: u64,
    /// Outbound bytes per second over the last interval
    pub bandwidth_out: u64,
    pub requests_per_sec: f64,
    /// Proxy value, equal to the interval's request count
    pub active_connections: u64,
    /// Approximate, in milliseconds
    pub avg_response_time: f64,
}

/// Chart point kept in the bounded history. Drops `avg_response_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub bandwidth_in: u64,
    pub bandwidth_out: u64,
    pub requests_per_sec: f64,
    pub active_connections: u64,
}

impl From<&Snapshot> for HistoryEntry {
    fn from(s: &Snapshot) -> Self {
        Self {
            timestamp: s.timestamp,
            bandwidth_in: s.bandwidth_in,
            bandwidth_out: s.bandwidth_out,
            requests_per_sec: s.requests_per_sec,
            active_connections: s.active_connections,
        }
    }
}
