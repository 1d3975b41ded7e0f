use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use super::{HistoryEntry, Snapshot};

/// Upper bound on the history slots reserved up front; the ring grows one
/// entry per tick past this.
const PREALLOC_LIMIT: usize = 1024;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe metrics store.
/// Middleware calls `increment_request()`, the sampler calls `reduce()` and
/// `publish()`, handlers call `current()` / `history()`.
///
/// Live accumulators and published state sit behind separate locks so that
/// readers never wait on request counting. Each operation holds exactly one
/// of them, which keeps `reduce` and `publish` individually atomic.
pub struct MetricsStore {
    live: Mutex<Accumulators>,
    published: RwLock<Published>,
    capacity: usize,
}

/// Accumulator values drained by one call to [`MetricsStore::reduce`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    pub request_count: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Seconds since the previous reduction, never below 1.0 on a bad clock
    pub elapsed_secs: f64,
}

impl Reduction {
    pub fn had_activity(&self) -> bool {
        self.request_count > 0 || self.bytes_in > 0 || self.bytes_out > 0
    }
}

/// Process-lifetime counters, never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub requests: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub samples: u64,
}

// ─── Internal state ──────────────────────────────────────────────

struct Accumulators {
    request_count: u64,
    bytes_in: u64,
    bytes_out: u64,
    last_sample: DateTime<Utc>,

    total_requests: u64,
    total_bytes_in: u64,
    total_bytes_out: u64,
}

struct Published {
    current: Snapshot,
    history: VecDeque<HistoryEntry>,
    samples: u64,
}

// ─── MetricsStore impl ───────────────────────────────────────────

impl MetricsStore {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            live: Mutex::new(Accumulators {
                request_count: 0,
                bytes_in: 0,
                bytes_out: 0,
                last_sample: Utc::now(),
                total_requests: 0,
                total_bytes_in: 0,
                total_bytes_out: 0,
            }),
            published: RwLock::new(Published {
                current: Snapshot::default(),
                history: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
                samples: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Count one completed request. Called from the logging middleware.
    pub fn increment_request(&self, bytes_in: u64, bytes_out: u64) {
        let mut live = self.live.lock();
        live.request_count += 1;
        live.bytes_in = live.bytes_in.saturating_add(bytes_in);
        live.bytes_out = live.bytes_out.saturating_add(bytes_out);

        live.total_requests += 1;
        live.total_bytes_in = live.total_bytes_in.saturating_add(bytes_in);
        live.total_bytes_out = live.total_bytes_out.saturating_add(bytes_out);
    }

    /// Drain the accumulators and measure the interval since the last drain.
    pub fn reduce(&self) -> Reduction {
        self.reduce_at(Utc::now())
    }

    /// Read-and-reset against an explicit clock reading.
    pub fn reduce_at(&self, now: DateTime<Utc>) -> Reduction {
        let mut live = self.live.lock();

        let elapsed = now - live.last_sample;
        let reduction = Reduction {
            request_count: std::mem::take(&mut live.request_count),
            bytes_in: std::mem::take(&mut live.bytes_in),
            bytes_out: std::mem::take(&mut live.bytes_out),
            elapsed_secs: clamp_elapsed(elapsed),
        };
        live.last_sample = now;

        reduction
    }

    /// Restart the interval clock without touching the counters.
    pub fn mark_interval_start(&self) {
        self.live.lock().last_sample = Utc::now();
    }

    /// Replace the current snapshot and append it to the history ring.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut published = self.published.write();
        published.current = snapshot;

        if published.history.len() >= self.capacity {
            published.history.pop_front();
        }
        published.history.push_back(HistoryEntry::from(&snapshot));
        published.samples += 1;
    }

    pub fn current(&self) -> Snapshot {
        self.published.read().current
    }

    /// Chronological copy of the history ring, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.published.read().history.iter().copied().collect()
    }

    pub fn history_len(&self) -> usize {
        self.published.read().history.len()
    }

    pub fn totals(&self) -> Totals {
        let samples = self.published.read().samples;
        let live = self.live.lock();
        Totals {
            requests: live.total_requests,
            bytes_in: live.total_bytes_in,
            bytes_out: live.total_bytes_out,
            samples,
        }
    }
}

fn clamp_elapsed(elapsed: chrono::Duration) -> f64 {
    let secs = match elapsed.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        // Only overflows past ~292k years, either direction
        None => elapsed.num_seconds() as f64,
    };
    if secs <= 0.0 {
        1.0
    } else {
        secs
    }
}
