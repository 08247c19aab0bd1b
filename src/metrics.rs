//! Metrics collection for the orchestrator
//!
//! Process-wide counters and a model-latency histogram, shared by every
//! session of one server and exported in Prometheus text format.
//!
//! # Example
//!
//! ```rust
//! use goalpilot::metrics::Metrics;
//! use std::time::Duration;
//!
//! let metrics = Metrics::new();
//! metrics.record_model_call(Duration::from_millis(420), true);
//! assert!(metrics.to_prometheus_format().contains("goalpilot_model_calls_total 1"));
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Maximum number of latency samples kept for percentiles
const MAX_HISTOGRAM_SAMPLES: usize = 1000;

/// Orchestrator metrics
#[derive(Debug)]
pub struct Metrics {
    // === Counters ===
    /// Goals accepted via `init`
    pub goals_started: AtomicU64,
    /// Page snapshots processed
    pub snapshots_processed: AtomicU64,
    /// Actions emitted to callers
    pub actions_emitted: AtomicU64,
    /// Plans emitted to callers
    pub plans_emitted: AtomicU64,
    /// Snapshots routed to the chunked pipeline
    pub chunked_runs: AtomicU64,
    /// Model round-trips attempted
    pub model_calls: AtomicU64,
    /// Model round-trips that failed or timed out
    pub model_failures: AtomicU64,
    /// Login-wall pauses
    pub login_pauses: AtomicU64,
    /// Error messages sent to callers
    pub errors_total: AtomicU64,

    // === Gauges ===
    /// Currently connected sessions
    pub active_sessions: AtomicU32,

    model_latency: RwLock<RingBuffer<Duration>>,
    errors_by_kind: RwLock<BTreeMap<String, u64>>,
    start_time: Instant,
}

/// Fixed-capacity sample buffer that overwrites its oldest entries
#[derive(Debug, Clone)]
struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    write_pos: usize,
    total_samples: u64,
}

impl<T: Clone + Ord> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
            total_samples: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.write_pos] = value;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
        self.total_samples += 1;
    }

    /// Nearest-rank percentile, `p` in `0.0..=1.0`
    fn percentile(&self, p: f64) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort();
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted.get(idx).cloned()
    }
}

/// Point-in-time copy of the counters, for `/status`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Seconds since the metrics were created
    pub uptime_secs: u64,
    /// Goals accepted
    pub goals_started: u64,
    /// Snapshots processed
    pub snapshots_processed: u64,
    /// Actions emitted
    pub actions_emitted: u64,
    /// Model round-trips
    pub model_calls: u64,
    /// Failed model round-trips
    pub model_failures: u64,
    /// Connected sessions
    pub active_sessions: u32,
    /// Median model latency in milliseconds
    pub model_latency_p50_ms: Option<u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new, zeroed collector
    pub fn new() -> Self {
        Self {
            goals_started: AtomicU64::new(0),
            snapshots_processed: AtomicU64::new(0),
            actions_emitted: AtomicU64::new(0),
            plans_emitted: AtomicU64::new(0),
            chunked_runs: AtomicU64::new(0),
            model_calls: AtomicU64::new(0),
            model_failures: AtomicU64::new(0),
            login_pauses: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            active_sessions: AtomicU32::new(0),
            model_latency: RwLock::new(RingBuffer::new(MAX_HISTOGRAM_SAMPLES)),
            errors_by_kind: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Count a new goal
    pub fn record_goal(&self) {
        self.goals_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a processed snapshot
    pub fn record_snapshot(&self) {
        self.snapshots_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an emitted action
    pub fn record_action(&self) {
        self.actions_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an emitted plan
    pub fn record_plan(&self) {
        self.plans_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a chunked analysis
    pub fn record_chunked_run(&self) {
        self.chunked_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a login pause
    pub fn record_login_pause(&self) {
        self.login_pauses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one model round-trip and its latency
    pub fn record_model_call(&self, duration: Duration, success: bool) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.model_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.model_latency.write().push(duration);
    }

    /// Record an error reported to a caller
    pub fn record_error(&self, kind: &str) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        *self.errors_by_kind.write().entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Errors seen so far for `kind`
    pub fn errors_of_kind(&self, kind: &str) -> u64 {
        self.errors_by_kind.read().get(kind).copied().unwrap_or(0)
    }

    /// Increment connected sessions
    pub fn inc_active_sessions(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement connected sessions
    pub fn dec_active_sessions(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    /// Copy of the headline numbers
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            goals_started: self.goals_started.load(Ordering::Relaxed),
            snapshots_processed: self.snapshots_processed.load(Ordering::Relaxed),
            actions_emitted: self.actions_emitted.load(Ordering::Relaxed),
            model_calls: self.model_calls.load(Ordering::Relaxed),
            model_failures: self.model_failures.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            model_latency_p50_ms: self
                .model_latency
                .read()
                .percentile(0.5)
                .map(|d| d.as_millis() as u64),
        }
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters = [
            ("goalpilot_goals_started_total", &self.goals_started),
            ("goalpilot_snapshots_processed_total", &self.snapshots_processed),
            ("goalpilot_actions_emitted_total", &self.actions_emitted),
            ("goalpilot_plans_emitted_total", &self.plans_emitted),
            ("goalpilot_chunked_runs_total", &self.chunked_runs),
            ("goalpilot_model_calls_total", &self.model_calls),
            ("goalpilot_model_failures_total", &self.model_failures),
            ("goalpilot_login_pauses_total", &self.login_pauses),
            ("goalpilot_errors_total", &self.errors_total),
        ];
        for (name, counter) in counters {
            output.push_str(&format!("{} {}\n", name, counter.load(Ordering::Relaxed)));
        }

        output.push_str(&format!(
            "goalpilot_active_sessions {}\n",
            self.active_sessions.load(Ordering::Relaxed)
        ));

        for (kind, count) in self.errors_by_kind.read().iter() {
            output.push_str(&format!(
                "goalpilot_errors_by_kind_total{{kind=\"{}\"}} {}\n",
                kind, count
            ));
        }

        let latency = self.model_latency.read();
        for (label, p) in [("p50", 0.5), ("p95", 0.95), ("p99", 0.99)] {
            if let Some(value) = latency.percentile(p) {
                output.push_str(&format!(
                    "goalpilot_model_latency_{}_ms {}\n",
                    label,
                    value.as_millis()
                ));
            }
        }
        output.push_str(&format!(
            "goalpilot_model_latency_samples_total {}\n",
            latency.total_samples
        ));

        output
    }
}
