//! Scan telemetry: lightweight counters plus latency aggregates so the CLI
//! can surface basic numbers without an external metrics backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static SCAN_TOTAL: AtomicU64 = AtomicU64::new(0);
static SCAN_FAILED: AtomicU64 = AtomicU64::new(0);
static SCAN_EMPTY: AtomicU64 = AtomicU64::new(0);
static ELEMENTS_EMITTED: AtomicU64 = AtomicU64::new(0);
static SCAN_LAT_NS: AtomicU64 = AtomicU64::new(0);
static SCAN_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanMetricSnapshot {
    pub total: u64,
    pub failed: u64,
    pub empty: u64,
    pub elements_emitted: u64,
    pub avg_ms: f64,
}

pub fn record_scan(element_count: usize, duration: Duration) {
    SCAN_TOTAL.fetch_add(1, Ordering::Relaxed);
    if element_count == 0 {
        SCAN_EMPTY.fetch_add(1, Ordering::Relaxed);
    }
    ELEMENTS_EMITTED.fetch_add(element_count as u64, Ordering::Relaxed);
    record_latency(duration);
}

pub fn record_failure(duration: Duration) {
    SCAN_TOTAL.fetch_add(1, Ordering::Relaxed);
    SCAN_FAILED.fetch_add(1, Ordering::Relaxed);
    record_latency(duration);
}

pub fn snapshot() -> ScanMetricSnapshot {
    let samples = SCAN_LAT_SAMPLES.load(Ordering::Relaxed);
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (SCAN_LAT_NS.load(Ordering::Relaxed) as f64 / samples as f64) / 1_000_000.0
    };
    ScanMetricSnapshot {
        total: SCAN_TOTAL.load(Ordering::Relaxed),
        failed: SCAN_FAILED.load(Ordering::Relaxed),
        empty: SCAN_EMPTY.load(Ordering::Relaxed),
        elements_emitted: ELEMENTS_EMITTED.load(Ordering::Relaxed),
        avg_ms,
    }
}

fn record_latency(duration: Duration) {
    let nanos = duration.as_nanos();
    let nanos = if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    };
    SCAN_LAT_NS.fetch_add(nanos, Ordering::Relaxed);
    SCAN_LAT_SAMPLES.fetch_add(1, Ordering::Relaxed);
}
