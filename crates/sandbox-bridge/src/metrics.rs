//! Frame accounting for the boundary: what was sent, what arrived, what was
//! thrown away. Dropped frames are the interesting number; a healthy pairing
//! keeps it at zero.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static ACTIONS_SENT: AtomicU64 = AtomicU64::new(0);
static EVENTS_POSTED: AtomicU64 = AtomicU64::new(0);
static FRAMES_DROPPED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BridgeMetricSnapshot {
    pub actions_sent: u64,
    pub events_posted: u64,
    pub frames_dropped: u64,
}

pub fn record_action_sent() {
    ACTIONS_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_event_posted() {
    EVENTS_POSTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_frame_dropped() {
    FRAMES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> BridgeMetricSnapshot {
    BridgeMetricSnapshot {
        actions_sent: ACTIONS_SENT.load(Ordering::Relaxed),
        events_posted: EVENTS_POSTED.load(Ordering::Relaxed),
        frames_dropped: FRAMES_DROPPED.load(Ordering::Relaxed),
    }
}
