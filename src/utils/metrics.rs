//! # Engine Metrics
//!
//! Lock-free counters for wire and dispatch activity.
//!
//! Counters are plain relaxed atomics: cheap enough to sit on the frame
//! hot path, precise enough for dashboards and tests. The process-wide
//! instance behind [`global`] is what the engine increments; independent
//! [`EngineMetrics`] values exist mainly so tests can count in isolation.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use tracing::info;

/// Monotonic activity counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    frames_decoded: AtomicU64,
    frames_encoded: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    unknown_packets: AtomicU64,
    protocol_errors: AtomicU64,
    dispatches: AtomicU64,
    vetoes: AtomicU64,
}

impl EngineMetrics {
    /// Creates a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_unknown_packet(&self) {
        self.unknown_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_veto(&self) {
        self.vetoes.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            unknown_packets: self.unknown_packets.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            vetoes: self.vetoes.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.frames_decoded.store(0, Ordering::Relaxed);
        self.frames_encoded.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.unknown_packets.store(0, Ordering::Relaxed);
        self.protocol_errors.store(0, Ordering::Relaxed);
        self.dispatches.store(0, Ordering::Relaxed);
        self.vetoes.store(0, Ordering::Relaxed);
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let s = self.snapshot();
        info!(
            frames_decoded = s.frames_decoded,
            frames_encoded = s.frames_encoded,
            bytes_read = s.bytes_read,
            bytes_written = s.bytes_written,
            unknown_packets = s.unknown_packets,
            protocol_errors = s.protocol_errors,
            dispatches = s.dispatches,
            vetoes = s.vetoes,
            "engine metrics"
        );
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_decoded: u64,
    pub frames_encoded: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub unknown_packets: u64,
    pub protocol_errors: u64,
    pub dispatches: u64,
    pub vetoes: u64,
}

static GLOBAL: Lazy<EngineMetrics> = Lazy::new(EngineMetrics::new);

/// Process-wide counters the engine reports into.
pub fn global() -> &'static EngineMetrics {
    &GLOBAL
}
