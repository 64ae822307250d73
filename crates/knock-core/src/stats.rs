use std::sync::atomic::{AtomicU64, Ordering};

/// Event counters for the coordinator.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    receive_test: AtomicU64,
    receive_test_reply: AtomicU64,
    test_bad_ip: AtomicU64,
    status_known_charlie: AtomicU64,
    throttled: AtomicU64,
}

impl Stats {
    pub(crate) fn incr_receive_test(&self) {
        self.receive_test.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_receive_test_reply(&self) {
        self.receive_test_reply.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_test_bad_ip(&self) {
        self.test_bad_ip.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_status_known_charlie(&self) {
        self.status_known_charlie.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            receive_test: self.receive_test.load(Ordering::Relaxed),
            receive_test_reply: self.receive_test_reply.load(Ordering::Relaxed),
            test_bad_ip: self.test_bad_ip.load(Ordering::Relaxed),
            status_known_charlie: self.status_known_charlie.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the coordinator counters.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StatsSnapshot {
    /// Packets delivered to `receive_test`.
    pub receive_test: u64,
    /// Replies which matched our own current test.
    pub receive_test_reply: u64,
    /// Packets dropped for a bad address or malformed payload.
    pub test_bad_ip: u64,
    /// Tests aborted because Bob picked a Charlie we already talk to.
    pub status_known_charlie: u64,
    /// Packets dropped by the per-IP throttle.
    pub throttled: u64,
}
