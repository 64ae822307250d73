use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A per-IP packet throttle.
///
/// Counts test traffic per remote address and refuses peers that exceed the
/// threshold within the window.  Counts are cleared wholesale once the window
/// elapses rather than aged individually; the bound is approximate but the
/// map stays small.
#[derive(Debug)]
pub(crate) struct IpThrottle {
    max_per_ip: u32,
    window: Duration,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    counts: HashMap<IpAddr, u32>,
    window_start: Instant,
}

impl IpThrottle {
    pub(crate) fn new(max_per_ip: u32, window: Duration, now: Instant) -> Self {
        Self {
            max_per_ip,
            window,
            inner: Mutex::new(Inner {
                counts: HashMap::new(),
                window_start: now,
            }),
        }
    }

    /// Returns true iff `ip` has reached the threshold within the current
    /// window; otherwise counts this packet and returns false.
    pub(crate) fn should_throttle(&self, ip: IpAddr, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        if now.saturating_duration_since(inner.window_start) >= self.window {
            inner.counts.clear();
            inner.window_start = now;
        }
        let count = inner.counts.entry(ip).or_insert(0);
        if *count >= self.max_per_ip {
            true
        } else {
            *count += 1;
            false
        }
    }
}
