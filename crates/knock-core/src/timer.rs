use crate::types::Nonce;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as MemoryOrdering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A scheduled coordinator event.
///
/// Events carry the test nonce rather than a handle to the record, and are
/// resolved against the coordinator state at fire time.  A record that has
/// been replaced or removed in the meantime makes the event a no-op.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimerEvent {
    /// Drive the current locally-initiated test: retransmit, give up or
    /// finalise.
    ContinueTest(Nonce),
    /// Reap a helper record from the active-test table.
    RemoveTest(Nonce),
}

/// A one-shot event scheduler.
///
/// Re-scheduling is explicit: an event fires once and the coordinator
/// schedules the follow-up itself.  The service that owns the deadlines calls
/// back into [`crate::Coordinator::handle_timer`] when one is reached.
pub trait Timer: Send + Sync {
    /// Schedule `event` to fire once, `delay` from now.
    fn schedule(&self, event: TimerEvent, delay: Duration);
}

struct Entry {
    deadline: Instant,
    event: TimerEvent,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the earliest deadline surfaces first in the max-heap
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}

impl Eq for Entry {}

struct Shared {
    queue: Mutex<BinaryHeap<Entry>>,
    tick: Condvar,
    shutdown: AtomicBool,
}

/// A thread-backed [`Timer`].
///
/// Due events are delivered on the channel returned by [`ThreadTimer::spawn`];
/// the embedding drains it and feeds each event to
/// [`crate::Coordinator::handle_timer`].  Dropping the timer stops the worker
/// thread and discards any pending deadlines.
pub struct ThreadTimer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// Start the worker thread and return the timer and its event channel.
    #[must_use]
    pub fn spawn() -> (Self, Receiver<TimerEvent>) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared {
            queue: Mutex::new(BinaryHeap::new()),
            tick: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || Self::run(&worker, &tx));
        (
            Self {
                shared,
                handle: Some(handle),
            },
            rx,
        )
    }

    fn run(shared: &Shared, tx: &Sender<TimerEvent>) {
        let mut queue = shared.queue.lock();
        loop {
            if shared.shutdown.load(MemoryOrdering::Acquire) {
                return;
            }
            let now = Instant::now();
            match queue.peek() {
                Some(entry) if entry.deadline <= now => {
                    if let Some(due) = queue.pop() {
                        if tx.send(due.event).is_err() {
                            // receiver gone, nothing left to deliver to
                            return;
                        }
                    }
                }
                Some(entry) => {
                    let wait = entry.deadline.saturating_duration_since(now);
                    let _ = shared.tick.wait_for(&mut queue, wait);
                }
                None => shared.tick.wait(&mut queue),
            }
        }
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, event: TimerEvent, delay: Duration) {
        let mut queue = self.shared.queue.lock();
        queue.push(Entry {
            deadline: Instant::now() + delay,
            event,
        });
        self.shared.tick.notify_one();
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, MemoryOrdering::Release);
        self.shared.tick.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
