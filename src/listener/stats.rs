use std::sync::atomic::{AtomicUsize, Ordering};

use super::settle::Settlement;

/// Counters for settled deliveries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListenerStats {
    /// Deliveries acknowledged.
    pub acked: usize,
    /// Deliveries rejected with requeue.
    pub requeued: usize,
    /// Deliveries rejected without requeue, malformed ones included.
    pub dead_lettered: usize,
    /// Deliveries that could not be decoded.
    pub malformed: usize,
}

#[derive(Default)]
pub(crate) struct Counters {
    acked: AtomicUsize,
    requeued: AtomicUsize,
    dead_lettered: AtomicUsize,
    malformed: AtomicUsize,
}

impl Counters {
    pub(crate) fn record(&self, settlement: Settlement) {
        let counter = match settlement {
            Settlement::Ack => &self.acked,
            Settlement::Requeue => &self.requeued,
            Settlement::Reject => &self.dead_lettered,
            Settlement::Malformed => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                &self.dead_lettered
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            acked: self.acked.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}
