//! The token queue shared between the pool handle and its refill task.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Outcome of trying to pop a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Take {
    /// A token was removed from the queue.
    Token,
    /// The queue is empty but may still be refilled.
    Empty,
    /// The queue is empty and closed, so it will never be refilled.
    Closed,
}

/// The queue of anonymous tokens.
///
/// Tokens have no payload so the queue is just its length.
#[derive(Debug)]
pub(crate) struct Queue {
    tokens: usize,
    closed: bool,
}

impl Queue {
    /// Construct a queue filled up to `capacity`.
    pub(crate) const fn full(capacity: usize) -> Self {
        Self {
            tokens: capacity,
            closed: false,
        }
    }

    /// Number of queued tokens.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.tokens
    }

    /// Pop a single token.
    ///
    /// Queued tokens are still handed out after the queue has been closed.
    pub(crate) fn take(&mut self) -> Take {
        if self.tokens > 0 {
            self.tokens -= 1;
            Take::Token
        } else if self.closed {
            Take::Closed
        } else {
            Take::Empty
        }
    }

    /// Add up to `amount` tokens without going over `capacity`, returning how
    /// many were added. Whatever doesn't fit is discarded.
    pub(crate) fn refill(&mut self, amount: usize, capacity: usize) -> usize {
        if self.closed {
            return 0;
        }

        let added = amount.min(capacity.saturating_sub(self.tokens));
        self.tokens += added;
        added
    }

    /// Remove every queued token, returning how many were removed.
    pub(crate) fn drain(&mut self) -> usize {
        core::mem::take(&mut self.tokens)
    }

    /// Permanently close the queue.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

/// State shared by a [`Pool`] and its refill task.
///
/// [`Pool`]: crate::Pool
pub(crate) struct Shared {
    /// Max number of queued tokens.
    pub(crate) capacity: usize,
    /// Tokens added every `interval`.
    pub(crate) refill: usize,
    /// Time between refills.
    pub(crate) interval: Duration,
    pub(crate) queue: Mutex<Queue>,
    /// Woken whenever tokens are added or the queue is closed.
    pub(crate) available: Notify,
    /// Set once by the first call to `close`.
    closing: AtomicBool,
    /// Signals the refill task to stop.
    pub(crate) shutdown: Notify,
}

impl Shared {
    pub(crate) fn new(capacity: usize, refill: usize, interval: Duration) -> Self {
        Self {
            capacity,
            refill,
            interval,
            queue: Mutex::new(Queue::full(capacity)),
            available: Notify::new(),
            closing: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Pop a single token.
    #[inline]
    pub(crate) fn take(&self) -> Take {
        self.queue.lock().take()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Top up the queue with the configured refill amount and wake anyone
    /// parked on it.
    pub(crate) fn refill(&self) -> usize {
        let added = self.queue.lock().refill(self.refill, self.capacity);

        if added > 0 {
            trace!(added, "refilled");
            self.available.notify_waiters();
        }

        added
    }

    pub(crate) fn drain(&self) -> usize {
        let drained = self.queue.lock().drain();
        trace!(drained, "drained");
        drained
    }

    /// Close the queue, release every parked waiter so they can observe it,
    /// and signal the refill task to stop.
    ///
    /// Only the first call has any effect. The queue is closed right here
    /// rather than by the refill task, so closing works even if that task can
    /// no longer run.
    pub(crate) fn close(&self) -> bool {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.queue.lock().close();
        trace!("queue closed");
        self.available.notify_waiters();

        // A stored permit is picked up even if the refill task isn't parked on
        // the signal right now.
        self.shutdown.notify_one();
        true
    }

    #[inline]
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("tokens", &self.len())
            .field("capacity", &self.capacity)
            .field("refill", &self.refill)
            .field("interval", &self.interval)
            .field("closed", &self.is_closing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Queue, Take};

    #[test]
    fn take_until_empty() {
        let mut queue = Queue::full(2);

        assert_eq!(queue.take(), Take::Token);
        assert_eq!(queue.take(), Take::Token);
        assert_eq!(queue.take(), Take::Empty);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn refill_is_capped() {
        let mut queue = Queue::full(10);
        assert_eq!(queue.refill(5, 10), 0);

        queue.take();
        queue.take();
        queue.take();

        // Excess is discarded, not carried over.
        assert_eq!(queue.refill(5, 10), 3);
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.refill(5, 10), 0);
    }

    #[test]
    fn refill_zero() {
        let mut queue = Queue::full(4);
        queue.drain();

        assert_eq!(queue.refill(0, 4), 0);
        assert_eq!(queue.take(), Take::Empty);
    }

    #[test]
    fn drain() {
        let mut queue = Queue::full(7);
        queue.take();

        assert_eq!(queue.drain(), 6);
        assert_eq!(queue.drain(), 0);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn closed_queue_serves_remaining_tokens() {
        let mut queue = Queue::full(2);
        queue.close();

        assert_eq!(queue.refill(2, 2), 0);
        assert_eq!(queue.take(), Take::Token);
        assert_eq!(queue.take(), Take::Token);
        assert_eq!(queue.take(), Take::Closed);
        assert_eq!(queue.take(), Take::Closed);
    }

    #[test]
    fn closed_queue_is_never_refilled() {
        let mut queue = Queue::full(3);
        queue.drain();
        queue.close();

        assert_eq!(queue.refill(3, 3), 0);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.take(), Take::Closed);
    }
}
