//! Lock-guarded FIFO of pending requests with a drain-on-close consumer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A synchronized FIFO that keeps accepting pushes and hands out items
/// until it is both closed and empty.
pub struct WorkQueue<T> {
    inner: Mutex<WorkQueueState<T>>,
    available: Condvar,
}

struct WorkQueueState<T> {
    queue: VecDeque<T>,
    accepting: bool,
    processed: usize,
}

impl<T> WorkQueue<T> {
    /// Create an empty, accepting queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(WorkQueueState {
                queue: VecDeque::new(),
                accepting: true,
                processed: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the tail and wake one waiting consumer.
    ///
    /// Returns whether the queue was still accepting. The item is enqueued
    /// either way: a push racing with `close` must still be drained.
    pub fn push(&self, item: T) -> bool {
        let mut guard = self.inner.lock().expect("work queue mutex poisoned");
        guard.queue.push_back(item);
        self.available.notify_one();
        guard.accepting
    }

    /// Try to pop immediately without blocking.
    #[cfg(test)]
    pub fn try_pop(&self) -> Option<T> {
        let mut guard = self.inner.lock().expect("work queue mutex poisoned");
        let item = guard.queue.pop_front();
        if item.is_some() {
            guard.processed += 1;
        }
        item
    }

    /// Block until an item is available, or return `None` once the queue is
    /// closed and fully drained.
    pub fn pop_blocking_or_closed(&self) -> Option<T> {
        let guard = self.inner.lock().expect("work queue mutex poisoned");
        // Wait releases the lock and re-checks the predicate on every wake.
        let mut guard = self
            .available
            .wait_while(guard, |state| state.queue.is_empty() && state.accepting)
            .expect("condvar wait failed");
        let item = guard.queue.pop_front();
        if item.is_some() {
            guard.processed += 1;
        }
        item
    }

    /// Stop accepting and wake every blocked consumer. Idempotent.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("work queue mutex poisoned");
        guard.accepting = false;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub fn is_accepting(&self) -> bool {
        let guard = self.inner.lock().expect("work queue mutex poisoned");
        guard.accepting
    }

    /// Current number of queued items.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("work queue mutex poisoned");
        guard.queue.len()
    }

    /// Items handed out to consumers so far.
    pub fn processed(&self) -> usize {
        let guard = self.inner.lock().expect("work queue mutex poisoned");
        guard.processed
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn items_come_out_in_fifo_order() {
        let queue = WorkQueue::new();
        for id in 0..10u64 {
            assert!(queue.push(id));
        }
        queue.close();
        let mut drained = Vec::new();
        while let Some(id) = queue.pop_blocking_or_closed() {
            drained.push(id);
        }
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
        assert_eq!(queue.processed(), 10);
    }

    #[test]
    fn concurrent_producers_each_item_consumed_once() {
        let queue = Arc::new(WorkQueue::new());
        let producers = 4;
        let per_producer = 50u64;
        let barrier = Arc::new(Barrier::new(producers));

        let mut handles = Vec::new();
        for producer in 0..producers as u64 {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for n in 0..per_producer {
                    queue.push(producer * 1000 + n);
                }
            }));
        }

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = HashSet::new();
                while let Some(item) = queue.pop_blocking_or_closed() {
                    // Each item should be observed at most once.
                    assert!(seen.insert(item));
                }
                seen.len()
            })
        };

        for handle in handles {
            handle.join().expect("producer thread panicked");
        }
        queue.close();
        let consumed = consumer.join().expect("consumer thread panicked");
        assert_eq!(consumed, producers * per_producer as usize);
        assert_eq!(queue.processed(), consumed);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pop_blocking_wakes_on_push() {
        let queue = Arc::new(WorkQueue::new());
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("send ready");
            let item = queue_clone
                .pop_blocking_or_closed()
                .expect("work queue closed");
            tx.send(item).expect("send item");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        // Pushing after the consumer blocks should wake it.
        queue.push(99u64);

        let received = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive item");
        assert_eq!(received, 99);
        handle.join().expect("blocking pop thread panicked");
    }

    #[test]
    fn pop_blocking_or_closed_unblocks_on_close() {
        let queue = Arc::new(WorkQueue::<u64>::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("ready");
            let item = queue_clone.pop_blocking_or_closed();
            done_tx.send(item.is_none()).expect("done");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        queue.close();

        let closed = done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("done recv");
        assert!(closed);
        handle.join().expect("consumer thread panicked");
    }

    #[test]
    fn close_keeps_queued_items_for_draining() {
        let queue = WorkQueue::new();
        queue.push(1u64);
        queue.push(2u64);
        queue.close();
        assert_eq!(queue.pop_blocking_or_closed(), Some(1));
        assert_eq!(queue.pop_blocking_or_closed(), Some(2));
        assert_eq!(queue.pop_blocking_or_closed(), None);
    }

    #[test]
    fn push_after_close_is_still_enqueued() {
        let queue = WorkQueue::new();
        queue.close();
        assert!(!queue.push(1u64));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn close_is_idempotent() {
        let queue = WorkQueue::<u64>::new();
        queue.close();
        queue.close();
        assert!(!queue.is_accepting());
        assert_eq!(queue.pop_blocking_or_closed(), None);
    }
}
