//! One-shot result handoff between a fulfiller and a single waiter.

use std::mem;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::ChannelError;

enum Slot<T> {
    Empty,
    Fulfilled(T),
    /// Sender dropped while the slot was still empty.
    Abandoned,
    /// Value already handed to the receiver.
    Consumed,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Writing half; delivers at most one value.
pub struct ResultSender<T> {
    shared: Arc<Shared<T>>,
    sent: bool,
}

/// Reading half; `recv` consumes it so the value is read exactly once.
pub struct ResultReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected sender/receiver pair sharing one empty slot.
pub fn channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Empty),
        ready: Condvar::new(),
    });
    (
        ResultSender {
            shared: Arc::clone(&shared),
            sent: false,
        },
        ResultReceiver { shared },
    )
}

impl<T> ResultSender<T> {
    /// Fulfill the channel and wake the waiter.
    ///
    /// A second call fails with [`ChannelError::DoubleFulfillment`] and the
    /// new value is discarded. Sending after the receiver was dropped still
    /// succeeds; the value is simply never read.
    pub fn send(&mut self, value: T) -> Result<(), ChannelError> {
        if self.sent {
            return Err(ChannelError::DoubleFulfillment);
        }
        let mut guard = self.shared.slot.lock().expect("result channel mutex poisoned");
        if !matches!(*guard, Slot::Empty) {
            return Err(ChannelError::DoubleFulfillment);
        }
        *guard = Slot::Fulfilled(value);
        self.sent = true;
        self.shared.ready.notify_one();
        Ok(())
    }
}

impl<T> Drop for ResultSender<T> {
    fn drop(&mut self) {
        if self.sent {
            return;
        }
        // Avoid a double panic if another holder poisoned the lock.
        if let Ok(mut guard) = self.shared.slot.lock() {
            if matches!(*guard, Slot::Empty) {
                *guard = Slot::Abandoned;
            }
            self.shared.ready.notify_one();
        }
    }
}

impl<T> ResultReceiver<T> {
    /// Block until the value arrives or the sender is dropped unfulfilled.
    pub fn recv(self) -> Result<T, ChannelError> {
        let guard = self.shared.slot.lock().expect("result channel mutex poisoned");
        // Predicate is re-checked on every wake, spurious or not.
        let mut guard = self
            .shared
            .ready
            .wait_while(guard, |slot| matches!(slot, Slot::Empty))
            .expect("condvar wait failed");
        match mem::replace(&mut *guard, Slot::Consumed) {
            Slot::Fulfilled(value) => Ok(value),
            Slot::Abandoned => Err(ChannelError::Broken),
            Slot::Empty | Slot::Consumed => {
                unreachable!("receiver is consumed by recv and waits past Empty")
            }
        }
    }

    /// Non-blocking check for a delivered value.
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        let guard = self.shared.slot.lock().expect("result channel mutex poisoned");
        matches!(*guard, Slot::Fulfilled(_))
    }
}
