//! Cake fulfillment engine: many cats order, one baker fulfills.

use std::sync::Arc;

use crate::logger::Logger;
use crate::result_channel::{self, ResultReceiver};
use crate::types::{CakeCount, CakeOrder};
use crate::work_queue::WorkQueue;

/// Log source name used for bakery events.
pub const BAKERY_SOURCE: &str = "bakery";
/// Cakes delivered per fulfilled order.
pub const CAKE_YIELD: CakeCount = 1;

/// Owns the order queue and fulfills each order exactly once.
///
/// `close` must be sequenced after every cat has stopped ordering; orders
/// accepted before the worker exits are always drained, but an order placed
/// after `run` has returned is never serviced.
pub struct Bakery {
    orders: WorkQueue<CakeOrder>,
    logger: Arc<Logger>,
    cake_yield: CakeCount,
}

impl Bakery {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::with_yield(logger, CAKE_YIELD)
    }

    /// Bakery delivering `cake_yield` cakes per order.
    pub fn with_yield(logger: Arc<Logger>, cake_yield: CakeCount) -> Self {
        Self {
            orders: WorkQueue::new(),
            logger,
            cake_yield,
        }
    }

    /// Place an order; returns immediately with the receiving half.
    pub fn submit(&self) -> ResultReceiver<CakeCount> {
        let (fulfil, receiver) = result_channel::channel();
        if !self.orders.push(CakeOrder::new(fulfil)) {
            tracing::debug!("order accepted after bakery closed");
        }
        receiver
    }

    /// Stop waiting for new orders once the queue drains. Idempotent.
    pub fn close(&self) {
        tracing::debug!(pending = self.orders.len(), "closing bakery");
        self.orders.close();
    }

    /// Worker loop: fulfill orders in FIFO order until closed and drained.
    /// Returns the number of orders baked.
    pub fn run(&self) -> usize {
        let mut baked = 0usize;
        while let Some(mut order) = self.orders.pop_blocking_or_closed() {
            match order.fulfil.send(self.cake_yield) {
                Ok(()) => {
                    baked += 1;
                    self.logger.log(BAKERY_SOURCE, "baked a cake");
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to fulfil cake order");
                }
            }
        }
        self.logger
            .log(BAKERY_SOURCE, format!("Total Cakes Baked: {baked}"));
        tracing::info!(baked, "bakery closed");
        baked
    }

    /// Orders dequeued by the worker so far.
    pub fn processed(&self) -> usize {
        self.orders.processed()
    }

    /// Orders waiting to be baked.
    pub fn pending(&self) -> usize {
        self.orders.len()
    }
}
