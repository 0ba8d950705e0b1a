//! Client loop: order a cake, wait for it, eat it, nap, repeat.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::bakery::Bakery;
use crate::error::CatError;
use crate::logger::Logger;

pub const MSG_ORDERED: &str = "ordered a cake";
pub const MSG_ATE: &str = "ate a cake";
pub const MSG_NAPPING: &str = "is napping";
pub const MSG_EXPLODED: &str = "ate too many cakes and exploded!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatState {
    Active,
    /// Terminal: capacity exhausted.
    Exploded,
}

/// Summary of a finished cat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatReport {
    pub name: String,
    pub orders: usize,
    pub state: CatState,
}

pub struct Cat {
    name: String,
    capacity: i64,
    nap: Duration,
    logger: Arc<Logger>,
    state: CatState,
}

impl Cat {
    pub fn new(name: impl Into<String>, capacity: i64, nap: Duration, logger: Arc<Logger>) -> Self {
        Self {
            name: name.into(),
            capacity,
            nap,
            logger,
            state: CatState::Active,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cakes left before the cat explodes.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    fn log(&self, message: &str) {
        self.logger.log(&self.name, message);
    }

    /// Live until the capacity is exhausted.
    ///
    /// Every cycle subtracts at least one cake, so the loop ends after at most
    /// `capacity` orders. A broken order is fatal for this cat only.
    pub fn run(&mut self, bakery: &Bakery) -> Result<CatReport, CatError> {
        let mut orders = 0usize;
        while self.capacity > 0 {
            let order = bakery.submit();
            self.log(MSG_ORDERED);

            let cakes = order.recv()?;
            if cakes == 0 {
                return Err(CatError::NonPositiveYield {
                    cat: self.name.clone(),
                    amount: cakes,
                });
            }
            self.capacity -= i64::from(cakes);
            orders += 1;
            self.log(MSG_ATE);

            self.log(MSG_NAPPING);
            thread::sleep(self.nap);
        }

        self.state = CatState::Exploded;
        self.log(MSG_EXPLODED);
        tracing::debug!(cat = %self.name, orders, "cat exploded");
        Ok(CatReport {
            name: self.name.clone(),
            orders,
            state: self.state,
        })
    }
}
