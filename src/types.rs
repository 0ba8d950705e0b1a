//! Shared request and log-entry models used across the simulation.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::result_channel::ResultSender;

/// Number of cakes a single fulfilled order yields.
pub type CakeCount = u32;

/// Timestamp recorded when the system clock cannot be read.
pub const CLOCK_UNAVAILABLE: i64 = -1;

/// A pending cake order; its FIFO position is its identity.
pub struct CakeOrder {
    /// Sending half of the ordering cat's result channel.
    pub fulfil: ResultSender<CakeCount>,
}

impl CakeOrder {
    pub fn new(fulfil: ResultSender<CakeCount>) -> Self {
        Self { fulfil }
    }
}

/// One immutable event for the async logger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Who emitted the event (a cat's name, or "bakery").
    pub source: String,
    /// Human-readable event text.
    pub message: String,
    /// Seconds since the Unix epoch, or [`CLOCK_UNAVAILABLE`].
    pub timestamp: i64,
}

impl LogEntry {
    /// Stamp a new entry with the current wall-clock time.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            timestamp: current_timestamp(),
        }
    }

    #[cfg(test)]
    pub fn with_timestamp(
        source: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            timestamp,
        }
    }
}

/// Current Unix time in seconds; falls back to the sentinel on clock failure.
pub fn current_timestamp() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(CLOCK_UNAVAILABLE),
        Err(err) => {
            tracing::warn!(error = %err, "system clock before unix epoch; using sentinel");
            CLOCK_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_stamped_with_current_time() {
        let entry = LogEntry::new("Fluffy", "ordered a cake");
        assert_eq!(entry.source, "Fluffy");
        assert_eq!(entry.message, "ordered a cake");
        // Any sane clock is well past 2020-01-01.
        assert!(entry.timestamp > 1_577_836_800);
    }
}
