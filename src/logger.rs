//! Asynchronous event log: many producers push, one worker prints.
//!
//! Producers never touch the output. `push` only appends under the lock and
//! signals the worker; the worker pops entries and hands them to an
//! [`EntrySink`] with the lock released. When to print is decided by the
//! [`FlushPolicy`]:
//!
//! - `Timeout`: wake on a new entry, on stop, or after the timeout, then print
//!   at most one entry per wake. The timeout bounds staleness, not batch size.
//! - `Backlog`: sleep until the backlog reaches the threshold (or stop), then
//!   drain one entry at a time until the queue is empty.
//!
//! After `stop`, pushes are dropped and the worker drains whatever was
//! accepted before returning.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::types::{CLOCK_UNAVAILABLE, LogEntry};

/// Rule governing when queued entries are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Print one entry per wake; wake at least every `Duration`.
    Timeout(Duration),
    /// Wait for this many queued entries, then drain the queue.
    Backlog(usize),
}

/// Destination for printed entries. Only the logger worker writes to it.
pub trait EntrySink: Send + Sync {
    fn write_entry(&self, entry: &LogEntry);
}

/// Prints entries to stdout as multi-line records.
pub struct StdoutSink;

impl EntrySink for StdoutSink {
    fn write_entry(&self, entry: &LogEntry) {
        let mut out = std::io::stdout().lock();
        if let Err(err) = write!(out, "{}", format_entry(entry)) {
            tracing::warn!(error = %err, "failed to write log entry to stdout");
        }
    }
}

/// Discards every entry.
pub struct NullSink;

impl EntrySink for NullSink {
    fn write_entry(&self, _entry: &LogEntry) {}
}

/// Test sink keeping printed entries in memory, in print order.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
    written: Condvar,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        let guard = self.entries.lock().expect("memory sink mutex poisoned");
        guard.clone()
    }

    pub fn len(&self) -> usize {
        let guard = self.entries.lock().expect("memory sink mutex poisoned");
        guard.len()
    }

    /// Wait until at least `count` entries were written; false on timeout.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let guard = self.entries.lock().expect("memory sink mutex poisoned");
        let (guard, _) = self
            .written
            .wait_timeout_while(guard, timeout, |entries| entries.len() < count)
            .expect("condvar wait failed");
        guard.len() >= count
    }
}

#[cfg(test)]
impl EntrySink for MemorySink {
    fn write_entry(&self, entry: &LogEntry) {
        let mut guard = self.entries.lock().expect("memory sink mutex poisoned");
        guard.push(entry.clone());
        self.written.notify_all();
    }
}

/// Render a Unix timestamp in local time, or `unknown` for the sentinel.
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == CLOCK_UNAVAILABLE {
        return "unknown".to_string();
    }
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%F %T").to_string(),
        None => "unknown".to_string(),
    }
}

/// One printed record, terminated by a blank line.
pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "Time:  {}\nName:  {}\nEvent: {}\n\n",
        format_timestamp(entry.timestamp),
        entry.source,
        entry.message
    )
}

/// Totals reported by [`Logger::run`] once the worker exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoggerReport {
    /// Entries handed to the sink, including the final drain.
    pub printed: usize,
    /// Policy-triggered print cycles (the shutdown drain is not counted).
    pub flush_cycles: usize,
    /// Pushes rejected because the logger had stopped.
    pub dropped: usize,
}

struct LoggerState {
    queue: VecDeque<LogEntry>,
    running: bool,
    dropped: usize,
}

/// Multi-producer, single-consumer log sink.
pub struct Logger {
    state: Mutex<LoggerState>,
    wake: Condvar,
    policy: FlushPolicy,
    sink: Arc<dyn EntrySink>,
}

impl Logger {
    pub fn new(policy: FlushPolicy, sink: Arc<dyn EntrySink>) -> Self {
        Self {
            state: Mutex::new(LoggerState {
                queue: VecDeque::new(),
                running: true,
                dropped: 0,
            }),
            wake: Condvar::new(),
            policy,
            sink,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LoggerState> {
        self.state.lock().expect("logger mutex poisoned")
    }

    /// Queue an entry without blocking on output. Returns false (and drops the
    /// entry) once the logger has been stopped.
    pub fn push(&self, entry: LogEntry) -> bool {
        let mut guard = self.lock_state();
        if !guard.running {
            guard.dropped += 1;
            return false;
        }
        guard.queue.push_back(entry);
        self.wake.notify_one();
        true
    }

    /// Stamp and queue an event from `source`.
    pub fn log(&self, source: &str, message: impl Into<String>) -> bool {
        self.push(LogEntry::new(source, message))
    }

    /// Stop accepting entries and wake the worker for its final drain.
    /// Idempotent.
    pub fn stop(&self) {
        let mut guard = self.lock_state();
        guard.running = false;
        self.wake.notify_all();
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.lock_state().running
    }

    /// Entries accepted but not yet printed.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.lock_state().queue.len()
    }

    #[cfg(test)]
    fn dropped(&self) -> usize {
        self.lock_state().dropped
    }

    /// Worker loop; returns after `stop` once every accepted entry is printed.
    pub fn run(&self) -> LoggerReport {
        let mut report = LoggerReport::default();
        let mut guard = self.lock_state();
        match self.policy {
            FlushPolicy::Timeout(timeout) => loop {
                let (woken, _) = self
                    .wake
                    .wait_timeout_while(guard, timeout, |state| {
                        state.queue.is_empty() && state.running
                    })
                    .expect("condvar wait failed");
                guard = woken;
                if !guard.running {
                    break;
                }
                let next = guard.queue.pop_front();
                if let Some(entry) = next {
                    drop(guard);
                    self.sink.write_entry(&entry);
                    report.printed += 1;
                    report.flush_cycles += 1;
                    guard = self.lock_state();
                }
            },
            FlushPolicy::Backlog(threshold) => loop {
                // A zero threshold would spin on an empty queue.
                let threshold = threshold.max(1);
                guard = self
                    .wake
                    .wait_while(guard, |state| {
                        state.queue.len() < threshold && state.running
                    })
                    .expect("condvar wait failed");
                if !guard.running {
                    break;
                }
                report.flush_cycles += 1;
                tracing::trace!(backlog = guard.queue.len(), "logger backlog flush");
                loop {
                    let Some(entry) = guard.queue.pop_front() else {
                        break;
                    };
                    drop(guard);
                    self.sink.write_entry(&entry);
                    report.printed += 1;
                    guard = self.lock_state();
                }
            },
        }

        // No pushes are accepted past this point, so the queue only shrinks.
        let remaining: Vec<LogEntry> = guard.queue.drain(..).collect();
        report.dropped = guard.dropped;
        drop(guard);
        tracing::debug!(remaining = remaining.len(), "logger final drain");
        for entry in &remaining {
            self.sink.write_entry(entry);
        }
        report.printed += remaining.len();
        report
    }
}
