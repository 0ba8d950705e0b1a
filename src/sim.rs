//! Orchestration: wires the logger, the bakery and the cats onto threads,
//! then shuts them down in order (cats, bakery, logger).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::bakery::Bakery;
use crate::cat::{Cat, CatReport, CatState};
use crate::config::{CatSpec, DEFAULT_FLUSH_THRESHOLD, SimConfig};
use crate::error::{CatError, ConfigError, SimError};
use crate::logger::{EntrySink, FlushPolicy, Logger, LoggerReport, NullSink, StdoutSink};

const CSV_HEADER: &str = "cats,capacity,total_orders,elapsed_ms,throughput_orders_per_s,cpu_user_s,cpu_sys_s,processed,unfulfilled,exploded";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Outcome of one full simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimSummary {
    pub cats: usize,
    pub cakes_baked: usize,
    pub cakes_expected: usize,
    pub processed: usize,
    /// Orders still queued after the bakery worker exited.
    pub unfulfilled: usize,
    pub reports: Vec<CatReport>,
    pub cat_failures: usize,
    pub logger: LoggerReport,
}

impl SimSummary {
    pub fn cats_exploded(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.state == CatState::Exploded)
            .count()
    }
}

/// Run every configured cat against one bakery, logging to `sink`.
pub fn run_simulation(config: &SimConfig, sink: Arc<dyn EntrySink>) -> Result<SimSummary, SimError> {
    config.validate()?;
    let logger = Arc::new(Logger::new(config.flush_policy, sink));
    let bakery = Arc::new(Bakery::new(Arc::clone(&logger)));

    let logger_thread = {
        let logger = Arc::clone(&logger);
        thread::Builder::new()
            .name("logger".to_string())
            .spawn(move || logger.run())?
    };
    let bakery_thread = {
        let bakery = Arc::clone(&bakery);
        let spawned = thread::Builder::new()
            .name("bakery".to_string())
            .spawn(move || bakery.run());
        match spawned {
            Ok(handle) => handle,
            Err(err) => {
                logger.stop();
                logger_thread.join().expect("logger thread panicked");
                return Err(err.into());
            }
        }
    };

    let (cat_handles, spawn_error) = spawn_cats(&config.cats, &logger, &bakery);

    let mut reports = Vec::new();
    let mut cat_failures = 0usize;
    for handle in cat_handles {
        match handle.join().expect("cat thread panicked") {
            Ok(report) => reports.push(report),
            Err(err) => {
                tracing::error!(error = %err, "cat stopped early");
                cat_failures += 1;
            }
        }
    }

    // Every cat has stopped ordering; the bakery may drain and close.
    bakery.close();
    let cakes_baked = bakery_thread.join().expect("bakery thread panicked");
    logger.stop();
    let logger_report = logger_thread.join().expect("logger thread panicked");

    if let Some(err) = spawn_error {
        return Err(err.into());
    }
    Ok(SimSummary {
        cats: config.cats.len(),
        cakes_baked,
        cakes_expected: config.expected_orders(),
        processed: bakery.processed(),
        unfulfilled: bakery.pending(),
        reports,
        cat_failures,
        logger: logger_report,
    })
}

type CatHandle = thread::JoinHandle<Result<CatReport, CatError>>;

/// Spawn one named thread per cat; stops at the first spawn failure.
fn spawn_cats(
    cats: &[CatSpec],
    logger: &Arc<Logger>,
    bakery: &Arc<Bakery>,
) -> (Vec<CatHandle>, Option<std::io::Error>) {
    let mut handles = Vec::with_capacity(cats.len());
    for spec in cats {
        let mut cat = Cat::new(spec.name.clone(), spec.capacity, spec.nap, Arc::clone(logger));
        tracing::debug!(cat = cat.name(), capacity = cat.capacity(), "spawning cat");
        let bakery = Arc::clone(bakery);
        let spawned = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || cat.run(&bakery));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(err) => return (handles, Some(err)),
        }
    }
    (handles, None)
}

/// Run the demo: event log on stdout, followed by a summary.
pub fn run_demo(config: &SimConfig) -> Result<(), SimError> {
    tracing::info!(cats = config.cats.len(), policy = ?config.flush_policy, "starting demo");
    let start = Instant::now();
    let summary = run_simulation(config, Arc::new(StdoutSink))?;
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "demo finished");

    println!("DEMO SUMMARY");
    println!("cats={}", summary.cats);
    println!("cakes_baked={}", summary.cakes_baked);
    println!("cakes_expected={}", summary.cakes_expected);
    println!("cats_exploded={}", summary.cats_exploded());
    println!("cat_failures={}", summary.cat_failures);
    println!("orders_unfulfilled={}", summary.unfulfilled);
    println!("log_entries_printed={}", summary.logger.printed);
    println!("log_entries_dropped={}", summary.logger.dropped);
    Ok(())
}

/// Aggregated metrics from a single benchmark run.
struct BenchResult {
    cats: usize,
    capacity: i64,
    total_orders: usize,
    elapsed_ms: f64,
    throughput: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    processed: usize,
    unfulfilled: usize,
    exploded: usize,
}

impl BenchResult {
    fn csv_row(&self) -> String {
        let cpu_user = self
            .cpu_user_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let cpu_sys = self
            .cpu_sys_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{},{},{:.2},{:.2},{},{},{},{},{}",
            self.cats,
            self.capacity,
            self.total_orders,
            self.elapsed_ms,
            self.throughput,
            cpu_user,
            cpu_sys,
            self.processed,
            self.unfulfilled,
            self.exploded
        )
    }

    fn report_violations(&self) {
        if self.processed != self.total_orders {
            eprintln!(
                "# violation,lost_orders,expected={},processed={}",
                self.total_orders, self.processed
            );
        }
        if self.exploded != self.cats {
            eprintln!("# violation,cats_alive,{}", self.cats - self.exploded);
        }
    }
}

fn bench_once(cats: usize, capacity: i64, nap: Duration) -> Result<BenchResult, SimError> {
    let config = SimConfig {
        cats: (0..cats)
            .map(|id| CatSpec::new(format!("cat-{id}"), capacity, nap))
            .collect(),
        flush_policy: FlushPolicy::Backlog(DEFAULT_FLUSH_THRESHOLD),
    };
    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    let summary = run_simulation(&config, Arc::new(NullSink))?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let total_orders = config.expected_orders();
    let throughput = if elapsed_ms > 0.0 {
        (summary.cakes_baked as f64) / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(BenchResult {
        cats,
        capacity,
        total_orders,
        elapsed_ms,
        throughput,
        cpu_user_s,
        cpu_sys_s,
        processed: summary.processed,
        unfulfilled: summary.unfulfilled,
        exploded: summary.cats_exploded(),
    })
}

/// Run a single benchmark and print one CSV row.
pub fn run_benchmark(cats: usize, capacity: i64, nap_ms: u64, validate: bool) -> Result<(), SimError> {
    if cats == 0 {
        return Err(ConfigError::ZeroValue("cats").into());
    }
    if capacity <= 0 {
        return Err(ConfigError::ZeroValue("capacity").into());
    }
    let result = bench_once(cats, capacity, Duration::from_millis(nap_ms))?;
    println!("{CSV_HEADER}");
    println!("{}", result.csv_row());
    if validate {
        result.report_violations();
    }
    Ok(())
}

/// Sweep cat counts and capacities, printing CSV rows.
pub fn run_stress(cat_sets: &[usize], capacity_sets: &[i64], nap_ms: u64) -> Result<(), SimError> {
    if cat_sets.is_empty() || cat_sets.contains(&0) {
        return Err(ConfigError::ZeroValue("cat sets").into());
    }
    if capacity_sets.is_empty() || capacity_sets.iter().any(|&capacity| capacity <= 0) {
        return Err(ConfigError::ZeroValue("capacity sets").into());
    }
    println!("{CSV_HEADER}");
    for &cats in cat_sets {
        for &capacity in capacity_sets {
            let result = bench_once(cats, capacity, Duration::from_millis(nap_ms))?;
            println!("{}", result.csv_row());
            result.report_violations();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cat::MSG_EXPLODED;
    use crate::logger::MemorySink;

    fn quick_cast(policy: FlushPolicy) -> SimConfig {
        SimConfig {
            cats: vec![
                CatSpec::new("Fluffy", 3, Duration::from_millis(2)),
                CatSpec::new("Choo-Choo", 2, Duration::from_millis(1)),
                CatSpec::new("Chonko", 4, Duration::from_millis(3)),
            ],
            flush_policy: policy,
        }
    }

    fn assert_full_run(policy: FlushPolicy) {
        let sink = Arc::new(MemorySink::new());
        let summary = run_simulation(&quick_cast(policy), sink.clone()).expect("simulation");

        assert_eq!(summary.cakes_baked, 9);
        assert_eq!(summary.cakes_expected, 9);
        assert_eq!(summary.processed, 9);
        assert_eq!(summary.unfulfilled, 0);
        assert_eq!(summary.cats_exploded(), 3);
        assert_eq!(summary.cat_failures, 0);

        // 3 events per order, one explosion per cat, one bake per order, one total.
        let expected_entries = 9 * 3 + 3 + 9 + 1;
        assert_eq!(summary.logger.printed, expected_entries);
        assert_eq!(summary.logger.dropped, 0);

        let entries = sink.entries();
        assert_eq!(entries.len(), expected_entries);
        let explosions = entries.iter().filter(|e| e.message == MSG_EXPLODED).count();
        assert_eq!(explosions, 3);
        let last = entries.last().expect("entries");
        assert_eq!(last.message, "Total Cakes Baked: 9");
    }

    #[test]
    fn three_cats_eat_nine_cakes_backlog_policy() {
        assert_full_run(FlushPolicy::Backlog(5));
    }

    #[test]
    fn three_cats_eat_nine_cakes_timeout_policy() {
        assert_full_run(FlushPolicy::Timeout(Duration::from_millis(5)));
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let mut config = quick_cast(FlushPolicy::Backlog(0));
        let result = run_simulation(&config, Arc::new(NullSink));
        assert!(matches!(result, Err(SimError::Config(ConfigError::ZeroThreshold))));

        config.flush_policy = FlushPolicy::Backlog(5);
        config.cats.clear();
        let result = run_simulation(&config, Arc::new(NullSink));
        assert!(matches!(result, Err(SimError::Config(ConfigError::NoCats))));
    }

    #[test]
    fn bench_processes_every_order() {
        let result = bench_once(8, 25, Duration::ZERO).expect("bench");
        assert_eq!(result.total_orders, 200);
        assert_eq!(result.processed, 200);
        assert_eq!(result.unfulfilled, 0);
        assert_eq!(result.exploded, 8);
        assert_eq!(result.csv_row().split(',').count(), CSV_HEADER.split(',').count());
    }
}
