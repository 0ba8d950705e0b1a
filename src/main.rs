mod bakery;
mod cat;
mod config;
mod error;
mod logger;
mod logging;
mod result_channel;
mod sim;
mod types;
mod work_queue;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_CATS, DEFAULT_FLUSH_THRESHOLD, DEFAULT_FLUSH_TIMEOUT_MS, FlushPolicyKind, SimConfig,
};
use crate::error::SimError;

/// Cats order cakes from a single bakery; a background logger prints events.
#[derive(Parser, Debug)]
#[command(name = "cat_cakes", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    demo: DemoArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Many zero-nap cats against one bakery; prints a CSV row.
    Bench {
        #[arg(long, default_value_t = 4)]
        cats: usize,
        #[arg(long, default_value_t = 25)]
        capacity: i64,
        #[arg(long, default_value_t = 0)]
        nap_ms: u64,
        /// Report lost orders or surviving cats on stderr.
        #[arg(long)]
        validate: bool,
    },
    /// Sweep cat counts and capacities; prints one CSV row per pair.
    Stress {
        #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8, 12])]
        cat_sets: Vec<usize>,
        #[arg(long, value_delimiter = ',', default_values_t = [10i64, 25, 50])]
        capacity_sets: Vec<i64>,
        #[arg(long, default_value_t = 0)]
        nap_ms: u64,
    },
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Comma-separated cats as name:capacity:nap_ms.
    #[arg(long, env = "CAT_CAKES_CATS", default_value = DEFAULT_CATS)]
    cats: String,

    #[arg(long, env = "CAT_CAKES_FLUSH_POLICY", value_enum, default_value_t = FlushPolicyKind::Backlog)]
    flush_policy: FlushPolicyKind,

    /// Upper bound on how long an entry waits under the timeout policy.
    #[arg(long, env = "CAT_CAKES_FLUSH_TIMEOUT_MS", default_value_t = DEFAULT_FLUSH_TIMEOUT_MS)]
    flush_timeout_ms: u64,

    /// Backlog size that triggers a drain under the backlog policy.
    #[arg(long, env = "CAT_CAKES_FLUSH_THRESHOLD", default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    flush_threshold: usize,
}

impl DemoArgs {
    fn into_config(self) -> Result<SimConfig, SimError> {
        let config = SimConfig {
            cats: config::parse_cats(&self.cats)?,
            flush_policy: config::flush_policy(
                self.flush_policy,
                self.flush_timeout_ms,
                self.flush_threshold,
            )?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), SimError> {
    match cli.command {
        Some(Command::Bench {
            cats,
            capacity,
            nap_ms,
            validate,
        }) => sim::run_benchmark(cats, capacity, nap_ms, validate),
        Some(Command::Stress {
            cat_sets,
            capacity_sets,
            nap_ms,
        }) => sim::run_stress(&cat_sets, &capacity_sets, nap_ms),
        None => sim::run_demo(&cli.demo.into_config()?),
    }
}

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
