//! Simulation configuration: the cast of cats and the logger flush policy.

use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::ConfigError;
use crate::logger::FlushPolicy;

/// The original cast, with naps in milliseconds.
pub const DEFAULT_CATS: &str = "Fluffy:3:400,Choo-Choo:2:300,Chonko:4:500";
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_FLUSH_THRESHOLD: usize = 5;

/// One cat parsed from `name:capacity:nap_ms`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatSpec {
    pub name: String,
    pub capacity: i64,
    pub nap: Duration,
}

impl CatSpec {
    pub fn new(name: impl Into<String>, capacity: i64, nap: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            nap,
        }
    }
}

impl FromStr for CatSpec {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        let [name, capacity, nap_ms] = parts.as_slice() else {
            return Err(ConfigError::MalformedCat(spec.to_string()));
        };
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let capacity = capacity
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidNumber {
                spec: spec.to_string(),
                field: "capacity",
            })?;
        let nap_ms = nap_ms
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                spec: spec.to_string(),
                field: "nap_ms",
            })?;
        Ok(Self::new(*name, capacity, Duration::from_millis(nap_ms)))
    }
}

/// Parse a comma-separated list of cat specs.
pub fn parse_cats(list: &str) -> Result<Vec<CatSpec>, ConfigError> {
    let cats = list
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(CatSpec::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    if cats.is_empty() {
        return Err(ConfigError::NoCats);
    }
    Ok(cats)
}

/// CLI-facing choice of flush policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FlushPolicyKind {
    Timeout,
    Backlog,
}

/// Build a flush policy, rejecting parameters that would never flush.
pub fn flush_policy(
    kind: FlushPolicyKind,
    timeout_ms: u64,
    threshold: usize,
) -> Result<FlushPolicy, ConfigError> {
    match kind {
        FlushPolicyKind::Timeout if timeout_ms == 0 => Err(ConfigError::ZeroTimeout),
        FlushPolicyKind::Timeout => Ok(FlushPolicy::Timeout(Duration::from_millis(timeout_ms))),
        FlushPolicyKind::Backlog if threshold == 0 => Err(ConfigError::ZeroThreshold),
        FlushPolicyKind::Backlog => Ok(FlushPolicy::Backlog(threshold)),
    }
}

/// Everything the demo orchestrator needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub cats: Vec<CatSpec>,
    pub flush_policy: FlushPolicy,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cats.is_empty() {
            return Err(ConfigError::NoCats);
        }
        if self.cats.iter().any(|cat| cat.name.trim().is_empty()) {
            return Err(ConfigError::EmptyName);
        }
        match self.flush_policy {
            FlushPolicy::Timeout(timeout) if timeout.is_zero() => Err(ConfigError::ZeroTimeout),
            FlushPolicy::Backlog(0) => Err(ConfigError::ZeroThreshold),
            _ => Ok(()),
        }
    }

    /// Total orders the cast will place with a yield of one cake per order.
    pub fn expected_orders(&self) -> usize {
        self.cats
            .iter()
            .map(|cat| usize::try_from(cat.capacity.max(0)).unwrap_or(0))
            .sum()
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cats: parse_cats(DEFAULT_CATS).unwrap_or_default(),
            flush_policy: FlushPolicy::Backlog(DEFAULT_FLUSH_THRESHOLD),
        }
    }
}
