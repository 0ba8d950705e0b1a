//! Error types shared by the bakery, the cats, and the CLI runners.

use thiserror::Error;

/// Failures observed on a one-shot result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The sender was dropped without ever sending a value.
    #[error("broken channel: sender dropped without fulfilling")]
    Broken,
    /// `send` was called on a sender that already delivered its value.
    #[error("double fulfillment: result already sent")]
    DoubleFulfillment,
}

/// Failures that end a cat's life early.
#[derive(Debug, Error)]
pub enum CatError {
    #[error("cake order failed: {0}")]
    Channel(#[from] ChannelError),
    /// A non-positive yield would stop the capacity countdown.
    #[error("cat {cat} received a non-positive cake yield ({amount})")]
    NonPositiveYield { cat: String, amount: u32 },
}

/// Invalid simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid cat spec '{0}': expected name:capacity:nap_ms")]
    MalformedCat(String),
    #[error("invalid cat spec '{spec}': {field} is not a valid number")]
    InvalidNumber { spec: String, field: &'static str },
    #[error("cat names must not be empty")]
    EmptyName,
    #[error("at least one cat is required")]
    NoCats,
    #[error("flush threshold must be > 0")]
    ZeroThreshold,
    #[error("flush timeout must be > 0ms")]
    ZeroTimeout,
    #[error("{0} must be > 0")]
    ZeroValue(&'static str),
}

/// Errors surfaced by the simulation runners.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
