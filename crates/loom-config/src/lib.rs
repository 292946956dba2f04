//! Shared configuration for the loom composition runtime.
//!
//! [`Config`] carries the knobs the runtime consults while realizing types
//! (chain construction strategy, after-interceptor ordering) together with
//! the logging settings used by telemetry. It is loaded with `ortho_config`,
//! layering defaults, an optional `.loom.toml` file, `LOOM_*` environment
//! variables and command-line flags in increasing precedence. Unrecognised
//! values fail fast with an [`OrthoError`].

mod composition;
mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use composition::{AfterOrder, ChainBuild};
pub use defaults::{
    DEFAULT_LOG_FILTER, ENV_PREFIX, default_after_order, default_chain_build, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoError;

/// Runtime configuration.
///
/// # Example
///
/// ```
/// use loom_config::{AfterOrder, ChainBuild, Config};
///
/// let config = Config::load_from_iter(["loom", "--chain-build", "eager"]).expect("valid");
/// assert_eq!(config.chain_build(), ChainBuild::Eager);
/// assert_eq!(config.after_order(), AfterOrder::Declaration);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOOM")]
pub struct Config {
    #[serde(default = "default_chain_build")]
    chain_build: ChainBuild,
    #[serde(default = "default_after_order")]
    after_order: AfterOrder,
    #[serde(default = "default_log_filter_string")]
    log_filter: String,
    #[serde(default = "default_log_format")]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_build: default_chain_build(),
            after_order: default_after_order(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Overrides the chain construction strategy.
    #[must_use]
    pub const fn with_chain_build(mut self, chain_build: ChainBuild) -> Self {
        self.chain_build = chain_build;
        self
    }

    /// Overrides the after-interceptor ordering.
    #[must_use]
    pub const fn with_after_order(mut self, after_order: AfterOrder) -> Self {
        self.after_order = after_order;
        self
    }

    /// Overrides the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, log_filter: impl Into<String>) -> Self {
        self.log_filter = log_filter.into();
        self
    }

    /// Overrides the log output format.
    #[must_use]
    pub const fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// Returns the chain construction strategy.
    #[must_use]
    pub const fn chain_build(&self) -> ChainBuild {
        self.chain_build
    }

    /// Returns the after-interceptor ordering.
    #[must_use]
    pub const fn after_order(&self) -> AfterOrder {
        self.after_order
    }

    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
