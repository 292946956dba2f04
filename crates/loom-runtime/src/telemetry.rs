//! Structured telemetry for applications embedding the runtime.
//!
//! The runtime emits `tracing` events on the targets listed in
//! [`RUNTIME_TARGETS`]; a filter such as `warn,loom_runtime::chain=debug`
//! surfaces chain construction without the per-call noise. [`initialise`]
//! installs a stderr subscriber for them from a [`Config`].

use std::io::{self, IsTerminal};

use loom_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use crate::dispatch::DISPATCH_TARGET;
use crate::report::{CHAIN_TARGET, REPORT_TARGET};

/// Targets the runtime logs on: per-call spans, chain construction, and
/// lifecycle reports.
pub const RUNTIME_TARGETS: [&str; 3] = [DISPATCH_TARGET, CHAIN_TARGET, REPORT_TARGET];

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

/// Settings of the installed subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    filter: String,
    format: LogFormat,
}

impl TelemetryHandle {
    /// Returns the filter expression in force.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the output format in force.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression is blank or malformed.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected expression.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return the settings of the first installation; a different
/// `config` does not reconfigure it.
///
/// # Examples
///
/// ```rust
/// use loom_config::{Config, LogFormat};
/// use loom_runtime::telemetry;
///
/// # fn main() -> Result<(), loom_runtime::telemetry::TelemetryError> {
/// let first = telemetry::initialise(&Config::default())?;
/// let again = telemetry::initialise(&Config::default().with_log_format(LogFormat::Compact))?;
/// assert_eq!(again.format(), LogFormat::Json);
/// assert_eq!(first, again);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let subscriber = build_subscriber(config, io::stderr, io::stderr().is_terminal())?;
            tracing::subscriber::set_global_default(subscriber)
                .map_err(TelemetryError::Subscriber)?;
            Ok(TelemetryHandle {
                filter: config.log_filter().to_owned(),
                format: config.log_format(),
            })
        })
        .cloned()
}

fn runtime_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    let expression = config.log_filter();
    let rejected = |message: String| TelemetryError::Filter {
        filter: expression.to_owned(),
        message,
    };
    if expression.trim().is_empty() {
        return Err(rejected(String::from("filter must not be blank")));
    }
    EnvFilter::try_new(expression).map_err(|error| rejected(error.to_string()))
}

fn build_subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::Subscriber::builder()
        .with_env_filter(runtime_filter(config)?)
        .with_target(true)
        .with_level(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
    };
    Ok(subscriber)
}
