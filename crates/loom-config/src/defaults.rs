use crate::composition::{AfterOrder, ChainBuild};
use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "LOOM_";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default chain construction strategy.
#[must_use]
pub const fn default_chain_build() -> ChainBuild {
    ChainBuild::Lazy
}

/// Default after-interceptor ordering.
#[must_use]
pub const fn default_after_order() -> AfterOrder {
    AfterOrder::Declaration
}
