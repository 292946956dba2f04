//! Knobs that shape how invocation chains are built.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// When invocation chains are constructed.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChainBuild {
    /// Build each chain on the first dispatch to its method.
    #[default]
    Lazy,
    /// Build and publish every chain while the type is realized.
    Eager,
}

/// Order in which after-interceptors observe the primary result.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AfterOrder {
    /// The first declared after-interceptor sees the result first.
    #[default]
    Declaration,
    /// The last declared after-interceptor sees the result first.
    Reverse,
}
