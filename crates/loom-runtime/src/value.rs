//! Dynamic values flowing through invocation chains.
//!
//! Arguments and results are [`serde_json::Value`]s. `Value::Null` is the
//! empty answer a method may legitimately return; "no result yet" is
//! modelled separately with [`ResultSlot::Pending`] (or `Option::None`), so
//! the two never collapse into one another.

use serde::{Deserialize, Serialize};

/// Dynamic value passed as an argument or returned as a result.
pub use serde_json::Value;

/// Ordered argument list for one call.
pub type Args = Vec<Value>;

/// Declared type of one method parameter or return value.
///
/// # Example
///
/// ```
/// use loom_runtime::{ParamType, Value};
///
/// assert!(ParamType::String.accepts(&Value::from("Ann")));
/// assert!(!ParamType::Integer.accepts(&Value::from(1.5)));
/// assert!(ParamType::Any.accepts(&Value::Null));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Accepts every value.
    Any,
    /// Accepts only `null`.
    Null,
    /// Accepts booleans.
    Bool,
    /// Accepts whole numbers.
    Integer,
    /// Accepts any number.
    Number,
    /// Accepts strings.
    String,
    /// Accepts arrays.
    Array,
    /// Accepts objects.
    Object,
}

impl ParamType {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Returns `true` when `value` inhabits this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a call as observed from inside the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultSlot {
    /// The chain has not produced a result yet.
    #[default]
    Pending,
    /// The chain returned this value (possibly `Value::Null`).
    Returned(Value),
}

impl ResultSlot {
    /// Returns the recorded value, or `None` while pending.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Pending => None,
            Self::Returned(value) => Some(value),
        }
    }

    /// Returns `true` once a value has been recorded.
    #[must_use]
    pub const fn is_returned(&self) -> bool {
        matches!(self, Self::Returned(_))
    }
}
