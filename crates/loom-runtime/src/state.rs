//! Shared state of composed objects.
//!
//! The runtime never inspects receiver state; it only hands the accessor to
//! fragments through the call frame and the injection context.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::value::Value;

/// Errors raised by state accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The property may not be written.
    #[error("property '{property}' is read-only")]
    ReadOnly {
        /// Name of the rejected property.
        property: String,
    },
    /// The accessor refused the write.
    #[error("write to '{property}' rejected: {message}")]
    Rejected {
        /// Name of the rejected property.
        property: String,
        /// Accessor diagnostic.
        message: String,
    },
}

/// Reads and writes the state of one composed object.
pub trait SharedStateAccessor: Send + Sync {
    /// Returns the current value of `property`, or `None` when unset.
    fn read(&self, property: &str) -> Option<Value>;

    /// Stores `value` under `property`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the accessor refuses the write.
    fn write(&self, property: &str, value: Value) -> Result<(), StateError>;
}

/// Accessor for receivers without state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoState;

impl SharedStateAccessor for NoState {
    fn read(&self, _property: &str) -> Option<Value> {
        None
    }

    fn write(&self, property: &str, _value: Value) -> Result<(), StateError> {
        Err(StateError::ReadOnly {
            property: property.to_owned(),
        })
    }
}

/// In-memory property map.
///
/// # Example
///
/// ```
/// use loom_runtime::{PropertyMap, SharedStateAccessor, Value};
///
/// let state = PropertyMap::new().with_read_only("id", Value::from(7));
/// state.write("name", Value::from("Ann")).expect("writable");
/// assert_eq!(state.read("name"), Some(Value::from("Ann")));
/// assert!(state.write("id", Value::from(8)).is_err());
/// ```
#[derive(Debug, Default)]
pub struct PropertyMap {
    values: RwLock<HashMap<String, Value>>,
    read_only: HashSet<String>,
}

impl PropertyMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a writable property.
    #[must_use]
    pub fn with_property(self, property: impl Into<String>, value: Value) -> Self {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property.into(), value);
        self
    }

    /// Adds a property that rejects writes.
    #[must_use]
    pub fn with_read_only(mut self, property: impl Into<String>, value: Value) -> Self {
        let key = property.into();
        self.read_only.insert(key.clone());
        self.with_property(key, value)
    }

    /// Returns a copy of every property.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SharedStateAccessor for PropertyMap {
    fn read(&self, property: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(property)
            .cloned()
    }

    fn write(&self, property: &str, value: Value) -> Result<(), StateError> {
        if self.read_only.contains(property) {
            return Err(StateError::ReadOnly {
                property: property.to_owned(),
            });
        }
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn property_map_round_trips_writes() {
        let state = PropertyMap::new().with_property("count", Value::from(1));
        state
            .write("count", Value::from(2))
            .expect("count is writable");
        assert_eq!(state.read("count"), Some(Value::from(2)));
        assert_eq!(state.read("missing"), None);
    }

    #[rstest]
    fn read_only_property_rejects_writes() {
        let state = PropertyMap::new().with_read_only("id", Value::from("a-1"));
        let error = state
            .write("id", Value::from("b-2"))
            .expect_err("id is read-only");
        assert_eq!(
            error,
            StateError::ReadOnly {
                property: String::from("id")
            }
        );
        assert_eq!(state.read("id"), Some(Value::from("a-1")));
    }

    #[rstest]
    fn stored_null_differs_from_unset() {
        let state = PropertyMap::new().with_property("nickname", Value::Null);
        assert_eq!(state.read("nickname"), Some(Value::Null));
        assert_eq!(state.read("surname"), None);
    }

    #[rstest]
    fn no_state_is_empty_and_read_only() {
        assert_eq!(NoState.read("anything"), None);
        assert!(matches!(
            NoState.write("anything", Value::Null),
            Err(StateError::ReadOnly { .. })
        ));
    }

    #[rstest]
    fn snapshot_copies_all_properties() {
        let state = PropertyMap::new()
            .with_property("a", Value::from(1))
            .with_read_only("b", Value::from(2));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("b"), Some(&Value::from(2)));
    }
}
