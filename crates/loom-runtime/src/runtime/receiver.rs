//! Composed objects and their per-instance fragments.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::capability::MethodKey;
use crate::fragment::{FactoryError, Fragment, FragmentId};
use crate::state::{NoState, SharedStateAccessor};

static NEXT_RECEIVER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u64);

impl ReceiverId {
    fn next() -> Self {
        Self(NEXT_RECEIVER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

/// Cache key of a per-receiver fragment instance.
///
/// Instances belong to one realized type. Primaries serve every method of
/// their receiver; other kinds are kept per method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InstanceKey {
    realized: u64,
    fragment: FragmentId,
    method: Option<MethodKey>,
}

impl InstanceKey {
    pub(crate) const fn new(
        realized: u64,
        fragment: FragmentId,
        method: Option<MethodKey>,
    ) -> Self {
        Self {
            realized,
            fragment,
            method,
        }
    }
}

/// A composed object: opaque state plus the fragment instances it owns.
///
/// # Example
///
/// ```
/// use loom_runtime::{PropertyMap, Receiver, SharedStateAccessor, Value};
///
/// let receiver = Receiver::with_state(PropertyMap::new().with_property("name", Value::from("Ann")));
/// assert_eq!(receiver.state().read("name"), Some(Value::from("Ann")));
/// assert_ne!(receiver.id(), Receiver::stateless().id());
/// ```
pub struct Receiver {
    id: ReceiverId,
    state: Arc<dyn SharedStateAccessor>,
    instances: Mutex<HashMap<InstanceKey, Fragment>>,
}

impl Receiver {
    /// Creates a receiver over shared state.
    #[must_use]
    pub fn new(state: Arc<dyn SharedStateAccessor>) -> Self {
        Self {
            id: ReceiverId::next(),
            state,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a receiver owning `state`.
    #[must_use]
    pub fn with_state(state: impl SharedStateAccessor + 'static) -> Self {
        Self::new(Arc::new(state))
    }

    /// Creates a receiver without state.
    #[must_use]
    pub fn stateless() -> Self {
        Self::with_state(NoState)
    }

    /// Returns the receiver identity.
    #[must_use]
    pub const fn id(&self) -> ReceiverId {
        self.id
    }

    /// Returns the receiver state.
    #[must_use]
    pub fn state(&self) -> &dyn SharedStateAccessor {
        self.state.as_ref()
    }

    /// Returns how many fragment instances the receiver owns.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the cached instance for `key`, creating it when absent.
    ///
    /// `create` runs without the lock held. When two threads race, the
    /// first instance stored wins and both callers receive it.
    pub(crate) fn instance<F>(&self, key: InstanceKey, create: F) -> Result<Fragment, FactoryError>
    where
        F: FnOnce() -> Result<Fragment, FactoryError>,
    {
        if let Some(existing) = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(existing.clone());
        }
        let created = create()?;
        Ok(self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(created)
            .clone())
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::stateless()
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("id", &self.id)
            .field("instances", &self.instance_count())
            .finish_non_exhaustive()
    }
}
