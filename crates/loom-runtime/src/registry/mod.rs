//! Bootstrap-time registry of capability sets and their fragments.
//!
//! The registry is populated before the runtime goes live and is then moved
//! into [`crate::CompositionRuntime`], which only ever reads it. Fragment
//! declaration order is preserved because chain ordering depends on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::capability::{CapabilitySet, CapabilitySetId};
use crate::fragment::{AppliesTo, FragmentDescriptor, FragmentId};

#[cfg(test)]
mod tests;

/// Errors raised while registering capability sets and fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A capability set with the same identifier is already registered.
    #[error("capability set '{id}' is already registered")]
    DuplicateCapabilitySet {
        /// Identifier of the rejected set.
        id: CapabilitySetId,
    },
    /// A fragment was registered against an unknown capability set.
    #[error("capability set '{id}' is not registered")]
    UnknownCapabilitySet {
        /// Identifier that was not found.
        id: CapabilitySetId,
    },
    /// The capability set already has a fragment with this name.
    #[error("fragment '{name}' is already registered for '{id}'")]
    DuplicateFragment {
        /// Capability set receiving the fragment.
        id: CapabilitySetId,
        /// Name of the rejected fragment.
        name: String,
    },
    /// The capability set declares the same method twice.
    #[error("capability set '{id}' declares {method} more than once")]
    DuplicateMethod {
        /// Identifier of the rejected set.
        id: CapabilitySetId,
        /// The repeated signature.
        method: String,
    },
    /// The descriptor is malformed.
    #[error("invalid fragment descriptor '{name}': {message}")]
    InvalidDescriptor {
        /// Name of the rejected fragment.
        name: String,
        /// Description of the problem.
        message: String,
    },
}

/// A descriptor accepted by the registry.
#[derive(Debug)]
pub struct RegisteredFragment {
    id: FragmentId,
    descriptor: FragmentDescriptor,
}

impl RegisteredFragment {
    /// Returns the registry-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> FragmentId {
        self.id
    }

    /// Returns the descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &FragmentDescriptor {
        &self.descriptor
    }

    /// Returns the fragment name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.descriptor.name()
    }
}

#[derive(Debug)]
pub(crate) struct CapabilityEntry {
    set: CapabilitySet,
    fragments: Vec<Arc<RegisteredFragment>>,
}

impl CapabilityEntry {
    pub(crate) const fn set(&self) -> &CapabilitySet {
        &self.set
    }

    pub(crate) fn fragments(&self) -> &[Arc<RegisteredFragment>] {
        &self.fragments
    }
}

/// Ordered fragment descriptors per capability set.
///
/// # Example
///
/// ```
/// use loom_runtime::{
///     CapabilitySet, Fragment, FragmentDescriptor, FragmentKind, FragmentRegistry,
///     MethodSignature, ParamType, Value,
/// };
///
/// let mut registry = FragmentRegistry::new();
/// let greeter = CapabilitySet::new("Greeter")
///     .with_method(MethodSignature::new("greet", [ParamType::String]));
/// let id = registry.register_capability_set(greeter).expect("fresh set");
/// registry
///     .register_fragment(
///         &id,
///         FragmentDescriptor::new(
///             "hello",
///             FragmentKind::Primary,
///             Fragment::primary_fn(|_| Ok(Value::from("hello"))),
///         ),
///     )
///     .expect("fresh fragment");
/// assert_eq!(registry.fragments(&id).map(<[_]>::len), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    entries: BTreeMap<CapabilitySetId, CapabilityEntry>,
    next_id: u32,
}

impl FragmentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability set and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateCapabilitySet`] when the
    /// identifier is taken and [`RegistrationError::DuplicateMethod`] when
    /// the set repeats a signature.
    pub fn register_capability_set(
        &mut self,
        set: CapabilitySet,
    ) -> Result<CapabilitySetId, RegistrationError> {
        if self.entries.contains_key(set.id()) {
            return Err(RegistrationError::DuplicateCapabilitySet {
                id: set.id().clone(),
            });
        }
        if let Some(method) = set.duplicate_method() {
            return Err(RegistrationError::DuplicateMethod {
                id: set.id().clone(),
                method: method.to_string(),
            });
        }
        let id = set.id().clone();
        self.entries.insert(
            id.clone(),
            CapabilityEntry {
                set,
                fragments: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Appends a fragment to a capability set and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the set is unknown, the name is
    /// taken within the set, or the descriptor is malformed.
    pub fn register_fragment(
        &mut self,
        capability: &CapabilitySetId,
        descriptor: FragmentDescriptor,
    ) -> Result<FragmentId, RegistrationError> {
        validate(&descriptor)?;
        let next_id = self.next_id;
        let entry = self.entries.get_mut(capability).ok_or_else(|| {
            RegistrationError::UnknownCapabilitySet {
                id: capability.clone(),
            }
        })?;
        if entry
            .fragments
            .iter()
            .any(|fragment| fragment.name() == descriptor.name())
        {
            return Err(RegistrationError::DuplicateFragment {
                id: capability.clone(),
                name: descriptor.name().to_owned(),
            });
        }
        let id = FragmentId::new(next_id);
        entry
            .fragments
            .push(Arc::new(RegisteredFragment { id, descriptor }));
        self.next_id = next_id.saturating_add(1);
        Ok(id)
    }

    /// Returns the registered capability set.
    #[must_use]
    pub fn capability_set(&self, id: &CapabilitySetId) -> Option<&CapabilitySet> {
        self.entries.get(id).map(CapabilityEntry::set)
    }

    /// Returns the fragments registered for a set, in declaration order.
    #[must_use]
    pub fn fragments(&self, id: &CapabilitySetId) -> Option<&[Arc<RegisteredFragment>]> {
        self.entries.get(id).map(CapabilityEntry::fragments)
    }

    /// Iterates over the registered set identifiers in sorted order.
    pub fn capability_sets(&self) -> impl Iterator<Item = &CapabilitySetId> {
        self.entries.keys()
    }

    pub(crate) fn entry(&self, id: &CapabilitySetId) -> Option<&CapabilityEntry> {
        self.entries.get(id)
    }
}

fn validate(descriptor: &FragmentDescriptor) -> Result<(), RegistrationError> {
    let invalid = |message: &str| RegistrationError::InvalidDescriptor {
        name: descriptor.name().to_owned(),
        message: message.to_owned(),
    };
    if descriptor.name().trim().is_empty() {
        return Err(invalid("fragment name must not be blank"));
    }
    if let AppliesTo::Targets(targets) = descriptor.applies_to() {
        if targets.is_empty() {
            return Err(invalid("target list must not be empty"));
        }
        if targets.iter().any(|target| target.trim().is_empty()) {
            return Err(invalid("target names must not be blank"));
        }
    }
    Ok(())
}
