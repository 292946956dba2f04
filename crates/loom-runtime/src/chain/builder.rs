//! Chain construction: filtering, primary selection and ordering.

use std::sync::Arc;

use loom_config::AfterOrder;

use crate::capability::{CapabilitySet, MethodSignature};
use crate::error::{CompositionDefect, CompositionError};
use crate::fragment::{FragmentFactory, FragmentKind, InjectionContext, InstanceScope, instantiate};
use crate::registry::RegisteredFragment;
use crate::resolver::applies;

use super::{ChainLink, InvocationChain};

/// Builds invocation chains for the methods of one capability set.
pub struct ChainBuilder<'a> {
    capability: &'a CapabilitySet,
    fragments: &'a [Arc<RegisteredFragment>],
    factory: &'a dyn FragmentFactory,
    after_order: AfterOrder,
}

impl<'a> ChainBuilder<'a> {
    /// Creates a builder over `fragments`, given in declaration order.
    #[must_use]
    pub fn new(
        capability: &'a CapabilitySet,
        fragments: &'a [Arc<RegisteredFragment>],
        factory: &'a dyn FragmentFactory,
    ) -> Self {
        Self {
            capability,
            fragments,
            factory,
            after_order: AfterOrder::default(),
        }
    }

    /// Overrides the order after-interceptor post-logic runs in.
    #[must_use]
    pub const fn with_after_order(mut self, after_order: AfterOrder) -> Self {
        self.after_order = after_order;
        self
    }

    /// Selects the single most specific applicable primary for `method`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidComposition`] with
    /// [`CompositionDefect::NoPrimary`] when nothing implements the method
    /// and [`CompositionDefect::AmbiguousPrimary`] when several candidates
    /// are equally specific.
    pub fn select_primary(
        &self,
        method: &MethodSignature,
    ) -> Result<&'a Arc<RegisteredFragment>, CompositionError> {
        let candidates: Vec<&'a Arc<RegisteredFragment>> = self
            .fragments
            .iter()
            .filter(|fragment| {
                let descriptor = fragment.descriptor();
                descriptor.kind() == FragmentKind::Primary
                    && descriptor.class().provides(method)
                    && applies(descriptor, method, self.capability, descriptor.class())
            })
            .collect();
        if candidates.is_empty() {
            return Err(self.defect(CompositionDefect::NoPrimary {
                method: method.to_string(),
            }));
        }
        let unbeaten: Vec<&'a Arc<RegisteredFragment>> = candidates
            .iter()
            .copied()
            .filter(|candidate| {
                !candidates.iter().any(|other| {
                    other
                        .descriptor()
                        .class()
                        .is_more_specific_than(candidate.descriptor().class(), method)
                })
            })
            .collect();
        match unbeaten.as_slice() {
            [selected] => Ok(*selected),
            _ => Err(self.defect(CompositionDefect::AmbiguousPrimary {
                method: method.to_string(),
                candidates: unbeaten
                    .iter()
                    .map(|candidate| candidate.name().to_owned())
                    .collect(),
            })),
        }
    }

    /// Builds the chain for `method`.
    ///
    /// Shared-scope fragments are instantiated here; per-receiver fragments
    /// are left for dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidComposition`] when the capability
    /// set does not declare the method or no unique primary exists, and
    /// [`CompositionError::NoSuchFragment`] when a shared fragment cannot be
    /// instantiated.
    pub fn build(&self, method: &MethodSignature) -> Result<InvocationChain, CompositionError> {
        if !self.capability.declares(method) {
            return Err(self.defect(CompositionDefect::UnknownMethod {
                method: method.to_string(),
            }));
        }
        let primary = self.select_primary(method)?;
        let candidate = primary.descriptor().class();

        let mut constraints = Vec::new();
        let mut befores = Vec::new();
        let mut afters = Vec::new();
        let mut reactions = Vec::new();
        for fragment in self.fragments {
            let descriptor = fragment.descriptor();
            let bucket = match descriptor.kind() {
                FragmentKind::Primary => continue,
                FragmentKind::Constraint => &mut constraints,
                FragmentKind::Before => &mut befores,
                FragmentKind::After => &mut afters,
                FragmentKind::Reactive => &mut reactions,
            };
            if applies(descriptor, method, self.capability, candidate) {
                bucket.push(self.link(fragment, method)?);
            }
        }
        // The innermost after-interceptor post-processes first.
        if self.after_order == AfterOrder::Declaration {
            afters.reverse();
        }

        let mut links = constraints;
        links.extend(befores);
        links.extend(afters);
        links.push(self.link(primary, method)?);
        Ok(InvocationChain {
            key: self.capability.key_for(method),
            method: method.clone(),
            links,
            reactions,
        })
    }

    fn link(
        &self,
        fragment: &Arc<RegisteredFragment>,
        method: &MethodSignature,
    ) -> Result<ChainLink, CompositionError> {
        let shared = match fragment.descriptor().scope() {
            InstanceScope::PerReceiver => None,
            InstanceScope::Shared => {
                let context = InjectionContext::new(fragment.descriptor(), self.capability)
                    .for_method(method);
                let instance = instantiate(self.factory, &context).map_err(|source| {
                    CompositionError::NoSuchFragment {
                        fragment: fragment.name().to_owned(),
                        method: self.capability.key_for(method).to_string(),
                        source,
                    }
                })?;
                Some(instance)
            }
        };
        Ok(ChainLink::new(Arc::clone(fragment), shared))
    }

    fn defect(&self, defect: CompositionDefect) -> CompositionError {
        CompositionError::invalid(self.capability.id().clone(), defect)
    }
}
