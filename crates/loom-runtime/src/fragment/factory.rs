//! Construction of fragment instances.

use thiserror::Error;

use crate::capability::{CapabilitySet, MethodSignature};
use crate::runtime::ReceiverId;
use crate::state::SharedStateAccessor;

use super::{Fragment, FragmentDescriptor, FragmentKind, TargetFactory};

/// Errors raised while obtaining a fragment instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No factory knows how to locate the requested fragment.
    #[error("no factory can locate '{key}'")]
    Unlocatable {
        /// Locator key from [`TargetFactory::Located`].
        key: String,
    },
    /// The factory produced an instance of the wrong kind.
    #[error("expected a {expected} fragment but the factory produced a {found}")]
    KindMismatch {
        /// Kind declared by the descriptor.
        expected: FragmentKind,
        /// Variant actually produced.
        found: &'static str,
    },
    /// The constructor failed.
    #[error("fragment construction failed: {message}")]
    Failed {
        /// Diagnostic describing the failure.
        message: String,
    },
}

impl FactoryError {
    /// Builds a [`FactoryError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Everything a factory may consult while creating an instance.
#[derive(Clone, Copy)]
pub struct InjectionContext<'a> {
    descriptor: &'a FragmentDescriptor,
    capability: &'a CapabilitySet,
    method: Option<&'a MethodSignature>,
    receiver: Option<(ReceiverId, &'a dyn SharedStateAccessor)>,
}

impl<'a> InjectionContext<'a> {
    pub(crate) const fn new(
        descriptor: &'a FragmentDescriptor,
        capability: &'a CapabilitySet,
    ) -> Self {
        Self {
            descriptor,
            capability,
            method: None,
            receiver: None,
        }
    }

    pub(crate) const fn for_method(mut self, method: &'a MethodSignature) -> Self {
        self.method = Some(method);
        self
    }

    pub(crate) const fn for_receiver(
        mut self,
        receiver: ReceiverId,
        state: &'a dyn SharedStateAccessor,
    ) -> Self {
        self.receiver = Some((receiver, state));
        self
    }

    /// Returns the descriptor being instantiated.
    #[must_use]
    pub const fn descriptor(&self) -> &'a FragmentDescriptor {
        self.descriptor
    }

    /// Returns the capability set the fragment serves.
    #[must_use]
    pub const fn capability(&self) -> &'a CapabilitySet {
        self.capability
    }

    /// Returns the method whose chain requested the instance.
    ///
    /// Primary instances serve every method of their receiver, so they are
    /// created without one.
    #[must_use]
    pub const fn method(&self) -> Option<&'a MethodSignature> {
        self.method
    }

    /// Returns the receiver the instance will belong to, if any.
    ///
    /// Shared instances are created while the chain is built and have no
    /// receiver.
    #[must_use]
    pub fn receiver(&self) -> Option<ReceiverId> {
        self.receiver.map(|(id, _)| id)
    }

    /// Returns the receiver's shared state.
    #[must_use]
    pub fn state(&self) -> Option<&'a dyn SharedStateAccessor> {
        self.receiver.map(|(_, state)| state)
    }
}

/// Constructs or locates fragment instances.
pub trait FragmentFactory: Send + Sync {
    /// Produces an instance for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError`] when no instance can be produced.
    fn create(
        &self,
        descriptor: &FragmentDescriptor,
        context: &InjectionContext<'_>,
    ) -> Result<Fragment, FactoryError>;
}

/// Factory serving singleton and constructor targets.
///
/// Located targets need an application-supplied factory and yield
/// [`FactoryError::Unlocatable`] here.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFragmentFactory;

impl FragmentFactory for DefaultFragmentFactory {
    fn create(
        &self,
        descriptor: &FragmentDescriptor,
        context: &InjectionContext<'_>,
    ) -> Result<Fragment, FactoryError> {
        match descriptor.target() {
            TargetFactory::Singleton(fragment) => Ok(fragment.clone()),
            TargetFactory::Constructor(constructor) => constructor(context),
            TargetFactory::Located(key) => Err(FactoryError::Unlocatable { key: key.clone() }),
        }
    }
}

/// Runs `factory` and checks the instance fits the descriptor's kind.
pub(crate) fn instantiate(
    factory: &dyn FragmentFactory,
    context: &InjectionContext<'_>,
) -> Result<Fragment, FactoryError> {
    let descriptor = context.descriptor();
    let fragment = factory.create(descriptor, context)?;
    if fragment.fits(descriptor.kind()) {
        Ok(fragment)
    } else {
        Err(FactoryError::KindMismatch {
            expected: descriptor.kind(),
            found: fragment.variant(),
        })
    }
}
