//! Invocation chains and their construction.
//!
//! An [`InvocationChain`] is the immutable, ordered list of links a call of
//! one method walks: constraints, before-interceptors, after-interceptors and
//! finally the primary. Reactions are kept beside the links because they run
//! only once the walk has succeeded.

mod builder;
mod cache;


use std::fmt;
use std::sync::Arc;

use crate::capability::{MethodKey, MethodSignature};
use crate::fragment::{Fragment, FragmentKind};
use crate::registry::RegisteredFragment;

pub use self::builder::ChainBuilder;
pub(crate) use self::cache::ChainSlot;

/// One position in a chain.
#[derive(Debug, Clone)]
pub struct ChainLink {
    fragment: Arc<RegisteredFragment>,
    shared: Option<Fragment>,
}

impl ChainLink {
    pub(crate) const fn new(fragment: Arc<RegisteredFragment>, shared: Option<Fragment>) -> Self {
        Self { fragment, shared }
    }

    /// Returns the registered fragment behind this link.
    #[must_use]
    pub fn fragment(&self) -> &RegisteredFragment {
        &self.fragment
    }

    /// Returns the link's kind.
    #[must_use]
    pub fn kind(&self) -> FragmentKind {
        self.fragment.descriptor().kind()
    }

    /// Returns the fragment name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.fragment.name()
    }

    /// Returns the instance created at build time for shared fragments.
    #[must_use]
    pub const fn shared_instance(&self) -> Option<&Fragment> {
        self.shared.as_ref()
    }
}

/// Immutable dispatch chain for one method.
#[derive(Debug)]
pub struct InvocationChain {
    key: MethodKey,
    method: MethodSignature,
    links: Vec<ChainLink>,
    reactions: Vec<ChainLink>,
}

impl InvocationChain {
    /// Returns the key the chain is cached under.
    #[must_use]
    pub const fn key(&self) -> &MethodKey {
        &self.key
    }

    /// Returns the method signature.
    #[must_use]
    pub const fn method(&self) -> &MethodSignature {
        &self.method
    }

    /// Returns the links in walk order; the last one is the primary.
    #[must_use]
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Returns the reactions in declaration order.
    #[must_use]
    pub fn reactions(&self) -> &[ChainLink] {
        &self.reactions
    }

    /// Returns the primary link.
    #[must_use]
    pub fn primary(&self) -> Option<&ChainLink> {
        self.links.last()
    }

    /// Describes the chain structurally.
    #[must_use]
    pub fn shape(&self) -> ChainShape {
        ChainShape(
            self.links
                .iter()
                .chain(&self.reactions)
                .map(|link| (link.kind(), link.name().to_owned()))
                .collect(),
        )
    }
}

/// Ordered `(kind, fragment name)` pairs of a chain, reactions last.
///
/// # Example
///
/// ```
/// use loom_runtime::{ChainShape, FragmentKind};
///
/// let shape = ChainShape::from_iter([
///     (FragmentKind::Before, "audit"),
///     (FragmentKind::Primary, "hello"),
/// ]);
/// assert_eq!(shape.to_string(), "before:audit -> primary:hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainShape(Vec<(FragmentKind, String)>);

impl ChainShape {
    /// Returns the entries in order.
    #[must_use]
    pub fn entries(&self) -> &[(FragmentKind, String)] {
        &self.0
    }

    /// Returns the fragment names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(_, name)| name.as_str()).collect()
    }
}

impl<S: Into<String>> FromIterator<(FragmentKind, S)> for ChainShape {
    fn from_iter<I: IntoIterator<Item = (FragmentKind, S)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(kind, name)| (kind, name.into()))
                .collect(),
        )
    }
}

impl fmt::Display for ChainShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (kind, name)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{kind}:{name}")?;
        }
        Ok(())
    }
}
