//! Fragment descriptors: the implementation units woven into chains.
//!
//! A [`FragmentDescriptor`] declares one unit of behaviour for a capability
//! set: what [`FragmentKind`] it is, the [`FragmentClass`] it belongs to, the
//! [`AppliesTo`] filter deciding which methods it joins, and the
//! [`TargetFactory`] that produces its runtime instance. Descriptors are
//! registered during bootstrap and never mutated afterwards.

mod behaviour;
mod factory;


use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{CapabilitySet, MethodSignature};
use crate::value::ParamType;

pub use self::behaviour::{Constraint, Fragment, Interceptor, Primary, Reactive, Rejection};
pub use self::factory::{DefaultFragmentFactory, FactoryError, FragmentFactory, InjectionContext};
pub(crate) use self::factory::instantiate;

/// Role a fragment plays within a chain.
///
/// # Example
///
/// ```
/// use loom_runtime::FragmentKind;
///
/// assert_eq!(FragmentKind::Before.as_str(), "before");
/// assert!(FragmentKind::After.is_interceptor());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Terminal implementation of a method.
    Primary,
    /// Interceptor whose logic runs around the rest of the chain, outermost
    /// first.
    Before,
    /// Interceptor whose logic post-processes the primary result.
    After,
    /// Side effect fired only after the call succeeded.
    Reactive,
    /// Pre/postcondition check that may veto the call.
    Constraint,
}

impl FragmentKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Before => "before",
            Self::After => "after",
            Self::Reactive => "reactive",
            Self::Constraint => "constraint",
        }
    }

    /// Returns `true` for the two interceptor kinds.
    #[must_use]
    pub const fn is_interceptor(self) -> bool {
        matches!(self, Self::Before | Self::After)
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-assigned identity of a registered fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(u32);

impl FragmentId {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether fragment instances are shared across receivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceScope {
    /// One instance per composed object; the runtime keeps it on the
    /// receiver.
    #[default]
    PerReceiver,
    /// One instance per chain, created while the chain is built. The
    /// fragment synchronises its own state.
    Shared,
}

/// One method a fragment class declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredMethod {
    name: String,
    params: Vec<ParamType>,
    concrete: bool,
}

impl DeclaredMethod {
    /// Declares a concrete implementation of `name(params)`.
    #[must_use]
    pub fn concrete(name: impl Into<String>, params: impl IntoIterator<Item = ParamType>) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            concrete: true,
        }
    }

    /// Declares `name(params)` without implementing it.
    #[must_use]
    pub fn placeholder(
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
    ) -> Self {
        Self {
            concrete: false,
            ..Self::concrete(name, params)
        }
    }

    /// Returns `true` when this declaration is a real implementation.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        self.concrete
    }

    fn matches(&self, method: &MethodSignature) -> bool {
        method.is(&self.name, &self.params)
    }
}

/// Which methods a fragment class can implement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodCoverage {
    /// Handles any method it is dispatched, like a generic invocation
    /// handler.
    Generic,
    /// Implements only the listed methods.
    Declared(Vec<DeclaredMethod>),
}

/// Type information about a fragment implementation.
///
/// Stands in for the class hierarchy that applicability and primary
/// selection reason about: the class name, the supertypes it can be assigned
/// to, and the methods it implements.
///
/// # Example
///
/// ```
/// use loom_runtime::{FragmentClass, MethodSignature, ParamType};
///
/// let class = FragmentClass::declaring("HelloGreeter")
///     .extending("Greeter")
///     .with_method("greet", [ParamType::String]);
/// let greet = MethodSignature::new("greet", [ParamType::String]);
/// assert!(class.is_assignable_to("Greeter"));
/// assert!(class.provides(&greet));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentClass {
    name: String,
    #[serde(default)]
    supertypes: Vec<String>,
    coverage: MethodCoverage,
}

impl FragmentClass {
    /// Creates a class that handles any method.
    #[must_use]
    pub fn generic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            coverage: MethodCoverage::Generic,
        }
    }

    /// Creates a class implementing only the methods declared on it.
    #[must_use]
    pub fn declaring(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            coverage: MethodCoverage::Declared(Vec::new()),
        }
    }

    /// Adds a supertype the class is assignable to.
    #[must_use]
    pub fn extending(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Declares a concrete method implementation.
    ///
    /// A generic class becomes a declaring class listing only this method.
    #[must_use]
    pub fn with_method(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
    ) -> Self {
        self.with_declaration(DeclaredMethod::concrete(name, params))
    }

    /// Declares a method without implementing it.
    #[must_use]
    pub fn with_placeholder(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
    ) -> Self {
        self.with_declaration(DeclaredMethod::placeholder(name, params))
    }

    fn with_declaration(mut self, declaration: DeclaredMethod) -> Self {
        match &mut self.coverage {
            MethodCoverage::Declared(methods) => methods.push(declaration),
            MethodCoverage::Generic => {
                self.coverage = MethodCoverage::Declared(vec![declaration]);
            }
        }
        self
    }

    /// Returns the class name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the declared supertypes.
    #[must_use]
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Returns the method coverage.
    #[must_use]
    pub const fn coverage(&self) -> &MethodCoverage {
        &self.coverage
    }

    /// Returns `true` for classes that handle any method.
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        matches!(self.coverage, MethodCoverage::Generic)
    }

    /// Returns `true` when the class is, or extends, `target`.
    #[must_use]
    pub fn is_assignable_to(&self, target: &str) -> bool {
        self.name == target || self.supertypes.iter().any(|supertype| supertype == target)
    }

    /// Returns `true` when the class concretely implements `method`.
    ///
    /// Generic classes provide every method; a placeholder declaration
    /// provides nothing.
    #[must_use]
    pub fn provides(&self, method: &MethodSignature) -> bool {
        match &self.coverage {
            MethodCoverage::Generic => true,
            MethodCoverage::Declared(methods) => methods
                .iter()
                .any(|declared| declared.concrete && declared.matches(method)),
        }
    }

    /// Returns `true` when this class is a strictly better implementation of
    /// `method` than `other`.
    ///
    /// A concrete declaration beats a generic handler, and a subtype beats
    /// the supertype it extends.
    #[must_use]
    pub fn is_more_specific_than(&self, other: &Self, method: &MethodSignature) -> bool {
        let declares = !self.is_generic() && self.provides(method);
        if declares && other.is_generic() {
            return true;
        }
        let other_declares = !other.is_generic() && other.provides(method);
        declares && other_declares && self.name != other.name && self.is_assignable_to(&other.name)
    }
}

/// Custom applicability predicate supplied by a fragment.
pub trait AppliesToFilter: Send + Sync {
    /// Decides whether the fragment joins the chain for `method`.
    ///
    /// `candidate` is the implementation the fragment would bind to (for
    /// non-primary fragments, the class of the selected primary);
    /// `fragment` is the fragment's own class.
    fn applies_to(
        &self,
        method: &MethodSignature,
        candidate: &FragmentClass,
        capability: &CapabilitySet,
        fragment: &FragmentClass,
    ) -> bool;
}

struct FnFilter<F>(F);

impl<F> AppliesToFilter for FnFilter<F>
where
    F: Fn(&MethodSignature, &FragmentClass, &CapabilitySet, &FragmentClass) -> bool + Send + Sync,
{
    fn applies_to(
        &self,
        method: &MethodSignature,
        candidate: &FragmentClass,
        capability: &CapabilitySet,
        fragment: &FragmentClass,
    ) -> bool {
        (self.0)(method, candidate, capability, fragment)
    }
}

/// Applicability rule of a descriptor.
#[derive(Clone, Default)]
pub enum AppliesTo {
    /// Applies to every method.
    #[default]
    Always,
    /// Applies when the candidate is assignable to one of these types and
    /// concretely implements the method.
    Targets(Vec<String>),
    /// Delegates to a custom predicate.
    Predicate(Arc<dyn AppliesToFilter>),
}

impl AppliesTo {
    /// Builds a target-type rule.
    #[must_use]
    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Targets(targets.into_iter().map(Into::into).collect())
    }

    /// Builds a rule from a closure.
    #[must_use]
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&MethodSignature, &FragmentClass, &CapabilitySet, &FragmentClass) -> bool
            + Send
            + Sync
            + 'static,
    {
        Self::Predicate(Arc::new(FnFilter(predicate)))
    }

    /// Builds a rule from a filter object.
    #[must_use]
    pub fn filter(filter: impl AppliesToFilter + 'static) -> Self {
        Self::Predicate(Arc::new(filter))
    }
}

impl fmt::Debug for AppliesTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Targets(targets) => f.debug_tuple("Targets").field(targets).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Constructor closure used by [`TargetFactory::Constructor`].
pub type ConstructorFn =
    dyn Fn(&InjectionContext<'_>) -> Result<Fragment, FactoryError> + Send + Sync;

/// How the runtime obtains a fragment instance.
#[derive(Clone)]
pub enum TargetFactory {
    /// A ready-made instance handed to every requester.
    Singleton(Fragment),
    /// Builds a fresh instance from the injection context.
    Constructor(Arc<ConstructorFn>),
    /// Located by an external [`FragmentFactory`] under this key.
    Located(String),
}

impl TargetFactory {
    /// Wraps a constructor closure.
    #[must_use]
    pub fn constructor<F>(constructor: F) -> Self
    where
        F: Fn(&InjectionContext<'_>) -> Result<Fragment, FactoryError> + Send + Sync + 'static,
    {
        Self::Constructor(Arc::new(constructor))
    }

    /// Names an externally located fragment.
    #[must_use]
    pub fn located(key: impl Into<String>) -> Self {
        Self::Located(key.into())
    }
}

impl From<Fragment> for TargetFactory {
    fn from(fragment: Fragment) -> Self {
        Self::Singleton(fragment)
    }
}

impl fmt::Debug for TargetFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton(fragment) => f.debug_tuple("Singleton").field(fragment).finish(),
            Self::Constructor(_) => f.write_str("Constructor(..)"),
            Self::Located(key) => f.debug_tuple("Located").field(key).finish(),
        }
    }
}

/// Declarative description of one implementation fragment.
///
/// # Example
///
/// ```
/// use loom_runtime::{Fragment, FragmentDescriptor, FragmentKind, Value};
///
/// let hello = FragmentDescriptor::new(
///     "hello",
///     FragmentKind::Primary,
///     Fragment::primary_fn(|frame| {
///         let name = frame.arg(0).and_then(Value::as_str).unwrap_or_default();
///         Ok(Value::from(format!("Hello, {name}")))
///     }),
/// );
/// assert_eq!(hello.name(), "hello");
/// assert_eq!(hello.class().name(), "hello");
/// ```
#[derive(Debug, Clone)]
pub struct FragmentDescriptor {
    name: String,
    kind: FragmentKind,
    class: FragmentClass,
    applies_to: AppliesTo,
    target: TargetFactory,
    scope: InstanceScope,
}

impl FragmentDescriptor {
    /// Creates a descriptor applying to every method, backed by a generic
    /// class named after the fragment.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: FragmentKind,
        target: impl Into<TargetFactory>,
    ) -> Self {
        let fragment_name = name.into();
        Self {
            class: FragmentClass::generic(fragment_name.clone()),
            name: fragment_name,
            kind,
            applies_to: AppliesTo::Always,
            target: target.into(),
            scope: InstanceScope::PerReceiver,
        }
    }

    /// Replaces the fragment class.
    #[must_use]
    pub fn with_class(mut self, class: FragmentClass) -> Self {
        self.class = class;
        self
    }

    /// Replaces the applicability rule.
    #[must_use]
    pub fn with_applies_to(mut self, applies_to: AppliesTo) -> Self {
        self.applies_to = applies_to;
        self
    }

    /// Replaces the instance scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: InstanceScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the fragment name, unique within its capability set.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the fragment kind.
    #[must_use]
    pub const fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// Returns the fragment class.
    #[must_use]
    pub const fn class(&self) -> &FragmentClass {
        &self.class
    }

    /// Returns the applicability rule.
    #[must_use]
    pub const fn applies_to(&self) -> &AppliesTo {
        &self.applies_to
    }

    /// Returns the target factory.
    #[must_use]
    pub const fn target(&self) -> &TargetFactory {
        &self.target
    }

    /// Returns the instance scope.
    #[must_use]
    pub const fn scope(&self) -> InstanceScope {
        self.scope
    }
}
