//! Capability sets: the behavioural contracts a composed object satisfies.
//!
//! A [`CapabilitySet`] names a collection of [`MethodSignature`]s. Each
//! signature, qualified by its set, yields a [`MethodKey`] which identifies
//! exactly one invocation chain. Callers address methods through a
//! [`MethodSelector`], which resolves overloads against the arguments of the
//! call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{ParamType, Value};

#[cfg(test)]
mod tests;

/// Stable key identifying a capability set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySetId(String);

impl CapabilitySetId {
    /// Creates an identifier from its textual key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the textual key.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CapabilitySetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilitySetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CapabilitySetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One method of a contract: name, ordered parameter types and return type.
///
/// Two signatures are the same method when their names and parameter lists
/// match; the return type is descriptive only.
///
/// # Example
///
/// ```
/// use loom_runtime::{MethodSignature, ParamType};
///
/// let greet = MethodSignature::new("greet", [ParamType::String]).returning(ParamType::String);
/// assert_eq!(greet.to_string(), "greet(string) -> string");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    name: String,
    params: Vec<ParamType>,
    #[serde(default = "default_return")]
    returns: ParamType,
}

const fn default_return() -> ParamType {
    ParamType::Any
}

impl MethodSignature {
    /// Creates a signature returning [`ParamType::Any`].
    #[must_use]
    pub fn new(name: impl Into<String>, params: impl IntoIterator<Item = ParamType>) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            returns: default_return(),
        }
    }

    /// Declares the return type.
    #[must_use]
    pub const fn returning(mut self, returns: ParamType) -> Self {
        self.returns = returns;
        self
    }

    /// Returns the method name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the ordered parameter types.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Returns the declared return type.
    #[must_use]
    pub const fn returns(&self) -> ParamType {
        self.returns
    }

    /// Returns `true` when this signature names the same method as
    /// `name(params)`.
    #[must_use]
    pub fn is(&self, name: &str, params: &[ParamType]) -> bool {
        self.name == name && self.params == params
    }

    /// Returns `true` when `args` fit the parameter list.
    #[must_use]
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.accepts(arg))
    }

    fn write_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        self.write_params(f)?;
        write!(f, " -> {}", self.returns)
    }
}

/// Uniquely identifies one dispatch chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    capability: CapabilitySetId,
    method: String,
    params: Vec<ParamType>,
}

impl MethodKey {
    /// Qualifies `signature` with the capability set declaring it.
    #[must_use]
    pub fn new(capability: CapabilitySetId, signature: &MethodSignature) -> Self {
        Self {
            capability,
            method: signature.name.clone(),
            params: signature.params.clone(),
        }
    }

    /// Returns the declaring capability set.
    #[must_use]
    pub const fn capability(&self) -> &CapabilitySetId {
        &self.capability
    }

    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Returns the ordered parameter types.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.capability, self.method)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// How a caller names the method it wants to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSelector {
    /// Select by name; overloads are disambiguated by the call arguments.
    Named(String),
    /// Select the exact signature `name(params)`.
    Exact(String, Vec<ParamType>),
}

impl MethodSelector {
    /// Selects by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Selects an exact signature.
    #[must_use]
    pub fn exact(name: impl Into<String>, params: impl IntoIterator<Item = ParamType>) -> Self {
        Self::Exact(name.into(), params.into_iter().collect())
    }

    /// Returns the selected method name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::Exact(name, _) => name,
        }
    }
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Exact(name, params) => {
                let rendered: Vec<&str> = params.iter().map(|param| param.as_str()).collect();
                write!(f, "{name}({})", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for MethodSelector {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl From<String> for MethodSelector {
    fn from(value: String) -> Self {
        Self::Named(value)
    }
}

impl From<&MethodSignature> for MethodSelector {
    fn from(value: &MethodSignature) -> Self {
        Self::Exact(value.name.clone(), value.params.clone())
    }
}

/// A named, immutable collection of method signatures.
///
/// # Example
///
/// ```
/// use loom_runtime::{CapabilitySet, MethodSignature, ParamType};
///
/// let greeter = CapabilitySet::new("Greeter")
///     .with_method(MethodSignature::new("greet", [ParamType::String]));
/// assert_eq!(greeter.methods().len(), 1);
/// assert!(greeter.find("greet", &[ParamType::String]).is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    id: CapabilitySetId,
    #[serde(default)]
    methods: Vec<MethodSignature>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new(id: impl Into<CapabilitySetId>) -> Self {
        Self {
            id: id.into(),
            methods: Vec::new(),
        }
    }

    /// Declares one more method.
    #[must_use]
    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> &CapabilitySetId {
        &self.id
    }

    /// Returns the declared methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Returns the method declared as `name(params)`.
    #[must_use]
    pub fn find(&self, name: &str, params: &[ParamType]) -> Option<&MethodSignature> {
        self.methods.iter().find(|method| method.is(name, params))
    }

    /// Returns `true` when the set declares `signature`.
    #[must_use]
    pub fn declares(&self, signature: &MethodSignature) -> bool {
        self.find(signature.name(), signature.params()).is_some()
    }

    /// Resolves a selector against the call arguments.
    ///
    /// A named selector with a single declaration resolves when the
    /// arguments fit it; with overloads, exactly one overload must accept
    /// the arguments.
    #[must_use]
    pub fn resolve(&self, selector: &MethodSelector, args: &[Value]) -> Option<&MethodSignature> {
        match selector {
            MethodSelector::Exact(name, params) => self
                .find(name, params)
                .filter(|method| method.accepts(args)),
            MethodSelector::Named(name) => unique(
                self.methods
                    .iter()
                    .filter(|method| method.name() == name && method.accepts(args)),
            ),
        }
    }

    /// Resolves a selector without reference to call arguments.
    ///
    /// A named selector only resolves when the name is not overloaded.
    #[must_use]
    pub fn lookup(&self, selector: &MethodSelector) -> Option<&MethodSignature> {
        match selector {
            MethodSelector::Exact(name, params) => self.find(name, params),
            MethodSelector::Named(name) => {
                unique(self.methods.iter().filter(|method| method.name() == name))
            }
        }
    }

    /// Returns the first signature declared twice, if any.
    #[must_use]
    pub fn duplicate_method(&self) -> Option<&MethodSignature> {
        self.methods.iter().enumerate().find_map(|(index, method)| {
            self.methods
                .iter()
                .skip(index + 1)
                .any(|other| other.is(method.name(), method.params()))
                .then_some(method)
        })
    }

    /// Returns the key identifying `signature`'s chain within this set.
    #[must_use]
    pub fn key_for(&self, signature: &MethodSignature) -> MethodKey {
        MethodKey::new(self.id.clone(), signature)
    }
}

fn unique<'a>(
    mut candidates: impl Iterator<Item = &'a MethodSignature>,
) -> Option<&'a MethodSignature> {
    let first = candidates.next()?;
    candidates.next().is_none().then_some(first)
}
