//! Applicability resolution.

use crate::capability::{CapabilitySet, MethodSignature};
use crate::fragment::{AppliesTo, FragmentClass, FragmentDescriptor};

#[cfg(test)]
mod tests;

/// Decides whether `descriptor` joins the chain for `method`.
///
/// `candidate` is the implementation class the fragment is judged against:
/// the descriptor's own class for primaries, and the selected primary's
/// class for every other kind. Target rules additionally require the
/// candidate to implement the method concretely, so placeholders never
/// attract target-filtered fragments.
///
/// # Example
///
/// ```
/// use loom_runtime::resolver::applies;
/// use loom_runtime::{
///     AppliesTo, CapabilitySet, Fragment, FragmentClass, FragmentDescriptor, FragmentKind,
///     MethodSignature, ParamType,
/// };
///
/// let greet = MethodSignature::new("greet", [ParamType::String]);
/// let set = CapabilitySet::new("Greeter").with_method(greet.clone());
/// let audit = FragmentDescriptor::new(
///     "audit",
///     FragmentKind::Before,
///     Fragment::before_fn(|_, _| Ok(())),
/// )
/// .with_applies_to(AppliesTo::targets(["Greeter"]));
/// let hello = FragmentClass::declaring("Hello")
///     .extending("Greeter")
///     .with_method("greet", [ParamType::String]);
/// assert!(applies(&audit, &greet, &set, &hello));
/// ```
#[must_use]
pub fn applies(
    descriptor: &FragmentDescriptor,
    method: &MethodSignature,
    capability: &CapabilitySet,
    candidate: &FragmentClass,
) -> bool {
    match descriptor.applies_to() {
        AppliesTo::Always => true,
        AppliesTo::Targets(targets) => {
            targets
                .iter()
                .any(|target| candidate.is_assignable_to(target))
                && candidate.provides(method)
        }
        AppliesTo::Predicate(filter) => {
            filter.applies_to(method, candidate, capability, descriptor.class())
        }
    }
}
