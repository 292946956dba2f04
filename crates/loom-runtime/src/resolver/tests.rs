//! Unit tests for applicability resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::{fixture, rstest};

use super::*;
use crate::fragment::{AppliesToFilter, Fragment, FragmentKind};
use crate::value::ParamType;

#[fixture]
fn greet() -> MethodSignature {
    MethodSignature::new("greet", [ParamType::String])
}

#[fixture]
fn greeter(greet: MethodSignature) -> CapabilitySet {
    CapabilitySet::new("Greeter")
        .with_method(greet)
        .with_method(MethodSignature::new("wave", []))
}

fn interceptor(applies_to: AppliesTo) -> FragmentDescriptor {
    FragmentDescriptor::new(
        "audit",
        FragmentKind::Before,
        Fragment::before_fn(|_, _| Ok(())),
    )
    .with_applies_to(applies_to)
}

fn hello_class() -> FragmentClass {
    FragmentClass::declaring("HelloGreeter")
        .extending("Greeter")
        .with_method("greet", [ParamType::String])
        .with_placeholder("wave", [])
}

#[rstest]
fn always_applies(greet: MethodSignature, greeter: CapabilitySet) {
    let descriptor = interceptor(AppliesTo::Always);
    assert!(applies(
        &descriptor,
        &greet,
        &greeter,
        &FragmentClass::generic("Anything")
    ));
}

#[rstest]
#[case::own_name(vec!["HelloGreeter"], true)]
#[case::supertype(vec!["Greeter"], true)]
#[case::one_of_many(vec!["Farewell", "Greeter"], true)]
#[case::unrelated(vec!["Farewell"], false)]
fn targets_match_class_or_supertype(
    greet: MethodSignature,
    greeter: CapabilitySet,
    #[case] targets: Vec<&str>,
    #[case] expected: bool,
) {
    let descriptor = interceptor(AppliesTo::targets(targets));
    assert_eq!(applies(&descriptor, &greet, &greeter, &hello_class()), expected);
}

#[rstest]
fn targets_skip_placeholder_methods(greeter: CapabilitySet) {
    let wave = MethodSignature::new("wave", []);
    let descriptor = interceptor(AppliesTo::targets(["Greeter"]));
    assert!(!applies(&descriptor, &wave, &greeter, &hello_class()));
}

#[rstest]
fn targets_accept_generic_candidates(greeter: CapabilitySet) {
    let wave = MethodSignature::new("wave", []);
    let descriptor = interceptor(AppliesTo::targets(["Handler"]));
    let candidate = FragmentClass::generic("Proxy").extending("Handler");
    assert!(applies(&descriptor, &wave, &greeter, &candidate));
}

#[rstest]
fn predicate_sees_candidate_and_fragment_classes(greet: MethodSignature, greeter: CapabilitySet) {
    let descriptor = interceptor(AppliesTo::predicate(|method, candidate, set, own| {
        method.name() == "greet"
            && candidate.name() == "HelloGreeter"
            && set.id().as_str() == "Greeter"
            && own.name() == "audit"
    }));
    assert!(applies(&descriptor, &greet, &greeter, &hello_class()));
    assert!(!applies(
        &descriptor,
        &greet,
        &greeter,
        &FragmentClass::generic("Other")
    ));
}

struct CountingFilter {
    calls: AtomicUsize,
    answer: bool,
}

impl AppliesToFilter for CountingFilter {
    fn applies_to(
        &self,
        _method: &MethodSignature,
        _candidate: &FragmentClass,
        _capability: &CapabilitySet,
        _fragment: &FragmentClass,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

#[rstest]
#[case::accepts(true)]
#[case::rejects(false)]
fn predicate_result_is_used_verbatim(
    greet: MethodSignature,
    greeter: CapabilitySet,
    #[case] answer: bool,
) {
    let filter = Arc::new(CountingFilter {
        calls: AtomicUsize::new(0),
        answer,
    });
    let descriptor = interceptor(AppliesTo::Predicate(filter.clone()));
    // Predicates are consulted even for placeholder-only candidates.
    let candidate = FragmentClass::declaring("Empty");
    assert_eq!(applies(&descriptor, &greet, &greeter, &candidate), answer);
    assert_eq!(filter.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn resolution_is_deterministic(greet: MethodSignature, greeter: CapabilitySet) {
    let descriptor = interceptor(AppliesTo::targets(["Greeter"]));
    let first = applies(&descriptor, &greet, &greeter, &hello_class());
    let repeated = (0..16).all(|_| applies(&descriptor, &greet, &greeter, &hello_class()) == first);
    assert!(first);
    assert!(repeated);
}
