//! Unit tests for the fragment registry.

use rstest::{fixture, rstest};

use super::*;
use crate::capability::MethodSignature;
use crate::fragment::{Fragment, FragmentKind};
use crate::value::{ParamType, Value};

fn greeter_set() -> CapabilitySet {
    CapabilitySet::new("Greeter").with_method(MethodSignature::new("greet", [ParamType::String]))
}

fn primary(name: &str) -> FragmentDescriptor {
    FragmentDescriptor::new(
        name,
        FragmentKind::Primary,
        Fragment::primary_fn(|_| Ok(Value::Null)),
    )
}

#[fixture]
fn registry() -> (FragmentRegistry, CapabilitySetId) {
    let mut registry = FragmentRegistry::new();
    let id = registry
        .register_capability_set(greeter_set())
        .expect("fresh set");
    (registry, id)
}

#[rstest]
fn registers_fragments_in_declaration_order(registry: (FragmentRegistry, CapabilitySetId)) {
    let (mut registry, id) = registry;
    let first = registry
        .register_fragment(&id, primary("first"))
        .expect("first registers");
    let second = registry
        .register_fragment(&id, primary("second"))
        .expect("second registers");
    assert!(first < second);
    let names: Vec<&str> = registry
        .fragments(&id)
        .expect("set is registered")
        .iter()
        .map(|fragment| fragment.name())
        .collect();
    assert_eq!(names, ["first", "second"]);
}

#[rstest]
fn identifiers_are_unique_across_sets(registry: (FragmentRegistry, CapabilitySetId)) {
    let (mut registry, greeter) = registry;
    let farewell = registry
        .register_capability_set(CapabilitySet::new("Farewell"))
        .expect("fresh set");
    let one = registry
        .register_fragment(&greeter, primary("shared-name"))
        .expect("registers under Greeter");
    let two = registry
        .register_fragment(&farewell, primary("shared-name"))
        .expect("same name is fine in another set");
    assert_ne!(one, two);
    let ids: Vec<&str> = registry.capability_sets().map(CapabilitySetId::as_str).collect();
    assert_eq!(ids, ["Farewell", "Greeter"]);
}

#[rstest]
fn rejects_duplicate_capability_set(registry: (FragmentRegistry, CapabilitySetId)) {
    let (mut registry, id) = registry;
    let error = registry
        .register_capability_set(greeter_set())
        .expect_err("Greeter is taken");
    assert_eq!(error, RegistrationError::DuplicateCapabilitySet { id });
}

#[rstest]
fn rejects_repeated_method() {
    let mut registry = FragmentRegistry::new();
    let repeated = greeter_set().with_method(MethodSignature::new("greet", [ParamType::String]));
    let error = registry
        .register_capability_set(repeated)
        .expect_err("greet(string) repeats");
    assert!(matches!(error, RegistrationError::DuplicateMethod { .. }));
    assert!(registry.capability_set(&CapabilitySetId::from("Greeter")).is_none());
}

#[rstest]
fn rejects_unknown_capability_set() {
    let mut registry = FragmentRegistry::new();
    let error = registry
        .register_fragment(&CapabilitySetId::from("Nowhere"), primary("lost"))
        .expect_err("set was never registered");
    assert_eq!(
        error,
        RegistrationError::UnknownCapabilitySet {
            id: CapabilitySetId::from("Nowhere")
        }
    );
}

#[rstest]
fn rejects_duplicate_fragment_name(registry: (FragmentRegistry, CapabilitySetId)) {
    let (mut registry, id) = registry;
    registry
        .register_fragment(&id, primary("hello"))
        .expect("first registration");
    let error = registry
        .register_fragment(&id, primary("hello"))
        .expect_err("name is taken");
    assert!(matches!(error, RegistrationError::DuplicateFragment { ref name, .. } if name == "hello"));
    assert_eq!(registry.fragments(&id).map(<[_]>::len), Some(1));
}

#[rstest]
#[case::blank_name(primary("  "))]
#[case::empty_targets(primary("hello").with_applies_to(AppliesTo::Targets(Vec::new())))]
#[case::blank_target(primary("hello").with_applies_to(AppliesTo::targets(["Greeter", ""])))]
fn rejects_malformed_descriptors(
    registry: (FragmentRegistry, CapabilitySetId),
    #[case] descriptor: FragmentDescriptor,
) {
    let (mut registry, id) = registry;
    let error = registry
        .register_fragment(&id, descriptor)
        .expect_err("descriptor is malformed");
    assert!(matches!(error, RegistrationError::InvalidDescriptor { .. }));
}

#[rstest]
fn failed_registration_does_not_consume_an_identifier(
    registry: (FragmentRegistry, CapabilitySetId),
) {
    let (mut registry, id) = registry;
    let first = registry
        .register_fragment(&id, primary("a"))
        .expect("a registers");
    registry
        .register_fragment(&id, primary("a"))
        .expect_err("duplicate");
    let second = registry
        .register_fragment(&id, primary("b"))
        .expect("b registers");
    assert_eq!(second.as_u32(), first.as_u32() + 1);
}
