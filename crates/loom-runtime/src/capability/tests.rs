//! Unit tests for capability sets and method selection.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

#[fixture]
fn greeter() -> CapabilitySet {
    CapabilitySet::new("Greeter")
        .with_method(MethodSignature::new("greet", [ParamType::String]).returning(ParamType::String))
        .with_method(MethodSignature::new("greet", [ParamType::String, ParamType::Integer]))
        .with_method(MethodSignature::new("wave", []))
        .with_method(MethodSignature::new("echo", [ParamType::Any]))
        .with_method(MethodSignature::new("echo", [ParamType::String]))
}

#[rstest]
fn displays_keys_and_signatures(greeter: CapabilitySet) {
    let greet = greeter
        .find("greet", &[ParamType::String])
        .expect("greet(string) is declared");
    assert_eq!(greet.to_string(), "greet(string) -> string");
    assert_eq!(greeter.key_for(greet).to_string(), "Greeter::greet(string)");
    assert_eq!(
        MethodSelector::exact("greet", [ParamType::String, ParamType::Integer]).to_string(),
        "greet(string, integer)"
    );
}

#[rstest]
#[case::single_overload(vec![json!("Ann")], Some(vec![ParamType::String]))]
#[case::two_arguments(vec![json!("Ann"), json!(2)], Some(vec![ParamType::String, ParamType::Integer]))]
#[case::wrong_type(vec![json!(3)], None)]
#[case::wrong_arity(vec![], None)]
fn named_selector_uses_arguments(
    greeter: CapabilitySet,
    #[case] args: Vec<Value>,
    #[case] expected: Option<Vec<ParamType>>,
) {
    let resolved = greeter.resolve(&MethodSelector::from("greet"), &args);
    assert_eq!(resolved.map(|method| method.params().to_vec()), expected);
}

#[rstest]
fn named_selector_refuses_ambiguous_overloads(greeter: CapabilitySet) {
    // Both echo(any) and echo(string) accept a string.
    assert!(greeter
        .resolve(&MethodSelector::from("echo"), &[json!("x")])
        .is_none());
    let number = greeter
        .resolve(&MethodSelector::from("echo"), &[json!(1)])
        .expect("only echo(any) accepts a number");
    assert_eq!(number.params(), &[ParamType::Any]);
}

#[rstest]
fn exact_selector_pins_the_overload(greeter: CapabilitySet) {
    let selector = MethodSelector::exact("echo", [ParamType::String]);
    let method = greeter
        .resolve(&selector, &[json!("x")])
        .expect("echo(string) accepts a string");
    assert_eq!(method.params(), &[ParamType::String]);
    assert!(greeter.resolve(&selector, &[json!(1)]).is_none());
}

#[rstest]
fn lookup_ignores_arguments(greeter: CapabilitySet) {
    assert!(greeter.lookup(&MethodSelector::from("wave")).is_some());
    assert!(greeter.lookup(&MethodSelector::from("greet")).is_none());
    assert!(greeter
        .lookup(&MethodSelector::exact("greet", [ParamType::String]))
        .is_some());
    assert!(greeter.lookup(&MethodSelector::from("missing")).is_none());
}

#[rstest]
fn detects_repeated_signatures(greeter: CapabilitySet) {
    assert!(greeter.duplicate_method().is_none());
    let repeated = greeter.with_method(MethodSignature::new("wave", []).returning(ParamType::Null));
    let duplicate = repeated.duplicate_method().expect("wave is declared twice");
    assert_eq!(duplicate.name(), "wave");
}

#[rstest]
fn keys_distinguish_overloads_and_sets(greeter: CapabilitySet) {
    let one = MethodSignature::new("greet", [ParamType::String]);
    let two = MethodSignature::new("greet", [ParamType::String, ParamType::Integer]);
    assert_ne!(greeter.key_for(&one), greeter.key_for(&two));
    let other = CapabilitySet::new("Farewell");
    assert_ne!(greeter.key_for(&one), other.key_for(&one));
    assert!(greeter.declares(&one));
    assert!(!other.declares(&one));
}

#[rstest]
fn capability_set_deserializes_from_json() {
    let set: CapabilitySet = serde_json::from_value(json!({
        "id": "Greeter",
        "methods": [{ "name": "greet", "params": ["string"] }]
    }))
    .expect("valid capability set");
    let greet = set
        .find("greet", &[ParamType::String])
        .expect("greet is declared");
    assert_eq!(greet.returns(), ParamType::Any);
}
