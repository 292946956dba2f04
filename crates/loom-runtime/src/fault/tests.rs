//! Unit tests for faults and their translation.

use std::panic::Location;

use rstest::{fixture, rstest};

use super::*;
use crate::capability::{CapabilitySet, MethodSignature};
use crate::error::{CompositionDefect, ConstraintPhase, ConstraintViolation};
use crate::value::ParamType;

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
struct DiskFull;

#[fixture]
fn site() -> CallSite {
    let greet = MethodSignature::new("greet", [ParamType::String]);
    let key = CapabilitySet::new("Greeter").key_for(&greet);
    CallSite::new(key, Location::caller())
}

#[rstest]
fn first_fragment_left_is_the_origin() {
    let fault = Fault::new("boom")
        .leaving("hello", FragmentKind::Primary)
        .through("Next::invoke_next")
        .leaving("audit", FragmentKind::Before);
    let origin = fault.origin().expect("origin stamped");
    assert_eq!(origin.fragment(), "hello");
    assert_eq!(origin.kind(), FragmentKind::Primary);
    assert_eq!(fault.trace().len(), 3);
}

#[rstest]
fn translation_elides_plumbing_frames(site: CallSite) {
    let fault = Fault::new("boom")
        .leaving("hello", FragmentKind::Primary)
        .through("Next::invoke_next")
        .leaving("audit", FragmentKind::Before);
    let CompositionError::FragmentExecution {
        fragment,
        method,
        trace,
        source,
    } = translate(fault, &site)
    else {
        panic!("expected a fragment execution error");
    };
    assert_eq!(fragment, "hello");
    assert_eq!(method, "Greeter::greet(string)");
    let names: Vec<&str> = trace.frames().iter().map(FaultOrigin::fragment).collect();
    assert_eq!(names, ["hello", "audit"]);
    assert_eq!(trace.call_site(), site.location());
    assert_eq!(source.to_string(), "boom");
}

#[rstest]
fn indirections_unwrap_to_the_true_cause(site: CallSite) {
    let inner = Fault::from_error(DiskFull).leaving("store", FragmentKind::Primary);
    let wrapped = Fault::wrap(inner)
        .through("Next::invoke_next")
        .leaving("retry", FragmentKind::Before);
    let error = translate(wrapped, &site);
    let CompositionError::FragmentExecution {
        fragment,
        trace,
        source,
        ..
    } = &error
    else {
        panic!("expected a fragment execution error");
    };
    assert_eq!(fragment, "store");
    let names: Vec<&str> = trace.frames().iter().map(FaultOrigin::fragment).collect();
    assert_eq!(names, ["store", "retry"]);
    assert!(!source.root_cause().is_unimplemented());
    let cause = std::error::Error::source(source.as_ref()).expect("original error kept");
    assert_eq!(cause.to_string(), "disk full");
}

#[rstest]
fn unimplemented_becomes_invalid_composition(site: CallSite) {
    let fault = Fault::unimplemented().leaving("stub", FragmentKind::Primary);
    let error = translate(Fault::wrap(fault), &site);
    assert_eq!(
        error.defect(),
        Some(&CompositionDefect::NotImplemented {
            method: String::from("Greeter::greet(string)"),
            fragment: String::from("stub"),
        })
    );
}

#[rstest]
fn composition_errors_pass_through_unchanged(site: CallSite) {
    let violation = ConstraintViolation {
        constraint: String::from("non-empty"),
        method: String::from("Greeter::greet(string)"),
        arguments: Vec::new(),
        reason: String::from("empty"),
        phase: ConstraintPhase::Pre,
    };
    let fault = Fault::from(CompositionError::from(violation.clone()))
        .leaving("audit", FragmentKind::Before);
    assert!(fault.is_passthrough());
    let error = translate(fault, &site);
    assert_eq!(error.violation(), Some(&violation));
}

#[rstest]
fn unattributed_faults_are_still_translated(site: CallSite) {
    let error = translate(Fault::new("lost"), &site);
    assert!(matches!(
        error,
        CompositionError::FragmentExecution { ref fragment, .. } if fragment == UNATTRIBUTED
    ));
}

#[rstest]
fn state_errors_convert_with_their_cause() {
    let fault = Fault::from(StateError::ReadOnly {
        property: String::from("id"),
    });
    assert_eq!(fault.to_string(), "property 'id' is read-only");
    assert!(std::error::Error::source(&fault).is_some());
}

#[rstest]
fn trace_display_lists_fragments_then_call_site(site: CallSite) {
    let fault = Fault::new("boom").leaving("hello", FragmentKind::Primary);
    let CompositionError::FragmentExecution { trace, .. } = translate(fault, &site) else {
        panic!("expected a fragment execution error");
    };
    let rendered = trace.to_string();
    assert!(rendered.starts_with("  in hello (primary)"), "trace: {rendered}");
    assert!(rendered.contains("called at"), "trace: {rendered}");
}

#[rstest]
fn bare_fault_wrapped_by_a_fragment_is_attributed_to_it(site: CallSite) {
    let wrapped = Fault::wrap(Fault::new("disk full")).leaving("store", FragmentKind::Primary);
    let CompositionError::FragmentExecution {
        fragment, source, ..
    } = translate(wrapped, &site)
    else {
        panic!("expected a fragment execution error");
    };
    assert_eq!(fragment, "store");
    assert_eq!(source.to_string(), "disk full");
}

#[rstest]
fn wrapped_unimplemented_names_the_wrapping_fragment(site: CallSite) {
    let wrapped = Fault::wrap(Fault::unimplemented()).leaving("stub", FragmentKind::Primary);
    assert!(matches!(
        translate(wrapped, &site).defect(),
        Some(CompositionDefect::NotImplemented { fragment, .. }) if fragment == "stub"
    ));
}
