//! End-to-end tests for the composition runtime.

pub(crate) mod support;


use std::sync::Barrier;
use std::thread;

use rstest::{fixture, rstest};

use self::support::{Composition, Journal, hello_primary};
use crate::{
    AppliesTo, CompositionRuntime, Fragment, FragmentDescriptor, FragmentKind, Receiver, ResultSlot,
    TypeHandle, Value,
};

fn shout() -> FragmentDescriptor {
    FragmentDescriptor::new(
        "shout",
        FragmentKind::After,
        Fragment::after_fn(|_, result| {
            Ok(Value::from(result.as_str().unwrap_or_default().to_uppercase()))
        }),
    )
    .with_applies_to(AppliesTo::predicate(|method, _, _, _| method.name() == "greet"))
}

fn log_reaction(journal: &Journal) -> FragmentDescriptor {
    let sink = journal.clone();
    FragmentDescriptor::new(
        "log",
        FragmentKind::Reactive,
        Fragment::reactive_fn(move |frame, result| {
            let name = frame.arg(0).and_then(Value::as_str).unwrap_or("<none>");
            sink.record(format!("{name} -> {result}"));
            Ok(())
        }),
    )
}

struct Greeter {
    runtime: CompositionRuntime,
    handle: TypeHandle,
    journal: Journal,
}

#[fixture]
fn greeter() -> Greeter {
    let journal = Journal::default();
    let (runtime, handle) = Composition::greeter()
        .with(hello_primary())
        .with(shout())
        .with(log_reaction(&journal))
        .realize();
    Greeter {
        runtime,
        handle,
        journal,
    }
}

#[rstest]
fn greeter_composes_primary_after_and_reaction(greeter: Greeter) {
    let receiver = Receiver::stateless();
    let greeting = greeter
        .runtime
        .call(&greeter.handle, &receiver, "greet", vec![Value::from("Ann")])
        .expect("greet succeeds");
    assert_eq!(greeting, Value::from("HELLO, ANN"));
    assert_eq!(greeter.journal.entries(), [r#"Ann -> "HELLO, ANN""#]);
}

#[rstest]
fn null_results_are_returned_not_pending(greeter: Greeter) {
    let waved = greeter
        .runtime
        .call(&greeter.handle, &Receiver::stateless(), "wave", Vec::new())
        .expect("wave succeeds");
    let slot = ResultSlot::Returned(waved);
    assert!(slot.is_returned());
    assert_eq!(slot.value(), Some(&Value::Null));
    assert_ne!(slot, ResultSlot::Pending);
    assert_eq!(greeter.journal.entries(), ["<none> -> null"]);
}

#[rstest]
fn concurrent_first_calls_agree(greeter: Greeter) {
    let barrier = &Barrier::new(8);
    let runtime = &greeter.runtime;
    let handle = &greeter.handle;
    let greetings: Vec<Value> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(move |worker| {
                scope.spawn(move || {
                    let receiver = Receiver::stateless();
                    barrier.wait();
                    runtime
                        .call(handle, &receiver, "greet", vec![Value::from(format!("n{worker}"))])
                        .expect("greet succeeds")
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("caller thread"))
            .collect()
    });
    assert_eq!(greeter.handle.built_chains(), 1);
    let expected: Vec<Value> = (0..8)
        .map(|worker| Value::from(format!("HELLO, N{worker}")))
        .collect();
    assert_eq!(greetings, expected);
    assert_eq!(greeter.journal.entries().len(), 8);
}

#[rstest]
fn identical_registrations_build_identical_chains() {
    let shapes: Vec<String> = (0..2)
        .map(|_| {
            let (runtime, handle) = Composition::greeter()
                .with(hello_primary())
                .with(shout())
                .with(log_reaction(&Journal::default()))
                .realize();
            runtime
                .chain_shape(&handle, "greet")
                .expect("greet builds")
                .to_string()
        })
        .collect();
    assert_eq!(
        shapes,
        [
            "after:shout -> primary:hello -> reactive:log",
            "after:shout -> primary:hello -> reactive:log",
        ]
    );
}

#[rstest]
fn receivers_share_chains_but_not_instances(greeter: Greeter) {
    let first = Receiver::stateless();
    let second = Receiver::stateless();
    for receiver in [&first, &second] {
        greeter
            .runtime
            .call(&greeter.handle, receiver, "greet", vec![Value::from("Ann")])
            .expect("greet succeeds");
    }
    assert_eq!(greeter.handle.built_chains(), 1);
    assert_eq!(first.instance_count(), second.instance_count());
    assert!(first.instance_count() > 0);
    assert_ne!(first.id(), second.id());
}
