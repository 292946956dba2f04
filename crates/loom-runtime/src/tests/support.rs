//! Shared fixtures and doubles for runtime tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use mockall::mock;

use crate::{
    CapabilitySet, CapabilitySetId, ChainShape, CompositionError, CompositionRuntime,
    ConstraintViolation, DefaultFragmentFactory, DispatchReporter, FactoryError, Fault, Fragment,
    FragmentDescriptor, FragmentFactory, FragmentKind, FragmentRegistry, InjectionContext,
    MethodKey, MethodSignature, ParamType, TargetFactory, TypeHandle, Value,
};

mock! {
    pub(crate) Reporter {}

    impl DispatchReporter for Reporter {
        fn type_realized(&self, capability: &CapabilitySetId, methods: usize);
        fn chain_built(&self, key: &MethodKey, shape: &ChainShape);
        fn chain_rebuilt(&self, key: &MethodKey, shape: &ChainShape);
        fn constraint_vetoed(&self, violation: &ConstraintViolation);
        fn fragment_failed(&self, error: &CompositionError);
        fn reactive_failed(&self, key: &MethodKey, fragment: &str, fault: &Fault);
    }
}

/// Factory resolving located targets from a fixed table, counting lookups.
#[derive(Default)]
pub(crate) struct LocatingFactory {
    located: HashMap<String, Fragment>,
    lookups: AtomicUsize,
}

impl LocatingFactory {
    pub(crate) fn with(mut self, key: &str, fragment: Fragment) -> Self {
        self.located.insert(key.to_owned(), fragment);
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl FragmentFactory for LocatingFactory {
    fn create(
        &self,
        descriptor: &FragmentDescriptor,
        context: &InjectionContext<'_>,
    ) -> Result<Fragment, FactoryError> {
        let TargetFactory::Located(key) = descriptor.target() else {
            return DefaultFragmentFactory.create(descriptor, context);
        };
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.located
            .get(key)
            .cloned()
            .ok_or_else(|| FactoryError::Unlocatable { key: key.clone() })
    }
}

/// Reporter that lets every event through.
pub(crate) fn quiet_reporter() -> MockReporter {
    let mut reporter = MockReporter::new();
    reporter.expect_type_realized().return_const(());
    reporter.expect_chain_built().return_const(());
    reporter.expect_chain_rebuilt().return_const(());
    reporter.expect_constraint_vetoed().return_const(());
    reporter.expect_fragment_failed().return_const(());
    reporter.expect_reactive_failed().return_const(());
    reporter
}

/// Ordered record of what fragments did during a test.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) fn greet() -> MethodSignature {
    MethodSignature::new("greet", [ParamType::String]).returning(ParamType::String)
}

pub(crate) fn greeter_set() -> CapabilitySet {
    CapabilitySet::new("Greeter")
        .with_method(greet())
        .with_method(MethodSignature::new("wave", []))
}

/// Primary answering `Hello, <name>` to `greet` and `null` to anything else.
pub(crate) fn hello() -> Fragment {
    Fragment::primary_fn(|frame| match frame.method().name() {
        "greet" => {
            let name = frame.arg(0).and_then(Value::as_str).unwrap_or_default();
            Ok(Value::from(format!("Hello, {name}")))
        }
        _ => Ok(Value::Null),
    })
}

pub(crate) fn hello_primary() -> FragmentDescriptor {
    FragmentDescriptor::new("hello", FragmentKind::Primary, hello())
}

/// `hello` built by a constructor that counts its invocations.
pub(crate) fn counted_hello(constructed: &Arc<AtomicUsize>) -> FragmentDescriptor {
    let counter = Arc::clone(constructed);
    FragmentDescriptor::new(
        "hello",
        FragmentKind::Primary,
        TargetFactory::constructor(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(hello())
        }),
    )
}

/// Builder collecting a capability set and its fragments.
pub(crate) struct Composition {
    registry: FragmentRegistry,
    id: CapabilitySetId,
}

impl Composition {
    pub(crate) fn of(set: CapabilitySet) -> Self {
        let mut registry = FragmentRegistry::new();
        let id = registry
            .register_capability_set(set)
            .expect("fresh capability set");
        Self { registry, id }
    }

    pub(crate) fn greeter() -> Self {
        Self::of(greeter_set())
    }

    pub(crate) fn with(mut self, descriptor: FragmentDescriptor) -> Self {
        self.registry
            .register_fragment(&self.id, descriptor)
            .expect("fragment registers");
        self
    }

    pub(crate) fn into_parts(self) -> (FragmentRegistry, CapabilitySetId) {
        (self.registry, self.id)
    }

    /// Realizes the composition on a runtime with a quiet mock reporter.
    pub(crate) fn realize(self) -> (CompositionRuntime, TypeHandle) {
        self.realize_with(|runtime| runtime)
    }

    pub(crate) fn realize_with(
        self,
        configure: impl FnOnce(CompositionRuntime) -> CompositionRuntime,
    ) -> (CompositionRuntime, TypeHandle) {
        let (registry, id) = self.into_parts();
        let runtime = configure(
            CompositionRuntime::new(registry).with_reporter(Arc::new(quiet_reporter())),
        );
        let handle = runtime.realize(&id).expect("composition realizes");
        (runtime, handle)
    }
}
