//! Generic-object composition runtime.
//!
//! The `loom-runtime` crate composes objects out of independently declared
//! implementation fragments. A capability set names the methods a composed
//! object must offer; fragments registered against it supply the behaviour:
//! **primaries** implement methods, **before** and **after** interceptors
//! wrap them, **constraints** veto calls before or after they run, and
//! **reactions** fire once a call has succeeded.
//!
//! # Architecture
//!
//! Registration happens once, at bootstrap, through a [`FragmentRegistry`].
//! The registry then moves into a [`CompositionRuntime`] and is never
//! mutated again. [`CompositionRuntime::realize`] checks that every method
//! has exactly one most-specific applicable primary and returns a
//! [`TypeHandle`]. Each method's [`InvocationChain`] is built once, lazily
//! on first dispatch or eagerly at realization, and shared by every
//! [`Receiver`] of the type. Failures raised inside a chain are translated
//! into the caller-facing [`CompositionError`] taxonomy.
//!
//! # Example
//!
//! ```rust
//! use loom_runtime::{
//!     AppliesTo, CapabilitySet, CompositionRuntime, Fragment, FragmentDescriptor, FragmentKind,
//!     FragmentRegistry, MethodSignature, ParamType, Receiver, Value,
//! };
//!
//! let mut registry = FragmentRegistry::new();
//! let greeter = registry
//!     .register_capability_set(
//!         CapabilitySet::new("Greeter")
//!             .with_method(MethodSignature::new("greet", [ParamType::String])),
//!     )
//!     .expect("fresh set");
//! registry
//!     .register_fragment(
//!         &greeter,
//!         FragmentDescriptor::new(
//!             "hello",
//!             FragmentKind::Primary,
//!             Fragment::primary_fn(|frame| {
//!                 let name = frame.arg(0).and_then(Value::as_str).unwrap_or_default();
//!                 Ok(Value::from(format!("Hello, {name}")))
//!             }),
//!         ),
//!     )
//!     .expect("fresh fragment");
//! registry
//!     .register_fragment(
//!         &greeter,
//!         FragmentDescriptor::new(
//!             "shout",
//!             FragmentKind::After,
//!             Fragment::after_fn(|_, result| {
//!                 Ok(Value::from(result.as_str().unwrap_or_default().to_uppercase()))
//!             }),
//!         )
//!         .with_applies_to(AppliesTo::Always),
//!     )
//!     .expect("fresh fragment");
//!
//! let runtime = CompositionRuntime::new(registry);
//! let handle = runtime.realize(&greeter).expect("composable");
//! let greeting = runtime
//!     .call(&handle, &Receiver::stateless(), "greet", vec![Value::from("Ann")])
//!     .expect("greet succeeds");
//! assert_eq!(greeting, Value::from("HELLO, ANN"));
//! ```

pub mod capability;
pub mod chain;
pub mod dispatch;
pub mod error;
pub mod fault;
pub mod fragment;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod runtime;
pub mod state;
pub mod telemetry;
pub mod value;

#[cfg(test)]
mod tests;

pub use self::capability::{
    CapabilitySet, CapabilitySetId, MethodKey, MethodSelector, MethodSignature,
};
pub use self::chain::{ChainBuilder, ChainLink, ChainShape, InvocationChain};
pub use self::dispatch::{CallFrame, InvocationContext, Next};
pub use self::error::{CompositionDefect, CompositionError, ConstraintPhase, ConstraintViolation};
pub use self::fault::{CallSite, Fault, FaultOrigin, FaultTrace, TraceFrame};
pub use self::fragment::{
    AppliesTo, AppliesToFilter, Constraint, DeclaredMethod, DefaultFragmentFactory,
    FactoryError, Fragment, FragmentClass, FragmentDescriptor, FragmentFactory, FragmentId,
    FragmentKind, InjectionContext, InstanceScope, Interceptor, MethodCoverage, Primary,
    Reactive, Rejection, TargetFactory,
};
pub use self::registry::{FragmentRegistry, RegisteredFragment, RegistrationError};
pub use self::report::{DispatchReporter, StructuredDispatchReporter};
pub use self::runtime::{CompositionRuntime, Receiver, ReceiverId, TypeHandle};
pub use self::state::{NoState, PropertyMap, SharedStateAccessor, StateError};
pub use self::value::{Args, ParamType, ResultSlot, Value};
