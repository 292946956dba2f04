//! The live composition runtime.
//!
//! [`CompositionRuntime`] owns the frozen registry. Realizing a capability
//! set validates primary selection for every method and yields a
//! [`TypeHandle`] holding one chain slot per method; calls go through
//! [`CompositionRuntime::call`], which resolves the method, fetches or
//! builds its chain and hands it to the dispatch core.

mod receiver;


use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use loom_config::{ChainBuild, Config};
use tracing::debug_span;

use crate::capability::{
    CapabilitySet, CapabilitySetId, MethodKey, MethodSelector, MethodSignature,
};
use crate::chain::{ChainBuilder, ChainShape, ChainSlot, InvocationChain};
use crate::dispatch::{DISPATCH_TARGET, InvocationContext, invoke};
use crate::error::{CompositionDefect, CompositionError};
use crate::fragment::{DefaultFragmentFactory, FragmentFactory};
use crate::registry::{CapabilityEntry, FragmentRegistry, RegisteredFragment};
use crate::report::{DispatchReporter, StructuredDispatchReporter};
use crate::value::{Args, Value};

pub(crate) use self::receiver::InstanceKey;
pub use self::receiver::{Receiver, ReceiverId};

static NEXT_REALIZED: AtomicU64 = AtomicU64::new(1);

struct RealizedType {
    id: u64,
    capability: CapabilitySet,
    fragments: Vec<Arc<RegisteredFragment>>,
    slots: HashMap<MethodKey, ChainSlot>,
}

impl RealizedType {
    fn new(entry: &CapabilityEntry) -> Self {
        let capability = entry.set().clone();
        let slots = capability
            .methods()
            .iter()
            .map(|method| (capability.key_for(method), ChainSlot::default()))
            .collect();
        Self {
            id: NEXT_REALIZED.fetch_add(1, Ordering::Relaxed),
            fragments: entry.fragments().to_vec(),
            slots,
            capability,
        }
    }
}

/// Handle on a realized composite type.
///
/// Cloning is cheap; every clone shares the same chain cache.
#[derive(Clone)]
pub struct TypeHandle(Arc<RealizedType>);

impl TypeHandle {
    /// Process-unique identity of the realized type. Fragment identifiers
    /// are only unique within one registry, so receiver caches key on this
    /// as well.
    pub(crate) fn realized_id(&self) -> u64 {
        self.0.id
    }

    /// Returns the capability set the type implements.
    #[must_use]
    pub fn capability(&self) -> &CapabilitySet {
        &self.0.capability
    }

    /// Returns the type's methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodSignature] {
        self.0.capability.methods()
    }

    /// Returns how many chains have been published so far.
    #[must_use]
    pub fn built_chains(&self) -> usize {
        self.0
            .slots
            .values()
            .filter(|slot| slot.current().is_some())
            .count()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("capability", self.capability().id())
            .field("methods", &self.methods().len())
            .finish_non_exhaustive()
    }
}

/// Composition runtime: realizes types and dispatches calls.
///
/// # Example
///
/// ```
/// use loom_runtime::{
///     CapabilitySet, CompositionRuntime, Fragment, FragmentDescriptor, FragmentKind,
///     FragmentRegistry, MethodSignature, ParamType, Receiver, Value,
/// };
///
/// let mut registry = FragmentRegistry::new();
/// let id = registry
///     .register_capability_set(
///         CapabilitySet::new("Echo").with_method(MethodSignature::new("echo", [ParamType::Any])),
///     )
///     .expect("fresh set");
/// registry
///     .register_fragment(
///         &id,
///         FragmentDescriptor::new(
///             "echo",
///             FragmentKind::Primary,
///             Fragment::primary_fn(|frame| Ok(frame.arg(0).cloned().unwrap_or_default())),
///         ),
///     )
///     .expect("fresh fragment");
///
/// let runtime = CompositionRuntime::new(registry);
/// let handle = runtime.realize(&id).expect("composable");
/// let receiver = Receiver::stateless();
/// let echoed = runtime
///     .call(&handle, &receiver, "echo", vec![Value::from(42)])
///     .expect("echo succeeds");
/// assert_eq!(echoed, Value::from(42));
/// ```
pub struct CompositionRuntime {
    registry: FragmentRegistry,
    factory: Arc<dyn FragmentFactory>,
    reporter: Arc<dyn DispatchReporter>,
    config: Config,
    realized: Mutex<HashMap<CapabilitySetId, TypeHandle>>,
}

impl CompositionRuntime {
    /// Takes ownership of a populated registry.
    #[must_use]
    pub fn new(registry: FragmentRegistry) -> Self {
        Self {
            registry,
            factory: Arc::new(DefaultFragmentFactory),
            reporter: Arc::new(StructuredDispatchReporter::new()),
            config: Config::default(),
            realized: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the fragment factory.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn FragmentFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn DispatchReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns the frozen registry.
    #[must_use]
    pub const fn registry(&self) -> &FragmentRegistry {
        &self.registry
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn factory(&self) -> &dyn FragmentFactory {
        self.factory.as_ref()
    }

    pub(crate) fn reporter(&self) -> &dyn DispatchReporter {
        self.reporter.as_ref()
    }

    /// Realizes a capability set into a dispatchable type.
    ///
    /// Every method must have a unique applicable primary. With
    /// [`ChainBuild::Eager`] all chains are built and published before the
    /// handle is returned. Realizing the same set twice yields the same
    /// type; concurrent first realizations build and report it once.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::InvalidComposition`] for unknown sets and
    /// missing or ambiguous primaries, and
    /// [`CompositionError::NoSuchFragment`] when an eager build cannot
    /// instantiate a shared fragment.
    pub fn realize(&self, capability: &CapabilitySetId) -> Result<TypeHandle, CompositionError> {
        let mut realized_types = self.lock_realized();
        if let Some(handle) = realized_types.get(capability) {
            return Ok(handle.clone());
        }
        let entry = self.registry.entry(capability).ok_or_else(|| {
            CompositionError::invalid(capability.clone(), CompositionDefect::UnknownCapabilitySet)
        })?;
        let realized = RealizedType::new(entry);
        {
            let builder = self.builder(&realized);
            for method in realized.capability.methods() {
                builder.select_primary(method)?;
            }
        }
        if self.config.chain_build() == ChainBuild::Eager {
            for method in realized.capability.methods() {
                self.chain(&realized, method)?;
            }
        }
        self.reporter
            .type_realized(capability, realized.capability.methods().len());
        let handle = TypeHandle(Arc::new(realized));
        realized_types.insert(capability.clone(), handle.clone());
        Ok(handle)
    }

    /// Dispatches a call through the method's chain.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] when the method cannot be resolved, its
    /// chain cannot be built, a constraint vetoes the call, or a fragment
    /// fails.
    #[track_caller]
    pub fn call(
        &self,
        handle: &TypeHandle,
        receiver: &Receiver,
        method: impl Into<MethodSelector>,
        args: Args,
    ) -> Result<Value, CompositionError> {
        let location = Location::caller();
        self.dispatch(handle, receiver, &method.into(), args, 0, location)
    }

    /// Returns the structure of a method's chain, building it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] when the selector names no single method
    /// or the chain cannot be built.
    pub fn chain_shape(
        &self,
        handle: &TypeHandle,
        method: impl Into<MethodSelector>,
    ) -> Result<ChainShape, CompositionError> {
        let signature = lookup(handle, &method.into())?;
        Ok(self.chain(&handle.0, signature)?.shape())
    }

    /// Builds a method's chain afresh and atomically replaces the cached
    /// one. Calls already walking the old chain finish on it.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] when the selector names no single method
    /// or the chain cannot be built; the previous chain then stays cached.
    pub fn rebuild(
        &self,
        handle: &TypeHandle,
        method: impl Into<MethodSelector>,
    ) -> Result<ChainShape, CompositionError> {
        let realized = handle.0.as_ref();
        let signature = lookup(handle, &method.into())?;
        let chain = slot(realized, signature)?.rebuild(|| self.builder(realized).build(signature))?;
        let shape = chain.shape();
        self.reporter.chain_rebuilt(chain.key(), &shape);
        Ok(shape)
    }

    pub(crate) fn dispatch(
        &self,
        handle: &TypeHandle,
        receiver: &Receiver,
        selector: &MethodSelector,
        args: Args,
        depth: usize,
        location: &'static Location<'static>,
    ) -> Result<Value, CompositionError> {
        let capability = handle.capability();
        let signature = capability.resolve(selector, &args).ok_or_else(|| {
            unknown_method(capability, selector)
        })?;
        let chain = self.chain(&handle.0, signature)?;
        let span = debug_span!(
            target: DISPATCH_TARGET,
            "call",
            capability = %capability.id(),
            method = %signature,
            depth,
            receiver = %receiver.id(),
        );
        let _entered = span.enter();
        let context =
            InvocationContext::new(self, handle, receiver, &chain, args, depth, location);
        invoke(&context)
    }

    fn chain(
        &self,
        realized: &RealizedType,
        method: &MethodSignature,
    ) -> Result<Arc<InvocationChain>, CompositionError> {
        slot(realized, method)?.get_or_build(|| {
            let chain = self.builder(realized).build(method)?;
            self.reporter.chain_built(chain.key(), &chain.shape());
            Ok(chain)
        })
    }

    fn builder<'a>(&'a self, realized: &'a RealizedType) -> ChainBuilder<'a> {
        ChainBuilder::new(&realized.capability, &realized.fragments, self.factory())
            .with_after_order(self.config.after_order())
    }

    fn lock_realized(&self) -> MutexGuard<'_, HashMap<CapabilitySetId, TypeHandle>> {
        self.realized.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CompositionRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionRuntime")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn slot<'a>(
    realized: &'a RealizedType,
    method: &MethodSignature,
) -> Result<&'a ChainSlot, CompositionError> {
    realized
        .slots
        .get(&realized.capability.key_for(method))
        .ok_or_else(|| unknown_method(&realized.capability, &MethodSelector::from(method)))
}

fn lookup<'a>(
    handle: &'a TypeHandle,
    selector: &MethodSelector,
) -> Result<&'a MethodSignature, CompositionError> {
    let capability = handle.capability();
    capability
        .lookup(selector)
        .ok_or_else(|| unknown_method(capability, selector))
}

fn unknown_method(capability: &CapabilitySet, selector: &MethodSelector) -> CompositionError {
    CompositionError::invalid(
        capability.id().clone(),
        CompositionDefect::UnknownMethod {
            method: selector.to_string(),
        },
    )
}
