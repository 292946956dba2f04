//! Dispatch core: walks a cached chain for one call.
//!
//! Every call gets a fresh [`InvocationContext`] living on the caller's
//! stack. Links are walked outermost first; each link resolves its fragment
//! instance only when reached, so a vetoing constraint never causes the
//! primary to be instantiated. Reactions run once the walk succeeds and can
//! never change its outcome.

mod frame;


use std::panic::Location;

use tracing::debug;

use crate::chain::{ChainLink, InvocationChain};
use crate::error::{CompositionError, ConstraintPhase, ConstraintViolation};
use crate::fault::{CallSite, Fault, translate};
use crate::fragment::{
    Constraint, FactoryError, Fragment, FragmentKind, InjectionContext, Rejection, instantiate,
};
use crate::runtime::{CompositionRuntime, InstanceKey, Receiver, TypeHandle};
use crate::value::{Args, Value};

pub use self::frame::{CallFrame, Next};

pub(crate) const DISPATCH_TARGET: &str = "loom_runtime::dispatch";

pub(crate) const PLUMBING_NEXT: &str = "Next::invoke_next";

/// Per-call state: receiver, chain, original arguments and nesting depth.
pub struct InvocationContext<'a> {
    runtime: &'a CompositionRuntime,
    handle: &'a TypeHandle,
    receiver: &'a Receiver,
    chain: &'a InvocationChain,
    original: Args,
    depth: usize,
    location: &'static Location<'static>,
}

impl<'a> InvocationContext<'a> {
    pub(crate) const fn new(
        runtime: &'a CompositionRuntime,
        handle: &'a TypeHandle,
        receiver: &'a Receiver,
        chain: &'a InvocationChain,
        original: Args,
        depth: usize,
        location: &'static Location<'static>,
    ) -> Self {
        Self {
            runtime,
            handle,
            receiver,
            chain,
            original,
            depth,
            location,
        }
    }

    /// Returns the chain being walked.
    #[must_use]
    pub const fn chain(&self) -> &'a InvocationChain {
        self.chain
    }

    /// Returns the composed object being called.
    #[must_use]
    pub const fn receiver(&self) -> &'a Receiver {
        self.receiver
    }

    /// Returns the realized type being dispatched.
    #[must_use]
    pub const fn handle(&self) -> &'a TypeHandle {
        self.handle
    }

    /// Returns the runtime owning the chain.
    #[must_use]
    pub const fn runtime(&self) -> &'a CompositionRuntime {
        self.runtime
    }

    /// Returns the caller's arguments.
    #[must_use]
    pub fn original_args(&self) -> &[Value] {
        &self.original
    }

    /// Returns how many re-entrant calls enclose this one.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn run_link(&self, index: usize, args: Args) -> Result<Value, Fault> {
        let Some(link) = self.chain.links().get(index) else {
            return Err(self.no_such_fragment(
                self.chain.primary(),
                FactoryError::failed("chain ended without a primary"),
            ));
        };
        match self.instance(link)? {
            Fragment::Constraint(constraint) => {
                self.run_constraint(index, link, constraint.as_ref(), args)
            }
            Fragment::Interceptor(interceptor) => interceptor
                .intercept(Next::new(self, index, args))
                .map_err(|fault| fault.leaving(link.name(), link.kind())),
            Fragment::Primary(primary) => primary
                .invoke(&CallFrame::new(self, &args))
                .map_err(|fault| fault.leaving(link.name(), link.kind())),
            Fragment::Reactive(_) => Err(self.no_such_fragment(
                Some(link),
                FactoryError::KindMismatch {
                    expected: link.kind(),
                    found: "reactive",
                },
            )),
        }
    }

    fn run_constraint(
        &self,
        index: usize,
        link: &ChainLink,
        constraint: &dyn Constraint,
        args: Args,
    ) -> Result<Value, Fault> {
        let frame = CallFrame::new(self, &args);
        if let Err(rejection) = constraint.check(&frame) {
            return Err(self.veto(link, rejection, &args, ConstraintPhase::Pre));
        }
        let result = self.run_link(index.saturating_add(1), args.clone())?;
        if let Err(rejection) = constraint.check_result(&frame, &result) {
            return Err(self.veto(link, rejection, &args, ConstraintPhase::Post));
        }
        Ok(result)
    }

    fn veto(
        &self,
        link: &ChainLink,
        rejection: Rejection,
        args: &[Value],
        phase: ConstraintPhase,
    ) -> Fault {
        let violation = ConstraintViolation {
            constraint: link.name().to_owned(),
            method: self.chain.key().to_string(),
            arguments: args.to_vec(),
            reason: rejection.reason().to_owned(),
            phase,
        };
        self.runtime.reporter().constraint_vetoed(&violation);
        Fault::from(CompositionError::from(violation))
    }

    fn run_reactions(&self, result: &Value) {
        for link in self.chain.reactions() {
            let outcome = self.instance(link).and_then(|fragment| match fragment {
                Fragment::Reactive(reactive) => {
                    reactive.react(&CallFrame::new(self, &self.original), result)
                }
                other => Err(self.no_such_fragment(
                    Some(link),
                    FactoryError::KindMismatch {
                        expected: FragmentKind::Reactive,
                        found: other.variant(),
                    },
                )),
            });
            if let Err(fault) = outcome {
                self.runtime
                    .reporter()
                    .reactive_failed(self.chain.key(), link.name(), &fault);
            }
        }
    }

    fn instance(&self, link: &ChainLink) -> Result<Fragment, Fault> {
        if let Some(shared) = link.shared_instance() {
            return Ok(shared.clone());
        }
        let registered = link.fragment();
        let descriptor = registered.descriptor();
        let per_method = descriptor.kind() != FragmentKind::Primary;
        let key = InstanceKey::new(
            self.handle.realized_id(),
            registered.id(),
            per_method.then(|| self.chain.key().clone()),
        );
        self.receiver
            .instance(key, || {
                let context = InjectionContext::new(descriptor, self.handle.capability())
                    .for_receiver(self.receiver.id(), self.receiver.state());
                if per_method {
                    instantiate(self.runtime.factory(), &context.for_method(self.chain.method()))
                } else {
                    instantiate(self.runtime.factory(), &context)
                }
            })
            .map_err(|source| self.no_such_fragment(Some(link), source))
    }

    fn no_such_fragment(&self, link: Option<&ChainLink>, source: FactoryError) -> Fault {
        Fault::from(CompositionError::NoSuchFragment {
            fragment: link.map_or_else(String::new, |found| found.name().to_owned()),
            method: self.chain.key().to_string(),
            source,
        })
    }
}

/// Walks the context's chain with the caller's arguments.
///
/// On success the reactions run with the final result and the original
/// arguments, and the result is returned unchanged. On failure the unwound
/// fault is translated for the caller and no reaction runs.
///
/// # Errors
///
/// Returns the translated [`CompositionError`].
pub fn invoke(context: &InvocationContext<'_>) -> Result<Value, CompositionError> {
    match context.run_link(0, context.original.clone()) {
        Ok(result) => {
            context.run_reactions(&result);
            debug!(
                target: DISPATCH_TARGET,
                method = %context.chain.key(),
                depth = context.depth,
                "call completed"
            );
            Ok(result)
        }
        Err(fault) => {
            let passthrough = fault.root_cause().is_passthrough();
            let error = translate(fault, &CallSite::new(context.chain.key().clone(), context.location));
            if !passthrough && matches!(error, CompositionError::FragmentExecution { .. }) {
                context.runtime.reporter().fragment_failed(&error);
            }
            Err(error)
        }
    }
}
