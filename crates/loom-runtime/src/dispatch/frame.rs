//! Views of the running call handed to fragments.

use std::panic::Location;

use crate::capability::{MethodKey, MethodSelector, MethodSignature};
use crate::error::CompositionError;
use crate::fault::Fault;
use crate::runtime::{CompositionRuntime, Receiver, TypeHandle};
use crate::state::SharedStateAccessor;
use crate::value::{Args, Value};

use super::{InvocationContext, PLUMBING_NEXT};

/// Read-only view of the call a fragment is taking part in.
#[derive(Clone, Copy)]
pub struct CallFrame<'a> {
    context: &'a InvocationContext<'a>,
    args: &'a [Value],
}

impl<'a> CallFrame<'a> {
    pub(crate) const fn new(context: &'a InvocationContext<'a>, args: &'a [Value]) -> Self {
        Self { context, args }
    }

    /// Returns the dispatched method.
    #[must_use]
    pub fn method(&self) -> &'a MethodSignature {
        self.context.chain().method()
    }

    /// Returns the key of the chain being walked.
    #[must_use]
    pub fn key(&self) -> &'a MethodKey {
        self.context.chain().key()
    }

    /// Returns the arguments as seen by this link.
    ///
    /// Interceptors further out may have rewritten them; reactions always
    /// see the caller's originals.
    #[must_use]
    pub const fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Returns one argument by position.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Returns the arguments the caller passed.
    #[must_use]
    pub fn original_args(&self) -> &'a [Value] {
        self.context.original_args()
    }

    /// Returns the composed object being called.
    #[must_use]
    pub const fn receiver(&self) -> &'a Receiver {
        self.context.receiver()
    }

    /// Returns the receiver's shared state.
    #[must_use]
    pub fn state(&self) -> &'a dyn SharedStateAccessor {
        self.context.receiver().state()
    }

    /// Returns the realized type being dispatched.
    #[must_use]
    pub const fn handle(&self) -> &'a TypeHandle {
        self.context.handle()
    }

    /// Returns the runtime, for calls into other composed objects.
    #[must_use]
    pub const fn runtime(&self) -> &'a CompositionRuntime {
        self.context.runtime()
    }

    /// Returns how many re-entrant calls enclose this one.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.context.depth()
    }

    /// Calls another method on the same receiver through its own chain.
    ///
    /// # Errors
    ///
    /// Returns the nested call's [`CompositionError`]; propagating it with
    /// `?` from a fragment hands it to the outer caller unchanged.
    #[track_caller]
    pub fn call_self(
        &self,
        method: impl Into<MethodSelector>,
        args: Args,
    ) -> Result<Value, CompositionError> {
        let context = self.context;
        context.runtime().dispatch(
            context.handle(),
            context.receiver(),
            &method.into(),
            args,
            context.depth().saturating_add(1),
            Location::caller(),
        )
    }
}

/// Handle on the rest of the chain, given to interceptors.
pub struct Next<'a> {
    context: &'a InvocationContext<'a>,
    index: usize,
    args: Args,
}

impl<'a> Next<'a> {
    pub(crate) const fn new(context: &'a InvocationContext<'a>, index: usize, args: Args) -> Self {
        Self {
            context,
            index,
            args,
        }
    }

    /// Returns the arguments this link received.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the frame of this link.
    #[must_use]
    pub fn frame(&self) -> CallFrame<'_> {
        CallFrame::new(self.context, &self.args)
    }

    /// Invokes the rest of the chain with `args`.
    ///
    /// May be called more than once; not calling it truncates the chain.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised further down the chain.
    pub fn invoke_next(&self, args: Args) -> Result<Value, Fault> {
        self.context
            .run_link(self.index.saturating_add(1), args)
            .map_err(|fault| fault.through(PLUMBING_NEXT))
    }

    /// Invokes the rest of the chain with the arguments this link received.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised further down the chain.
    pub fn proceed(&self) -> Result<Value, Fault> {
        self.invoke_next(self.args.clone())
    }
}
