//! Runtime behaviour of fragment instances.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::{CallFrame, Next};
use crate::fault::Fault;
use crate::value::{Args, Value};

use super::FragmentKind;

/// Terminal implementation of a method.
pub trait Primary: Send + Sync {
    /// Produces the method result.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the implementation fails; use
    /// [`Fault::unimplemented`] for methods the fragment does not support.
    fn invoke(&self, frame: &CallFrame<'_>) -> Result<Value, Fault>;
}

/// Interceptor wrapped around the rest of the chain.
///
/// Implementors override [`Interceptor::before`], [`Interceptor::after`], or
/// take full control with [`Interceptor::intercept`]. Returning from
/// `intercept` without calling [`Next::invoke_next`] truncates the chain.
pub trait Interceptor: Send + Sync {
    /// Runs before the rest of the chain and may rewrite the arguments.
    ///
    /// # Errors
    ///
    /// Returning an error skips the rest of the chain.
    fn before(&self, _frame: &CallFrame<'_>, _args: &mut Args) -> Result<(), Fault> {
        Ok(())
    }

    /// Runs after the rest of the chain succeeded and may replace the result.
    ///
    /// # Errors
    ///
    /// Returning an error replaces the result with that failure.
    fn after(&self, _frame: &CallFrame<'_>, result: Value) -> Result<Value, Fault> {
        Ok(result)
    }

    /// Wraps the rest of the chain.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Interceptor::before`], the rest of the
    /// chain and [`Interceptor::after`].
    fn intercept(&self, next: Next<'_>) -> Result<Value, Fault> {
        let mut args = next.args().to_vec();
        self.before(&next.frame(), &mut args)?;
        let result = next.invoke_next(args)?;
        self.after(&next.frame(), result)
    }
}

/// Reason a constraint vetoed a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: String,
}

impl Rejection {
    /// Creates a rejection with a human-readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason.
    #[must_use]
    pub const fn reason(&self) -> &str {
        self.reason.as_str()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Pre- and postcondition check.
pub trait Constraint: Send + Sync {
    /// Checks the arguments before the rest of the chain runs.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] to veto the call.
    fn check(&self, frame: &CallFrame<'_>) -> Result<(), Rejection>;

    /// Checks the result once the rest of the chain returned.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] to veto the result.
    fn check_result(&self, _frame: &CallFrame<'_>, _result: &Value) -> Result<(), Rejection> {
        Ok(())
    }
}

/// Side effect fired after a successful call.
pub trait Reactive: Send + Sync {
    /// Observes the final result. The frame carries the caller's original
    /// arguments.
    ///
    /// # Errors
    ///
    /// Failures are reported and otherwise ignored.
    fn react(&self, frame: &CallFrame<'_>, result: &Value) -> Result<(), Fault>;
}

/// A fragment instance, tagged by the behaviour it implements.
#[derive(Clone)]
pub enum Fragment {
    /// Primary implementation.
    Primary(Arc<dyn Primary>),
    /// Before or after interceptor.
    Interceptor(Arc<dyn Interceptor>),
    /// Post-commit reaction.
    Reactive(Arc<dyn Reactive>),
    /// Pre/postcondition check.
    Constraint(Arc<dyn Constraint>),
}

impl Fragment {
    /// Wraps a primary implementation.
    #[must_use]
    pub fn primary(primary: impl Primary + 'static) -> Self {
        Self::Primary(Arc::new(primary))
    }

    /// Wraps an interceptor.
    #[must_use]
    pub fn interceptor(interceptor: impl Interceptor + 'static) -> Self {
        Self::Interceptor(Arc::new(interceptor))
    }

    /// Wraps a reaction.
    #[must_use]
    pub fn reactive(reactive: impl Reactive + 'static) -> Self {
        Self::Reactive(Arc::new(reactive))
    }

    /// Wraps a constraint.
    #[must_use]
    pub fn constraint(constraint: impl Constraint + 'static) -> Self {
        Self::Constraint(Arc::new(constraint))
    }

    /// Builds a primary from a closure.
    #[must_use]
    pub fn primary_fn<F>(invoke: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::primary(FnPrimary(invoke))
    }

    /// Builds an interceptor that takes full control of the rest of the
    /// chain.
    #[must_use]
    pub fn interceptor_fn<F>(intercept: F) -> Self
    where
        F: Fn(Next<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::interceptor(FnInterceptor(intercept))
    }

    /// Builds an interceptor with pre-logic only.
    #[must_use]
    pub fn before_fn<F>(before: F) -> Self
    where
        F: Fn(&CallFrame<'_>, &mut Args) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::interceptor(FnBefore(before))
    }

    /// Builds an interceptor with post-logic only.
    #[must_use]
    pub fn after_fn<F>(after: F) -> Self
    where
        F: Fn(&CallFrame<'_>, Value) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::interceptor(FnAfter(after))
    }

    /// Builds a reaction from a closure.
    #[must_use]
    pub fn reactive_fn<F>(react: F) -> Self
    where
        F: Fn(&CallFrame<'_>, &Value) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::reactive(FnReactive(react))
    }

    /// Builds a precondition from a closure.
    #[must_use]
    pub fn constraint_fn<F>(check: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> Result<(), Rejection> + Send + Sync + 'static,
    {
        Self::constraint(FnConstraint(check))
    }

    /// Returns the variant name used in diagnostics.
    #[must_use]
    pub const fn variant(&self) -> &'static str {
        match self {
            Self::Primary(_) => "primary",
            Self::Interceptor(_) => "interceptor",
            Self::Reactive(_) => "reactive",
            Self::Constraint(_) => "constraint",
        }
    }

    /// Returns `true` when this instance can fill a link of `kind`.
    #[must_use]
    pub const fn fits(&self, kind: FragmentKind) -> bool {
        matches!(
            (self, kind),
            (Self::Primary(_), FragmentKind::Primary)
                | (Self::Interceptor(_), FragmentKind::Before | FragmentKind::After)
                | (Self::Reactive(_), FragmentKind::Reactive)
                | (Self::Constraint(_), FragmentKind::Constraint)
        )
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fragment::{}", self.variant())
    }
}

struct FnPrimary<F>(F);

impl<F> Primary for FnPrimary<F>
where
    F: Fn(&CallFrame<'_>) -> Result<Value, Fault> + Send + Sync,
{
    fn invoke(&self, frame: &CallFrame<'_>) -> Result<Value, Fault> {
        (self.0)(frame)
    }
}

struct FnInterceptor<F>(F);

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(Next<'_>) -> Result<Value, Fault> + Send + Sync,
{
    fn intercept(&self, next: Next<'_>) -> Result<Value, Fault> {
        (self.0)(next)
    }
}

struct FnBefore<F>(F);

impl<F> Interceptor for FnBefore<F>
where
    F: Fn(&CallFrame<'_>, &mut Args) -> Result<(), Fault> + Send + Sync,
{
    fn before(&self, frame: &CallFrame<'_>, args: &mut Args) -> Result<(), Fault> {
        (self.0)(frame, args)
    }
}

struct FnAfter<F>(F);

impl<F> Interceptor for FnAfter<F>
where
    F: Fn(&CallFrame<'_>, Value) -> Result<Value, Fault> + Send + Sync,
{
    fn after(&self, frame: &CallFrame<'_>, result: Value) -> Result<Value, Fault> {
        (self.0)(frame, result)
    }
}

struct FnReactive<F>(F);

impl<F> Reactive for FnReactive<F>
where
    F: Fn(&CallFrame<'_>, &Value) -> Result<(), Fault> + Send + Sync,
{
    fn react(&self, frame: &CallFrame<'_>, result: &Value) -> Result<(), Fault> {
        (self.0)(frame, result)
    }
}

struct FnConstraint<F>(F);

impl<F> Constraint for FnConstraint<F>
where
    F: Fn(&CallFrame<'_>) -> Result<(), Rejection> + Send + Sync,
{
    fn check(&self, frame: &CallFrame<'_>) -> Result<(), Rejection> {
        (self.0)(frame)
    }
}
