//! Structured reporting of runtime lifecycle events.

use std::sync::Arc;

use crate::capability::{CapabilitySetId, MethodKey};
use crate::chain::ChainShape;
use crate::error::{CompositionError, ConstraintViolation};
use crate::fault::Fault;

pub(crate) const REPORT_TARGET: &str = "loom_runtime::report";
pub(crate) const CHAIN_TARGET: &str = "loom_runtime::chain";

/// Observer trait used to surface runtime events to telemetry sinks.
pub trait DispatchReporter: Send + Sync {
    /// Invoked once a capability set has been realized.
    fn type_realized(&self, capability: &CapabilitySetId, methods: usize);

    /// Invoked after a chain has been built and before it is published.
    fn chain_built(&self, key: &MethodKey, shape: &ChainShape);

    /// Invoked after a chain has been rebuilt and swapped in.
    fn chain_rebuilt(&self, key: &MethodKey, shape: &ChainShape);

    /// Invoked when a constraint vetoes a call.
    fn constraint_vetoed(&self, violation: &ConstraintViolation);

    /// Invoked when a call fails inside a fragment.
    fn fragment_failed(&self, error: &CompositionError);

    /// Invoked when a reaction fails; the call result is unaffected.
    fn reactive_failed(&self, key: &MethodKey, fragment: &str, fault: &Fault);
}

impl<T> DispatchReporter for Arc<T>
where
    T: DispatchReporter,
{
    fn type_realized(&self, capability: &CapabilitySetId, methods: usize) {
        (**self).type_realized(capability, methods);
    }

    fn chain_built(&self, key: &MethodKey, shape: &ChainShape) {
        (**self).chain_built(key, shape);
    }

    fn chain_rebuilt(&self, key: &MethodKey, shape: &ChainShape) {
        (**self).chain_rebuilt(key, shape);
    }

    fn constraint_vetoed(&self, violation: &ConstraintViolation) {
        (**self).constraint_vetoed(violation);
    }

    fn fragment_failed(&self, error: &CompositionError) {
        (**self).fragment_failed(error);
    }

    fn reactive_failed(&self, key: &MethodKey, fragment: &str, fault: &Fault) {
        (**self).reactive_failed(key, fragment, fault);
    }
}

/// Default reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDispatchReporter;

impl StructuredDispatchReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DispatchReporter for StructuredDispatchReporter {
    fn type_realized(&self, capability: &CapabilitySetId, methods: usize) {
        tracing::info!(
            target: REPORT_TARGET,
            event = "type_realized",
            capability = %capability,
            methods,
            "composite type realized"
        );
    }

    fn chain_built(&self, key: &MethodKey, shape: &ChainShape) {
        tracing::debug!(
            target: CHAIN_TARGET,
            event = "chain_built",
            method = %key,
            shape = %shape,
            "invocation chain built"
        );
    }

    fn chain_rebuilt(&self, key: &MethodKey, shape: &ChainShape) {
        tracing::info!(
            target: CHAIN_TARGET,
            event = "chain_rebuilt",
            method = %key,
            shape = %shape,
            "invocation chain rebuilt"
        );
    }

    fn constraint_vetoed(&self, violation: &ConstraintViolation) {
        tracing::info!(
            target: REPORT_TARGET,
            event = "constraint_vetoed",
            constraint = %violation.constraint,
            method = %violation.method,
            phase = %violation.phase,
            reason = %violation.reason,
            "constraint vetoed call"
        );
    }

    fn fragment_failed(&self, error: &CompositionError) {
        tracing::warn!(
            target: REPORT_TARGET,
            event = "fragment_failed",
            error = %error,
            "fragment failed"
        );
    }

    fn reactive_failed(&self, key: &MethodKey, fragment: &str, fault: &Fault) {
        tracing::error!(
            target: REPORT_TARGET,
            event = "reactive_failed",
            method = %key,
            fragment,
            error = %fault,
            "reaction failed after a successful call"
        );
    }
}
