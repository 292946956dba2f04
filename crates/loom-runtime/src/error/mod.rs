//! Caller-facing error taxonomy.
//!
//! Every failure leaving [`crate::CompositionRuntime::call`] or
//! [`crate::CompositionRuntime::realize`] is one of the four
//! [`CompositionError`] variants. Structural defects and instantiation
//! failures are fatal; constraint vetoes are recoverable; fragment failures
//! carry the original cause unchanged.

use std::fmt;

use thiserror::Error;

use crate::capability::CapabilitySetId;
use crate::fault::{Fault, FaultTrace};
use crate::fragment::FactoryError;
use crate::value::Value;


/// Structural defect detected while composing a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionDefect {
    /// No applicable primary fragment implements the method.
    #[error("no applicable primary fragment implements {method}")]
    NoPrimary {
        /// Method without an implementation.
        method: String,
    },
    /// Several primary fragments are equally specific.
    #[error("ambiguous primary for {method}: {}", .candidates.join(", "))]
    AmbiguousPrimary {
        /// Method with competing implementations.
        method: String,
        /// Names of the competing fragments in declaration order.
        candidates: Vec<String>,
    },
    /// The capability set declares no method matching the selector.
    #[error("unknown method {method}")]
    UnknownMethod {
        /// Selector as written by the caller.
        method: String,
    },
    /// The selected primary does not implement the method after all.
    #[error("{method} is not implemented by fragment '{fragment}'")]
    NotImplemented {
        /// Method that was dispatched.
        method: String,
        /// Fragment that reported the gap.
        fragment: String,
    },
    /// The capability set was never registered.
    #[error("capability set is not registered")]
    UnknownCapabilitySet,
}

/// Phase in which a constraint vetoed a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintPhase {
    /// Before the rest of the chain ran.
    Pre,
    /// After the rest of the chain returned a result.
    Post,
}

impl fmt::Display for ConstraintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "precondition",
            Self::Post => "postcondition",
        })
    }
}

/// A constraint vetoed a call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{phase} '{constraint}' rejected {method}: {reason}")]
pub struct ConstraintViolation {
    /// Name of the vetoing constraint fragment.
    pub constraint: String,
    /// Method that was vetoed.
    pub method: String,
    /// Arguments the constraint saw.
    pub arguments: Vec<Value>,
    /// Reason given by the constraint.
    pub reason: String,
    /// Whether the arguments or the result were rejected.
    pub phase: ConstraintPhase,
}

/// Errors surfaced to callers of the composition runtime.
#[derive(Debug, Clone, Error)]
pub enum CompositionError {
    /// The type cannot be composed as declared.
    #[error("invalid composition of {capability}: {defect}")]
    InvalidComposition {
        /// Capability set being composed.
        capability: CapabilitySetId,
        /// The detected defect.
        defect: CompositionDefect,
    },
    /// A constraint vetoed the call.
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),
    /// A fragment failed while executing.
    #[error("fragment '{fragment}' failed during {method}: {source}")]
    FragmentExecution {
        /// Fragment the failure originated in.
        fragment: String,
        /// Method being dispatched.
        method: String,
        /// Fragment frames the failure unwound through, and the call site.
        trace: FaultTrace,
        /// The original failure.
        source: Box<Fault>,
    },
    /// A fragment instance could not be obtained.
    #[error("fragment '{fragment}' unavailable for {method}: {source}")]
    NoSuchFragment {
        /// Fragment that could not be instantiated.
        fragment: String,
        /// Method whose chain needed it.
        method: String,
        /// Factory diagnostic.
        source: FactoryError,
    },
}

impl CompositionError {
    /// Builds an [`CompositionError::InvalidComposition`].
    #[must_use]
    pub const fn invalid(capability: CapabilitySetId, defect: CompositionDefect) -> Self {
        Self::InvalidComposition { capability, defect }
    }

    /// Returns the structural defect, if this is an invalid composition.
    #[must_use]
    pub const fn defect(&self) -> Option<&CompositionDefect> {
        match self {
            Self::InvalidComposition { defect, .. } => Some(defect),
            _ => None,
        }
    }

    /// Returns the violation, if a constraint vetoed the call.
    #[must_use]
    pub const fn violation(&self) -> Option<&ConstraintViolation> {
        match self {
            Self::ConstraintViolation(violation) => Some(violation),
            _ => None,
        }
    }

    /// Returns `true` when the caller may retry with different input.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}
