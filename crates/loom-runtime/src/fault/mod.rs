//! Raw failures raised inside chains and their translation for callers.
//!
//! Fragments fail with a [`Fault`]. As a fault unwinds through the chain the
//! dispatch core stamps it with the fragment it originated in and records
//! every frame it passes, fragment or plumbing. [`translate`] turns the
//! unwound fault into a [`CompositionError`], unwrapping indirections and
//! keeping only the fragment frames plus the caller's source location.

use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::capability::MethodKey;
use crate::error::{CompositionDefect, CompositionError};
use crate::fragment::FragmentKind;
use crate::state::StateError;

#[cfg(test)]
mod tests;

/// Fragment a fault originated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultOrigin {
    fragment: String,
    kind: FragmentKind,
}

impl FaultOrigin {
    pub(crate) fn new(fragment: &str, kind: FragmentKind) -> Self {
        Self {
            fragment: fragment.to_owned(),
            kind,
        }
    }

    /// Returns the fragment name.
    #[must_use]
    pub const fn fragment(&self) -> &str {
        self.fragment.as_str()
    }

    /// Returns the fragment kind.
    #[must_use]
    pub const fn kind(&self) -> FragmentKind {
        self.kind
    }
}

/// One frame a fault unwound through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFrame {
    /// A fragment of the chain.
    Fragment(FaultOrigin),
    /// Dispatch machinery between fragments.
    Plumbing(&'static str),
}

impl TraceFrame {
    /// Returns `true` for fragment frames.
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        matches!(self, Self::Fragment(_))
    }
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fragment(origin) => write!(f, "{} ({})", origin.fragment, origin.kind),
            Self::Plumbing(name) => write!(f, "<{name}>"),
        }
    }
}

#[derive(Debug, Clone)]
enum FaultRepr {
    Raised {
        message: String,
        source: Option<Arc<dyn Error + Send + Sync>>,
    },
    Indirection(Box<Fault>),
    Composition(Box<CompositionError>),
    Unimplemented,
}

/// A failure raised by a fragment.
///
/// # Example
///
/// ```
/// use loom_runtime::Fault;
///
/// let cause = Fault::new("disk full");
/// let wrapped = Fault::wrap(cause);
/// assert_eq!(wrapped.root_cause().to_string(), "disk full");
/// ```
#[derive(Debug, Clone)]
pub struct Fault {
    repr: FaultRepr,
    origin: Option<FaultOrigin>,
    trace: Vec<TraceFrame>,
}

impl Fault {
    const fn from_repr(repr: FaultRepr) -> Self {
        Self {
            repr,
            origin: None,
            trace: Vec::new(),
        }
    }

    /// Raises an application failure with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_repr(FaultRepr::Raised {
            message: message.into(),
            source: None,
        })
    }

    /// Raises an application failure caused by `error`.
    #[must_use]
    pub fn from_error(error: impl Error + Send + Sync + 'static) -> Self {
        Self::from_repr(FaultRepr::Raised {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        })
    }

    /// Wraps a fault in an indirection layer, as invocation helpers do when
    /// rethrowing a failure they caught.
    #[must_use]
    pub fn wrap(inner: Self) -> Self {
        Self::from_repr(FaultRepr::Indirection(Box::new(inner)))
    }

    /// Signals that the fragment does not implement the dispatched method.
    #[must_use]
    pub const fn unimplemented() -> Self {
        Self::from_repr(FaultRepr::Unimplemented)
    }

    /// Returns the fragment the fault originated in, once it left one.
    #[must_use]
    pub const fn origin(&self) -> Option<&FaultOrigin> {
        self.origin.as_ref()
    }

    /// Returns every frame recorded so far, innermost first.
    #[must_use]
    pub fn trace(&self) -> &[TraceFrame] {
        &self.trace
    }

    /// Returns `true` for [`Fault::unimplemented`] faults.
    #[must_use]
    pub const fn is_unimplemented(&self) -> bool {
        matches!(self.repr, FaultRepr::Unimplemented)
    }

    /// Returns `true` when the fault carries an already translated error,
    /// such as the outcome of a nested call.
    pub(crate) const fn is_passthrough(&self) -> bool {
        matches!(self.repr, FaultRepr::Composition(_))
    }

    /// Follows indirections down to the fault that started them.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match &self.repr {
            FaultRepr::Indirection(inner) => inner.root_cause(),
            _ => self,
        }
    }

    /// Records that the fault left `fragment`; the first fragment left is
    /// the origin.
    pub(crate) fn leaving(mut self, fragment: &str, kind: FragmentKind) -> Self {
        let frame = FaultOrigin::new(fragment, kind);
        if self.origin.is_none() {
            self.origin = Some(frame.clone());
        }
        self.trace.push(TraceFrame::Fragment(frame));
        self
    }

    fn with_origin(mut self, origin: Option<FaultOrigin>) -> Self {
        self.origin = origin;
        self
    }

    /// Records that the fault passed through dispatch machinery.
    pub(crate) fn through(mut self, plumbing: &'static str) -> Self {
        self.trace.push(TraceFrame::Plumbing(plumbing));
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            FaultRepr::Raised { message, .. } => f.write_str(message),
            FaultRepr::Indirection(inner) => write!(f, "{inner}"),
            FaultRepr::Composition(error) => write!(f, "{error}"),
            FaultRepr::Unimplemented => f.write_str("method not implemented"),
        }
    }
}

impl Error for Fault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.repr {
            FaultRepr::Raised { source, .. } => source
                .as_deref()
                .map(|error| error as &(dyn Error + 'static)),
            FaultRepr::Indirection(inner) => Some(inner.as_ref()),
            FaultRepr::Composition(error) => Some(error.as_ref()),
            FaultRepr::Unimplemented => None,
        }
    }
}

impl From<CompositionError> for Fault {
    fn from(error: CompositionError) -> Self {
        Self::from_repr(FaultRepr::Composition(Box::new(error)))
    }
}

impl From<StateError> for Fault {
    fn from(error: StateError) -> Self {
        Self::from_error(error)
    }
}

/// Where the caller entered the runtime.
#[derive(Debug, Clone)]
pub struct CallSite {
    key: MethodKey,
    location: &'static Location<'static>,
}

impl CallSite {
    /// Describes a call of `key` made at `location`.
    #[must_use]
    pub const fn new(key: MethodKey, location: &'static Location<'static>) -> Self {
        Self { key, location }
    }

    /// Returns the dispatched method.
    #[must_use]
    pub const fn key(&self) -> &MethodKey {
        &self.key
    }

    /// Returns the caller's source location.
    #[must_use]
    pub const fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// Trace attached to a translated fragment failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultTrace {
    frames: Vec<FaultOrigin>,
    call_site: &'static Location<'static>,
}

impl FaultTrace {
    /// Returns the fragment frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[FaultOrigin] {
        &self.frames
    }

    /// Returns where the caller entered the runtime.
    #[must_use]
    pub const fn call_site(&self) -> &'static Location<'static> {
        self.call_site
    }
}

impl fmt::Display for FaultTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for origin in &self.frames {
            writeln!(f, "  in {} ({})", origin.fragment, origin.kind)?;
        }
        write!(f, "  called at {}", self.call_site)
    }
}

const UNATTRIBUTED: &str = "<unattributed>";

/// Normalises a fault unwound out of a chain into the caller-facing
/// taxonomy.
///
/// Indirections are unwrapped to the fault that started them. Composition
/// errors raised inside the chain pass through unchanged, an unimplemented
/// method becomes [`CompositionError::InvalidComposition`], and everything
/// else becomes [`CompositionError::FragmentExecution`].
#[must_use]
pub fn translate(fault: Fault, site: &CallSite) -> CompositionError {
    let mut layers = Vec::new();
    let mut attributed = None;
    let mut current = fault;
    let root = loop {
        let Fault { repr, origin, trace } = current;
        layers.push(trace);
        // A fault raised bare and wrapped by the fragment that caught it is
        // stamped on the wrapper only.
        attributed = origin.or(attributed);
        match repr {
            FaultRepr::Indirection(inner) => current = *inner,
            other => break Fault::from_repr(other).with_origin(attributed),
        }
    };
    let frames = layers
        .into_iter()
        .rev()
        .flatten()
        .filter_map(|frame| match frame {
            TraceFrame::Fragment(origin) => Some(origin),
            TraceFrame::Plumbing(_) => None,
        })
        .collect();
    let fragment = root
        .origin
        .as_ref()
        .map_or_else(|| UNATTRIBUTED.to_owned(), |origin| origin.fragment.clone());
    match root.repr {
        FaultRepr::Composition(error) => *error,
        FaultRepr::Unimplemented => CompositionError::invalid(
            site.key.capability().clone(),
            CompositionDefect::NotImplemented {
                method: site.key.to_string(),
                fragment,
            },
        ),
        FaultRepr::Raised { .. } | FaultRepr::Indirection(_) => {
            CompositionError::FragmentExecution {
                fragment,
                method: site.key.to_string(),
                trace: FaultTrace {
                    frames,
                    call_site: site.location,
                },
                source: Box::new(root),
            }
        }
    }
}
