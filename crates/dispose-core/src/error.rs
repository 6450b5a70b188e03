#![forbid(unsafe_code)]

//! Failure taxonomy for releasing members.
//!
//! Two kinds of failure flow out of a teardown:
//!
//! - **Leaf failures** ([`ReleaseError::Failed`], [`ReleaseError::Panicked`])
//!   come straight from a member that is not itself a composite.
//! - **Combined failures** ([`ReleaseError::Combined`]) are produced by a
//!   [`CompositeDisposable`](crate::composite::CompositeDisposable) after it
//!   has attempted every member. A combined failure holds exactly the failures
//!   its composite caught directly; combined failures from nested composites
//!   are kept as-is rather than flattened.
//!
//! The variant tag is what distinguishes the two. Nothing inspects foreign
//! error types to decide whether a failure was already reported.

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Boxed foreign error carried as the cause of a leaf failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A member reported a failure from its `release()`.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A member panicked while releasing and the panic was captured.
    #[error("release panicked: {message}")]
    Panicked { message: String },

    /// Every failure one composite caught during a single teardown.
    #[error(transparent)]
    Combined(#[from] CombinedReleaseError),
}

impl ReleaseError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a leaf failure from a captured panic payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self::Panicked { message }
    }

    /// True for failures produced by a composite.
    #[inline]
    #[must_use]
    pub fn is_combined(&self) -> bool {
        matches!(self, Self::Combined(_))
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !self.is_combined()
    }

    /// Short tag used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "failed",
            Self::Panicked { .. } => "panicked",
            Self::Combined(_) => "combined",
        }
    }

    /// Number of leaf failures this value describes, descending into nested
    /// combined failures.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Combined(combined) => combined.leaf_count(),
            _ => 1,
        }
    }

    #[must_use]
    pub fn as_combined(&self) -> Option<&CombinedReleaseError> {
        match self {
            Self::Combined(combined) => Some(combined),
            _ => None,
        }
    }
}

// ─── CombinedReleaseError ────────────────────────────────────────────────────

/// Ordered failures caught by one teardown (or one post-teardown batch add).
///
/// Never empty when handed to a caller.
#[derive(Debug)]
pub struct CombinedReleaseError {
    failures: Vec<ReleaseError>,
}

impl CombinedReleaseError {
    pub(crate) fn new(failures: Vec<ReleaseError>) -> Self {
        debug_assert!(!failures.is_empty());
        Self { failures }
    }

    /// Failures caught directly, in member order.
    #[must_use]
    pub fn failures(&self) -> &[ReleaseError] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<ReleaseError> {
        self.failures
    }

    /// Number of failures caught directly (nested combined failures count
    /// as one entry here).
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.failures.iter().map(ReleaseError::leaf_count).sum()
    }

    /// Depth-first walk over every leaf failure in the subtree.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.failures.iter()],
        }
    }
}

impl fmt::Display for CombinedReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaves = self.leaf_count();
        let noun = if leaves == 1 { "failure" } else { "failures" };
        write!(f, "{leaves} release {noun}")?;
        if let Some(first) = self.leaves().next() {
            write!(f, "; first: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CombinedReleaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Iterator returned by [`CombinedReleaseError::leaves`].
#[derive(Debug)]
pub struct Leaves<'a> {
    stack: Vec<std::slice::Iter<'a, ReleaseError>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a ReleaseError;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(ReleaseError::Combined(nested)) => {
                    self.stack.push(nested.failures.iter());
                }
                Some(leaf) => return Some(leaf),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
