#![forbid(unsafe_code)]

//! The release capability.
//!
//! [`Release`] is the single-method contract every member of a
//! [`CompositeDisposable`](crate::composite::CompositeDisposable) exposes.
//! Whether a member tolerates being released twice is up to the member; a
//! composite guarantees it calls `release()` on each of its members exactly
//! once.

use crate::error::ReleaseError;

/// A resource that can be released.
///
/// Implementations run their cleanup synchronously and report failure through
/// the returned `Result`. `Send` is required so composites holding members
/// can be shared across threads.
pub trait Release: Send {
    fn release(&mut self) -> Result<(), ReleaseError>;
}

/// An exclusively-owned, type-erased member.
pub type Member = Box<dyn Release>;

// ─── ReleaseAction ───────────────────────────────────────────────────────────

/// Adapts a closure into a [`Release`] member.
///
/// The closure runs on the first `release()` only; later calls return `Ok(())`.
pub struct ReleaseAction<F> {
    action: Option<F>,
}

impl<F> ReleaseAction<F>
where
    F: FnOnce() -> Result<(), ReleaseError> + Send,
{
    #[must_use]
    pub fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }

    /// Whether the closure has already run.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.action.is_none()
    }
}

impl<F> Release for ReleaseAction<F>
where
    F: FnOnce() -> Result<(), ReleaseError> + Send,
{
    fn release(&mut self) -> Result<(), ReleaseError> {
        match self.action.take() {
            Some(action) => action(),
            None => Ok(()),
        }
    }
}

impl<F> std::fmt::Debug for ReleaseAction<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseAction")
            .field("spent", &self.action.is_none())
            .finish()
    }
}

/// Box a closure as a [`Member`].
///
/// ```
/// use dispose_core::composite::CompositeDisposable;
/// use dispose_core::release::on_release;
///
/// let composite = CompositeDisposable::new();
/// composite.add(Some(on_release(|| Ok(())))).unwrap();
/// assert_eq!(composite.len(), 1);
/// ```
#[must_use]
pub fn on_release<F>(action: F) -> Member
where
    F: FnOnce() -> Result<(), ReleaseError> + Send + 'static,
{
    Box::new(ReleaseAction::new(action))
}
