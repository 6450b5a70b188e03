#![forbid(unsafe_code)]

//! Composite disposal: release a group of owned members together.
//!
//! A [`CompositeDisposable`] collects members during its owner's lifetime and
//! releases all of them when the owner is torn down. It is itself a
//! [`Release`], so composites nest into trees of arbitrary depth.
//!
//! # Invariants
//!
//! 1. `release()` is idempotent. Only the first call touches members.
//! 2. Every member ever added is released exactly once, whether it was added
//!    before teardown, after teardown, or the composite was simply dropped.
//! 3. A failing member never stops the remaining members from being released.
//! 4. Members added after teardown are released before `add` returns.
//! 5. Absent (`None`) entries are ignored.
//!
//! # Failure reporting
//!
//! All failures caught during one teardown come back as a single
//! [`ReleaseError::Combined`], even when only one member failed. Leaf
//! failures are handed to the [`FailureSink`] exactly once, by the composite
//! that caught them. A combined failure coming up from a nested composite is
//! kept in the parent's list but never reported again, so a tree of any depth
//! logs one entry per leaf failure.
//!
//! # Concurrency
//!
//! All operations take `&self`. The flip to torn-down and the handoff of the
//! member list happen under one lock, so an `add` racing the first `release`
//! is either captured by the teardown or released immediately by `add`
//! itself. Members are never released while the lock is held, which lets a
//! member re-enter its composite during teardown.
//!
//! # Example
//!
//! ```
//! use dispose_core::composite::CompositeDisposable;
//! use dispose_core::error::ReleaseError;
//! use dispose_core::release::on_release;
//!
//! let composite = CompositeDisposable::new();
//! composite.add(Some(on_release(|| Ok(())))).unwrap();
//! composite.add(None).unwrap();
//! composite.add(Some(on_release(|| Err(ReleaseError::failed("flush"))))).unwrap();
//!
//! let err = composite.release().unwrap_err();
//! assert!(err.is_combined());
//! assert_eq!(err.leaf_count(), 1);
//!
//! // Later calls are no-ops.
//! assert!(composite.release().is_ok());
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::config::{DisposeConfig, MAX_INITIAL_CAPACITY};
use crate::error::{CombinedReleaseError, ReleaseError};
use crate::release::{Member, Release};
use crate::sink::{FailureSink, default_sink};

// ─── Composite ID generation ─────────────────────────────────────────────────

static NEXT_COMPOSITE_ID: AtomicU64 = AtomicU64::new(1);

fn next_composite_id() -> u64 {
    NEXT_COMPOSITE_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Metrics counters ────────────────────────────────────────────────────────

static TEARDOWNS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LEAF_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total number of composite teardowns started in this process.
#[must_use]
pub fn teardowns_total() -> u64 {
    TEARDOWNS_TOTAL.load(Ordering::Relaxed)
}

/// Total number of leaf failures reported to a sink in this process.
#[must_use]
pub fn leaf_failures_total() -> u64 {
    LEAF_FAILURES_TOTAL.load(Ordering::Relaxed)
}

// ─── Inner state ─────────────────────────────────────────────────────────────

struct State {
    members: Vec<Member>,
    torn_down: bool,
}

// ─── CompositeDisposable ─────────────────────────────────────────────────────

/// Owns a group of members and releases them together.
pub struct CompositeDisposable {
    id: u64,
    state: Mutex<State>,
    config: DisposeConfig,
    sink: Arc<dyn FailureSink>,
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CompositeDisposable")
            .field("id", &self.id)
            .field("members", &state.members.len())
            .field("torn_down", &state.torn_down)
            .field("config", &self.config)
            .finish()
    }
}

impl CompositeDisposable {
    // ── Constructors ─────────────────────────────────────────────────

    /// Create an empty, active composite with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DisposeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DisposeConfig) -> Self {
        Self {
            id: next_composite_id(),
            state: Mutex::new(State {
                members: Vec::with_capacity(config.initial_capacity.min(MAX_INITIAL_CAPACITY)),
                torn_down: false,
            }),
            config,
            sink: default_sink(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(DisposeConfig::default().with_initial_capacity(capacity))
    }

    /// Replace the sink that receives leaf failures.
    #[must_use]
    pub fn with_sink(mut self, sink: impl FailureSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Hand a shared composite to another composite as a member.
    ///
    /// The owner keeps its `Arc` and may continue to add members; whichever
    /// side calls `release` first performs the teardown.
    #[must_use]
    pub fn into_member(self: Arc<Self>) -> Member {
        Box::new(SharedComposite(self))
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Process-unique identifier, used as the `composite_id` log field.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &DisposeConfig {
        &self.config
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.lock().torn_down
    }

    /// Number of members waiting for teardown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Add one member.
    ///
    /// `None` is ignored. Before teardown the member is stored. After
    /// teardown it is released right away and its own failure, if any, is
    /// returned unwrapped and unreported; the caller owns that error.
    pub fn add(&self, item: Option<Member>) -> Result<(), ReleaseError> {
        let Some(mut item) = item else {
            return Ok(());
        };
        {
            let mut state = self.lock();
            if !state.torn_down {
                state.members.push(item);
                return Ok(());
            }
        }
        trace!(composite_id = self.id, "add after teardown, releasing now");
        self.invoke(item.as_mut())
    }

    /// Add a concrete member.
    pub fn push(&self, item: impl Release + 'static) -> Result<(), ReleaseError> {
        self.add(Some(Box::new(item)))
    }

    /// Add several members, skipping `None` entries.
    ///
    /// Before teardown the members are appended in order. After teardown they
    /// are released as one batch with the same aggregation and reporting as
    /// [`release`](Self::release).
    pub fn add_many<I>(&self, items: I) -> Result<(), ReleaseError>
    where
        I: IntoIterator<Item = Option<Member>>,
    {
        // Collected before locking: the iterator may run caller code.
        let mut items: Vec<Member> = items.into_iter().flatten().collect();
        if items.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.lock();
            if !state.torn_down {
                state.members.append(&mut items);
                return Ok(());
            }
        }
        debug!(
            composite_id = self.id,
            members = items.len(),
            "batch added after teardown, releasing now"
        );
        self.release_all(items)
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Tear down: release every member once, then report failures together.
    ///
    /// Only the first call does anything. Every member is attempted before
    /// an error is returned.
    pub fn release(&self) -> Result<(), ReleaseError> {
        let members = {
            let mut state = self.lock();
            if state.torn_down {
                return Ok(());
            }
            state.torn_down = true;
            std::mem::take(&mut state.members)
        };
        TEARDOWNS_TOTAL.fetch_add(1, Ordering::Relaxed);
        debug!(
            composite_id = self.id,
            members = members.len(),
            "composite teardown"
        );
        self.release_all(members)
    }

    fn release_all(&self, members: Vec<Member>) -> Result<(), ReleaseError> {
        let mut failures = Vec::new();
        for mut member in members {
            if let Err(failure) = self.invoke(member.as_mut()) {
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            trace!(composite_id = self.id, "release complete");
            return Ok(());
        }

        // Every member has been attempted before the sink sees anything.
        for failure in failures.iter().filter(|f| f.is_leaf()) {
            LEAF_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
            self.report(failure);
        }

        let combined = CombinedReleaseError::new(failures);
        debug!(
            composite_id = self.id,
            failures = combined.len(),
            leaves = combined.leaf_count(),
            "release finished with failures"
        );
        Err(ReleaseError::Combined(combined))
    }

    fn invoke(&self, member: &mut dyn Release) -> Result<(), ReleaseError> {
        if !self.config.catch_panics {
            return member.release();
        }
        panic::catch_unwind(AssertUnwindSafe(|| member.release()))
            .unwrap_or_else(|payload| Err(ReleaseError::from_panic(payload)))
    }

    fn report(&self, failure: &ReleaseError) {
        if !self.config.catch_panics {
            self.sink.record(self.id, failure);
            return;
        }
        let recorded =
            panic::catch_unwind(AssertUnwindSafe(|| self.sink.record(self.id, failure)));
        if let Err(payload) = recorded {
            warn!(
                composite_id = self.id,
                panic = %ReleaseError::from_panic(payload),
                "failure sink panicked"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Release for CompositeDisposable {
    fn release(&mut self) -> Result<(), ReleaseError> {
        CompositeDisposable::release(self)
    }
}

impl Drop for CompositeDisposable {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.torn_down {
            return;
        }
        if !self.config.release_on_drop {
            state.torn_down = true;
            if !state.members.is_empty() {
                warn!(
                    composite_id = self.id,
                    members = state.members.len(),
                    "composite dropped without release; members dropped unreleased"
                );
            }
            return;
        }
        if let Err(err) = CompositeDisposable::release(self) {
            debug!(
                composite_id = self.id,
                leaves = err.leaf_count(),
                "teardown on drop finished with failures"
            );
        }
    }
}

// ─── SharedComposite ─────────────────────────────────────────────────────────

struct SharedComposite(Arc<CompositeDisposable>);

impl Release for SharedComposite {
    fn release(&mut self) -> Result<(), ReleaseError> {
        self.0.release()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
