#![forbid(unsafe_code)]

//! Composite resource disposal, public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use dispose::prelude::*;
//!
//! let owner_scope = CompositeDisposable::new();
//! owner_scope.add(Some(on_release(|| Ok(())))).unwrap();
//! owner_scope.release().unwrap();
//! assert!(owner_scope.is_torn_down());
//! ```

pub use dispose_core as core;

pub mod prelude {
    pub use dispose_core::composite::{CompositeDisposable, leaf_failures_total, teardowns_total};
    pub use dispose_core::config::DisposeConfig;
    pub use dispose_core::error::{CombinedReleaseError, ReleaseError};
    pub use dispose_core::release::{Member, Release, ReleaseAction, on_release};
    pub use dispose_core::sink::{FailureSink, TracingSink};
}
