#![forbid(unsafe_code)]

//! Core: the release capability, composite disposal, failure reporting.

pub mod composite;
pub mod config;
pub mod error;
pub mod release;
pub mod sink;

pub use composite::CompositeDisposable;
pub use config::DisposeConfig;
pub use error::{CombinedReleaseError, ReleaseError};
pub use release::{Member, Release, ReleaseAction, on_release};
pub use sink::{FailureSink, TracingSink};
