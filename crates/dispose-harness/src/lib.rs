#![forbid(unsafe_code)]

//! Test harness for composite disposal.
//!
//! - [`probe`]: counting resources that succeed, fail, or panic on release.
//! - [`recording`]: a [`FailureSink`](dispose_core::FailureSink) that keeps
//!   every reported failure for assertions.
//! - [`tree`]: declarative composite trees with known leaf-failure counts.

pub mod probe;
pub mod recording;
pub mod tree;
