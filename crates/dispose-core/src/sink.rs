#![forbid(unsafe_code)]

//! Where leaf failures get reported.
//!
//! A composite hands every leaf failure it catches to its [`FailureSink`]
//! exactly once. Combined failures from nested composites never reach a sink;
//! their leaves were reported by the composite that caught them.

use std::sync::Arc;

use tracing::error;

use crate::error::ReleaseError;

/// Observability collaborator for leaf release failures.
pub trait FailureSink: Send + Sync {
    /// Record one leaf failure caught by composite `composite_id`.
    fn record(&self, composite_id: u64, failure: &ReleaseError);
}

/// Default sink: one `ERROR` event per leaf failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, composite_id: u64, failure: &ReleaseError) {
        error!(
            composite_id,
            kind = failure.kind(),
            error = %failure,
            "member release failed"
        );
    }
}

impl<S: FailureSink + ?Sized> FailureSink for Arc<S> {
    fn record(&self, composite_id: u64, failure: &ReleaseError) {
        (**self).record(composite_id, failure);
    }
}

pub(crate) fn default_sink() -> Arc<dyn FailureSink> {
    Arc::new(TracingSink)
}
