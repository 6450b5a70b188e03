#![forbid(unsafe_code)]

//! Probe resources.
//!
//! A [`Probe`] is a [`Release`] member that counts its own releases and
//! behaves according to its [`Behavior`]. The matching [`ProbeHandle`] stays
//! with the test after the probe has been moved into a composite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dispose_core::error::ReleaseError;
use dispose_core::release::{Member, Release};
use tracing::trace;

/// What a probe does when released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

impl Behavior {
    /// Whether releasing a probe with this behavior yields a leaf failure.
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Succeed)
    }
}

/// Release order shared between probes.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLog {
    names: Arc<Mutex<Vec<String>>>,
}

impl ReleaseLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names in the order their probes were released.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, name: &str) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_owned());
    }
}

/// Counting member with a fixed release behavior.
#[derive(Debug)]
pub struct Probe {
    name: String,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    log: Option<ReleaseLog>,
}

/// Observer for a [`Probe`] that has been handed to a composite.
#[derive(Debug, Clone)]
pub struct ProbeHandle {
    name: String,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl Probe {
    #[must_use]
    pub fn new(name: impl Into<String>, behavior: Behavior) -> (Self, ProbeHandle) {
        let name = name.into();
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ProbeHandle {
            name: name.clone(),
            behavior,
            calls: Arc::clone(&calls),
        };
        let probe = Self {
            name,
            behavior,
            calls,
            log: None,
        };
        (probe, handle)
    }

    #[must_use]
    pub fn ok(name: impl Into<String>) -> (Self, ProbeHandle) {
        Self::new(name, Behavior::Succeed)
    }

    #[must_use]
    pub fn failing(name: impl Into<String>) -> (Self, ProbeHandle) {
        Self::new(name, Behavior::Fail)
    }

    #[must_use]
    pub fn panicking(name: impl Into<String>) -> (Self, ProbeHandle) {
        Self::new(name, Behavior::Panic)
    }

    /// Append this probe's name to `log` whenever it is released.
    #[must_use]
    pub fn logged(mut self, log: &ReleaseLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    #[must_use]
    pub fn boxed(self) -> Member {
        Box::new(self)
    }

    /// The failure message this probe reports.
    #[must_use]
    pub fn failure_message(name: &str) -> String {
        format!("release:{name}")
    }
}

impl Release for Probe {
    fn release(&mut self) -> Result<(), ReleaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.push(&self.name);
        }
        trace!(probe = %self.name, behavior = ?self.behavior, "probe released");
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ReleaseError::failed(Self::failure_message(&self.name))),
            Behavior::Panic => panic!("{}", Self::failure_message(&self.name)),
        }
    }
}

impl ProbeHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// How many times the probe's `release()` ran.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_counts_releases() {
        let (mut probe, handle) = Probe::ok("a");
        assert_eq!(handle.release_count(), 0);
        probe.release().unwrap();
        probe.release().unwrap();
        assert_eq!(handle.release_count(), 2);
    }

    #[test]
    fn failing_probe_reports_named_failure() {
        let (mut probe, handle) = Probe::failing("db");
        let err = probe.release().unwrap_err();
        assert_eq!(err.to_string(), "release:db");
        assert_eq!(handle.release_count(), 1);
        assert!(handle.behavior().is_failure());
    }

    #[test]
    fn logged_probes_record_order() {
        let log = ReleaseLog::new();
        let (mut a, _) = Probe::ok("a");
        let (mut b, _) = Probe::ok("b");
        a = a.logged(&log);
        b = b.logged(&log);
        b.release().unwrap();
        a.release().unwrap();
        assert_eq!(log.names(), ["b", "a"]);
    }
}
