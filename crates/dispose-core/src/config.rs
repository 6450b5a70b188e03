#![forbid(unsafe_code)]

//! Composite configuration.
//!
//! Defaults suit most owners. Environment variables override the defaults
//! when a config is built with [`DisposeConfig::from_env`]:
//!
//! | Variable                   | Field              |
//! |----------------------------|--------------------|
//! | `DISPOSE_CATCH_PANICS`     | `catch_panics`     |
//! | `DISPOSE_INITIAL_CAPACITY` | `initial_capacity` |
//! | `DISPOSE_RELEASE_ON_DROP`  | `release_on_drop`  |
//!
//! Booleans accept `1`/`true` and `0`/`false` (case-insensitive). Values that
//! do not parse, and capacities above [`MAX_INITIAL_CAPACITY`], leave the
//! default in place.

use std::env;

pub const ENV_CATCH_PANICS: &str = "DISPOSE_CATCH_PANICS";
pub const ENV_INITIAL_CAPACITY: &str = "DISPOSE_INITIAL_CAPACITY";
pub const ENV_RELEASE_ON_DROP: &str = "DISPOSE_RELEASE_ON_DROP";

/// Upper bound on storage reserved up front. Larger requests are clamped.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 16;

/// Behavior switches for a [`CompositeDisposable`](crate::composite::CompositeDisposable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposeConfig {
    /// Capture a panicking member as a `Panicked` leaf failure instead of
    /// unwinding out of the teardown.
    pub catch_panics: bool,
    /// Member storage reserved up front, clamped to [`MAX_INITIAL_CAPACITY`].
    pub initial_capacity: usize,
    /// Tear down a composite that is dropped without an explicit release.
    pub release_on_drop: bool,
}

impl Default for DisposeConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            initial_capacity: 0,
            release_on_drop: true,
        }
    }
}

impl DisposeConfig {
    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup(ENV_CATCH_PANICS)
            && let Some(b) = parse_bool(&val)
        {
            config.catch_panics = b;
        }
        if let Some(val) = lookup(ENV_INITIAL_CAPACITY)
            && let Ok(n) = val.trim().parse::<usize>()
            && n <= MAX_INITIAL_CAPACITY
        {
            config.initial_capacity = n;
        }
        if let Some(val) = lookup(ENV_RELEASE_ON_DROP)
            && let Some(b) = parse_bool(&val)
        {
            config.release_on_drop = b;
        }

        config
    }

    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    #[must_use]
    pub fn with_release_on_drop(mut self, release_on_drop: bool) -> Self {
        self.release_on_drop = release_on_drop;
        self
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    let val = val.trim();
    if val == "1" || val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
