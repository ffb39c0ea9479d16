//! Content-load configuration
//!
//! Where rule files come from and how strictly load failures are treated.
//! The engine itself never reads this; it is consumed by the content loader
//! and the diagnostic binaries.

use std::path::PathBuf;

/// How the loader reacts when a single template, reskin or map delta fails.
///
/// The engine reports every failure as a hard error; whether one bad
/// definition aborts the whole batch is a caller decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Abort the batch on the first error.
    #[default]
    Strict,
    /// Log the error, skip the offending definition, keep loading.
    Lenient,
}

/// Ordered content sources for one loaded content set.
///
/// Base rule directories are loaded in order (base rules first, expansion
/// overrides after), then the registry is frozen, then map deltas are
/// applied on top of resolved templates without touching the registry.
#[derive(Debug, Clone, Default)]
pub struct ContentConfig {
    /// Rule directories, lowest priority first.
    pub rule_dirs: Vec<PathBuf>,
    /// Optional directory of per-map delta files.
    pub map_delta_dir: Option<PathBuf>,
    /// Failure policy for the whole load.
    pub policy: LoadPolicy,
}

impl ContentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule directory (later directories layer on earlier ones).
    pub fn with_rule_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rule_dirs.push(dir.into());
        self
    }

    pub fn with_map_delta_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.map_delta_dir = Some(dir.into());
        self
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }
}
