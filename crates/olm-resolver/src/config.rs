//! Resolver configuration.

use serde::{Deserialize, Serialize};

/// What to do with a bundle whose `olm.constraint` cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidConstraintPolicy {
    /// Keep resolving, but never select the bundle
    #[default]
    ExcludeBundle,
    /// Fail the whole resolution
    Fail,
}

/// Tunables for one resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Upper bound on search decisions per solver run
    pub max_iterations: u64,

    pub invalid_constraint_policy: InvalidConstraintPolicy,

    /// Allow selecting deprecated bundles that are not installed
    pub allow_deprecated: bool,

    /// Reduce failures to a minimal set of conflicting rules
    pub explain: bool,

    /// Upper bound on extra solver runs spent on an explanation
    pub max_explanation_checks: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            invalid_constraint_policy: InvalidConstraintPolicy::ExcludeBundle,
            allow_deprecated: false,
            explain: true,
            max_explanation_checks: 256,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn invalid_constraint_policy(mut self, policy: InvalidConstraintPolicy) -> Self {
        self.invalid_constraint_policy = policy;
        self
    }

    pub fn allow_deprecated(mut self, allow: bool) -> Self {
        self.allow_deprecated = allow;
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn max_explanation_checks(mut self, max: usize) -> Self {
        self.max_explanation_checks = max;
        self
    }
}
