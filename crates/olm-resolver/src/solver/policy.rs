use std::cmp::Ordering;

use super::pool::{Pool, VarId};
use crate::bundle::{Bundle, UpgradeEdge};
use crate::error::{ResolverError, Result};

/// Policy for selecting between candidate bundles.
///
/// When several bundles can satisfy a clause, the policy decides which one
/// the solver tries first. The order is total over distinct catalog entries:
/// 1. Bundles of an already installed package first
/// 2. Package name
/// 3. Highest version
/// 4. Upgrade edge from the installed bundle (replaces, skips, skipRange, stay)
/// 5. The package's default channel, then channel name
/// 6. Bundle name
#[derive(Debug, Clone, Copy, Default)]
pub struct Policy;

impl Policy {
    pub fn new() -> Self {
        Policy
    }

    /// Compare two candidates; `Less` means `a` is preferred
    pub fn compare(&self, pool: &Pool, a: &Bundle, b: &Bundle) -> Ordering {
        let a_installed = pool.is_installed_package(a.package());
        let b_installed = pool.is_installed_package(b.package());

        b_installed
            .cmp(&a_installed)
            .then_with(|| a.package().cmp(b.package()))
            .then_with(|| b.version().cmp(a.version()))
            .then_with(|| Self::edge(pool, b).cmp(&Self::edge(pool, a)))
            .then_with(|| Self::channel_rank(pool, a).cmp(&Self::channel_rank(pool, b)))
            .then_with(|| a.name().cmp(b.name()))
    }

    fn edge(pool: &Pool, bundle: &Bundle) -> Option<UpgradeEdge> {
        pool.installed_bundle(bundle.package())
            .and_then(|installed| bundle.upgrade_edge_from(installed))
    }

    /// Default channel sorts before every other channel
    fn channel_rank<'b>(pool: &Pool, bundle: &'b Bundle) -> (bool, &'b str) {
        let is_default = pool.default_channel(bundle.package()) == Some(bundle.channel());
        (!is_default, bundle.channel())
    }

    /// Sort candidates best first
    pub fn sort(&self, pool: &Pool, candidates: &mut [VarId]) {
        candidates.sort_by(|&a, &b| match (pool.bundle(a), pool.bundle(b)) {
            (Some(x), Some(y)) => self.compare(pool, x, y),
            _ => a.cmp(&b),
        });
    }

    /// Pick the most preferred candidate.
    ///
    /// Fails with [`ResolverError::AmbiguousSelection`] when the two best
    /// candidates cannot be told apart, which only happens for duplicate
    /// catalog entries.
    pub fn select(&self, pool: &Pool, candidates: &[VarId]) -> Result<Option<VarId>> {
        let mut sorted = candidates.to_vec();
        self.sort(pool, &mut sorted);

        if let [first, second, ..] = sorted[..] {
            if let (Some(a), Some(b)) = (pool.bundle(first), pool.bundle(second)) {
                if self.compare(pool, a, b) == Ordering::Equal {
                    return Err(ResolverError::AmbiguousSelection {
                        package: a.package().to_string(),
                        first: a.pretty_string(),
                        second: b.pretty_string(),
                    });
                }
            }
        }

        Ok(sorted.first().copied())
    }
}
