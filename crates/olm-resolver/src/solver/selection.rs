use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::bundle::Bundle;

/// The bundles chosen by a resolution, one per package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    bundles: BTreeMap<String, Arc<Bundle>>,
}

/// A single step of the install plan derived from a selection
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Install a bundle of a package that is not installed yet
    Install(Arc<Bundle>),
    /// Move an installed package to another bundle
    Upgrade { from: Arc<Bundle>, to: Arc<Bundle> },
    /// Keep the installed bundle
    Unchanged(Arc<Bundle>),
}

impl Operation {
    /// The bundle the package ends up with
    pub fn target(&self) -> &Arc<Bundle> {
        match self {
            Operation::Install(bundle) | Operation::Unchanged(bundle) => bundle,
            Operation::Upgrade { to, .. } => to,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install(bundle) => write!(f, "install {}", bundle.pretty_string()),
            Operation::Upgrade { from, to } => {
                write!(f, "upgrade {} from {} to {}", to.package(), from.name(), to.name())
            }
            Operation::Unchanged(bundle) => write!(f, "keep {}", bundle.pretty_string()),
        }
    }
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the bundle chosen for its package
    pub fn insert(&mut self, bundle: Arc<Bundle>) -> Option<Arc<Bundle>> {
        self.bundles.insert(bundle.package().to_string(), bundle)
    }

    /// The bundle chosen for a package
    pub fn get(&self, package: &str) -> Option<&Arc<Bundle>> {
        self.bundles.get(package)
    }

    /// Check if a bundle with this name was selected
    pub fn contains(&self, bundle_name: &str) -> bool {
        self.bundles.values().any(|b| b.name() == bundle_name)
    }

    /// Selected bundles ordered by package name
    pub fn bundles(&self) -> impl Iterator<Item = &Arc<Bundle>> {
        self.bundles.values()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Names of the selected bundles, ordered by package name
    pub fn names(&self) -> Vec<&str> {
        self.bundles.values().map(|b| b.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Compare the selection with what is installed.
    ///
    /// Installed packages missing from the selection produce no operation;
    /// removals are left to the caller.
    pub fn operations(&self, installed: &[Arc<Bundle>]) -> Vec<Operation> {
        let present: BTreeMap<&str, &Arc<Bundle>> = installed.iter().map(|b| (b.package(), b)).collect();

        self.bundles
            .values()
            .map(|bundle| match present.get(bundle.package()) {
                None => Operation::Install(bundle.clone()),
                Some(&current) if current.name() == bundle.name() => Operation::Unchanged(bundle.clone()),
                Some(&current) => Operation::Upgrade {
                    from: current.clone(),
                    to: bundle.clone(),
                },
            })
            .collect()
    }
}
