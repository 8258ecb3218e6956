use std::sync::Arc;

use indexmap::IndexMap;

use crate::bundle::{Bundle, Gvk};

/// Constraints on a requested package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRequirement {
    /// Accepted versions; any version when unset
    pub version_range: Option<String>,
    /// Only bundles from this channel
    pub channel: Option<String>,
}

/// A request specifies what needs to be resolved.
///
/// This includes requested packages and APIs and the currently installed
/// bundles, which the selection has to keep and may only upgrade along
/// their upgrade edges.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Requested packages (name -> requirement)
    /// Uses IndexMap to preserve insertion order (critical for solver behavior)
    pub requires: IndexMap<String, PackageRequirement>,

    /// Requested APIs, each to be provided by exactly one selected bundle
    pub required_apis: Vec<Gvk>,

    /// Installed bundles, one per package
    pub installed: Vec<Arc<Bundle>>,
}

impl Request {
    /// Create a new empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Require any version of a package
    pub fn require(&mut self, name: impl Into<String>) -> &mut Self {
        self.requires.insert(name.into(), PackageRequirement::default());
        self
    }

    /// Require a package within a version range
    pub fn require_version(&mut self, name: impl Into<String>, range: impl Into<String>) -> &mut Self {
        self.requires.insert(
            name.into(),
            PackageRequirement {
                version_range: Some(range.into()),
                channel: None,
            },
        );
        self
    }

    /// Require a package with a full requirement
    pub fn require_with(&mut self, name: impl Into<String>, requirement: PackageRequirement) -> &mut Self {
        self.requires.insert(name.into(), requirement);
        self
    }

    /// Require an API
    pub fn require_api(&mut self, gvk: Gvk) -> &mut Self {
        if !self.required_apis.contains(&gvk) {
            self.required_apis.push(gvk);
        }
        self
    }

    /// Record an installed bundle
    pub fn add_installed(&mut self, bundle: Arc<Bundle>) -> &mut Self {
        self.installed.push(bundle);
        self
    }

    /// Check if there is nothing to resolve
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.required_apis.is_empty() && self.installed.is_empty()
    }
}
