use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use olm_semver::VersionRange;

use crate::bundle::{Bundle, Gvk};
use crate::snapshot::Snapshot;

/// A solver variable. Positive literals mean "select bundle", negative means "don't select".
///
/// Variables `1..=pool.len()` are bundles; higher ones are auxiliary
/// variables introduced by constraint compilation.
pub type VarId = i32;

/// The candidate bundles of one resolution.
///
/// Holds every catalog bundle plus installed bundles missing from the
/// catalog, and indexes them by package, provided API and label.
#[derive(Debug, Default)]
pub struct Pool {
    /// All bundles indexed by ID - 1
    bundles: Vec<Arc<Bundle>>,

    /// Bundle IDs by package, in pool order
    by_package: IndexMap<String, Vec<VarId>>,

    /// Bundle IDs by provided API
    providers: HashMap<Gvk, Vec<VarId>>,

    /// Bundle IDs by offered label
    label_providers: HashMap<String, Vec<VarId>>,

    /// Installed bundle ID by package
    installed: BTreeMap<String, VarId>,

    default_channels: BTreeMap<String, String>,
}

impl Pool {
    /// Build the pool for a snapshot and the currently installed bundles.
    ///
    /// An installed bundle is matched to catalog bundles by package and CSV
    /// name, preferring the copy in its own channel. Unmatched installed
    /// bundles become candidates of their own.
    pub fn new(snapshot: &Snapshot, installed: &[Arc<Bundle>]) -> Self {
        let mut pool = Pool {
            default_channels: snapshot.default_channels().clone(),
            ..Default::default()
        };

        for bundle in snapshot.bundles() {
            pool.add(bundle.clone());
        }

        for bundle in installed {
            if pool.installed.contains_key(bundle.package()) {
                warn!(
                    "Ignoring installed bundle {}: package {} already has an installed bundle",
                    bundle.name(),
                    bundle.package()
                );
                continue;
            }

            let matches: Vec<VarId> = pool
                .package_vars(bundle.package())
                .iter()
                .copied()
                .filter(|&id| pool.bundle(id).map_or(false, |b| b.name() == bundle.name()))
                .collect();

            let id = matches
                .iter()
                .copied()
                .find(|&id| pool.bundle(id).map_or(false, |b| b.channel() == bundle.channel()))
                .or_else(|| matches.first().copied());

            let id = match id {
                Some(id) => id,
                None => {
                    debug!("Installed bundle {} is not in the catalog, adding it", bundle.name());
                    pool.add(bundle.clone())
                }
            };
            pool.installed.insert(bundle.package().to_string(), id);
        }

        pool
    }

    fn add(&mut self, bundle: Arc<Bundle>) -> VarId {
        self.bundles.push(bundle.clone());
        let id = self.bundles.len() as VarId;

        self.by_package
            .entry(bundle.package().to_string())
            .or_default()
            .push(id);
        for gvk in bundle.provided_gvks() {
            self.providers.entry(gvk.clone()).or_default().push(id);
        }
        for label in bundle.labels() {
            self.label_providers.entry(label.clone()).or_default().push(id);
        }
        id
    }

    /// Get a bundle by ID
    pub fn bundle(&self, id: VarId) -> Option<&Arc<Bundle>> {
        if id < 1 {
            return None;
        }
        self.bundles.get((id - 1) as usize)
    }

    /// Number of bundle variables
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// All bundle IDs
    pub fn ids(&self) -> RangeInclusive<VarId> {
        1..=self.bundles.len() as VarId
    }

    /// Check if a literal refers to a bundle (not an auxiliary variable)
    pub fn is_bundle(&self, literal: VarId) -> bool {
        let var = literal.unsigned_abs() as usize;
        var >= 1 && var <= self.bundles.len()
    }

    /// Package names in pool order
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.by_package.keys().map(String::as_str)
    }

    /// All bundle IDs of a package
    pub fn package_vars(&self, package: &str) -> &[VarId] {
        self.by_package.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bundles of `package` whose version is in `range`, optionally limited to a channel
    pub fn what_provides(&self, package: &str, range: &VersionRange, channel: Option<&str>) -> Vec<VarId> {
        self.package_vars(package)
            .iter()
            .copied()
            .filter(|&id| {
                self.bundle(id).map_or(false, |b| {
                    range.contains(b.version()) && channel.map_or(true, |c| b.channel() == c)
                })
            })
            .collect()
    }

    /// Bundles providing an API
    pub fn providers(&self, gvk: &Gvk) -> &[VarId] {
        self.providers.get(gvk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bundles offering a label
    pub fn label_providers(&self, label: &str) -> &[VarId] {
        self.label_providers.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct versions available for a package, ascending
    pub fn versions_of(&self, package: &str) -> Vec<String> {
        let versions: BTreeSet<_> = self
            .package_vars(package)
            .iter()
            .filter_map(|&id| self.bundle(id))
            .map(|b| b.version().clone())
            .collect();
        versions.into_iter().map(|v| v.to_string()).collect()
    }

    /// ID of the installed bundle of a package
    pub fn installed_var(&self, package: &str) -> Option<VarId> {
        self.installed.get(package).copied()
    }

    /// The installed bundle of a package
    pub fn installed_bundle(&self, package: &str) -> Option<&Arc<Bundle>> {
        self.installed_var(package).and_then(|id| self.bundle(id))
    }

    /// Installed packages with their bundle IDs
    pub fn installed(&self) -> impl Iterator<Item = (&str, VarId)> {
        self.installed.iter().map(|(p, &id)| (p.as_str(), id))
    }

    pub fn is_installed_package(&self, package: &str) -> bool {
        self.installed.contains_key(package)
    }

    pub fn default_channel(&self, package: &str) -> Option<&str> {
        self.default_channels.get(package).map(String::as_str)
    }
}
