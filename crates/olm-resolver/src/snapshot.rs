//! Immutable, indexed view of a catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::bundle::{Bundle, BundleRecord};
use crate::error::BundleError;

/// A catalog record that could not be turned into a bundle
#[derive(Debug)]
pub struct RejectedBundle {
    pub name: String,
    pub error: BundleError,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Records(Vec<Value>),
    Catalog {
        bundles: Vec<Value>,
        #[serde(default, rename = "defaultChannels")]
        default_channels: BTreeMap<String, String>,
    },
}

/// The bundles known to one resolution, grouped by package.
///
/// Snapshots are never mutated once built and can be shared between
/// concurrent resolutions.
#[derive(Debug, Default)]
pub struct Snapshot {
    bundles: Vec<Arc<Bundle>>,
    by_package: IndexMap<String, Vec<usize>>,
    default_channels: BTreeMap<String, String>,
    rejected: Vec<RejectedBundle>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from bundles, in catalog order
    pub fn from_bundles(bundles: impl IntoIterator<Item = Bundle>) -> Self {
        let mut snapshot = Snapshot::new();
        for bundle in bundles {
            snapshot.push(Arc::new(bundle));
        }
        snapshot
    }

    /// Build a snapshot from catalog records.
    ///
    /// Invalid records are skipped and reported by [`Snapshot::rejected`].
    pub fn from_records(records: impl IntoIterator<Item = BundleRecord>) -> Self {
        let mut snapshot = Snapshot::new();
        for record in records {
            let name = record.csv_name.clone();
            match Bundle::from_record(record) {
                Ok(bundle) => snapshot.push(Arc::new(bundle)),
                Err(error) => snapshot.reject(name, error),
            }
        }
        snapshot
    }

    /// Load a snapshot from JSON.
    ///
    /// Accepts either an array of bundle records or
    /// `{"bundles": [...], "defaultChannels": {"package": "channel"}}`.
    /// Only a malformed document fails; malformed records are rejected one
    /// by one.
    pub fn from_json(bytes: &[u8]) -> Result<Self, BundleError> {
        let (records, default_channels) = match serde_json::from_slice::<SnapshotDocument>(bytes)? {
            SnapshotDocument::Records(records) => (records, BTreeMap::new()),
            SnapshotDocument::Catalog { bundles, default_channels } => (bundles, default_channels),
        };

        let mut snapshot = Snapshot::new();
        for value in records {
            let name = value
                .get("csvName")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            match serde_json::from_value::<BundleRecord>(value)
                .map_err(BundleError::from)
                .and_then(Bundle::from_record)
            {
                Ok(bundle) => snapshot.push(Arc::new(bundle)),
                Err(error) => snapshot.reject(name, error),
            }
        }
        snapshot.default_channels = default_channels;

        debug!(
            "Loaded snapshot with {} bundles in {} packages ({} rejected)",
            snapshot.len(),
            snapshot.by_package.len(),
            snapshot.rejected.len()
        );
        Ok(snapshot)
    }

    /// Set the default channel of a package
    pub fn with_default_channel(mut self, package: &str, channel: &str) -> Self {
        self.default_channels.insert(package.to_string(), channel.to_string());
        self
    }

    fn push(&mut self, bundle: Arc<Bundle>) {
        let index = self.bundles.len();
        self.by_package
            .entry(bundle.package().to_string())
            .or_default()
            .push(index);
        self.bundles.push(bundle);
    }

    fn reject(&mut self, name: String, error: BundleError) {
        warn!("Skipping catalog record {}: {}", name, error);
        self.rejected.push(RejectedBundle { name, error });
    }

    /// All bundles in catalog order
    pub fn bundles(&self) -> &[Arc<Bundle>] {
        &self.bundles
    }

    /// Package names in order of first appearance
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.by_package.keys().map(String::as_str)
    }

    /// Bundles of a package in catalog order
    pub fn bundles_for(&self, package: &str) -> impl Iterator<Item = &Arc<Bundle>> {
        self.by_package
            .get(package)
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.bundles.get(i))
    }

    /// Find a bundle by package and CSV name
    pub fn find(&self, package: &str, name: &str) -> Option<&Arc<Bundle>> {
        self.bundles_for(package).find(|b| b.name() == name)
    }

    pub fn default_channel(&self, package: &str) -> Option<&str> {
        self.default_channels.get(package).map(String::as_str)
    }

    pub fn default_channels(&self) -> &BTreeMap<String, String> {
        &self.default_channels
    }

    /// Records skipped while loading
    pub fn rejected(&self) -> &[RejectedBundle] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
