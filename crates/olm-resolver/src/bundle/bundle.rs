use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use olm_semver::{Version, VersionRange};
use serde::{Deserialize, Serialize};

use super::property::{Dependency, PackageDependency, Property, PropertyValue, CONSTRAINT_TYPE};
use super::{ApiKey, Gvk};
use crate::constraints::{self, Constraint};
use crate::error::{BundleError, ConstraintError};

/// A bundle as it appears in catalog data (operator-registry `api.Bundle`).
///
/// Fields the resolver does not use (CSV JSON, objects, bundle path) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleRecord {
    pub csv_name: String,
    pub package_name: String,
    pub channel_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub replaces: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub skip_range: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provided_apis: Vec<ApiKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_apis: Vec<ApiKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Property>,
}

impl BundleRecord {
    pub fn new(csv_name: &str, package_name: &str, version: &str) -> Self {
        BundleRecord {
            csv_name: csv_name.to_string(),
            package_name: package_name.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel_name = channel.to_string();
        self
    }

    pub fn with_replaces(mut self, replaces: &str) -> Self {
        self.replaces = replaces.to_string();
        self
    }

    pub fn with_skips(mut self, skips: &[&str]) -> Self {
        self.skips = skips.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_skip_range(mut self, range: &str) -> Self {
        self.skip_range = range.to_string();
        self
    }

    pub fn providing(mut self, gvk: Gvk) -> Self {
        self.provided_apis.push(gvk.into());
        self
    }

    pub fn requiring(mut self, gvk: Gvk) -> Self {
        self.required_apis.push(gvk.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_dependency(mut self, dependency: Property) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// How a bundle can be reached from an installed bundle of its package
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpgradeEdge {
    /// The candidate is the installed bundle
    Stay,
    /// `skipRange` covers the installed version
    SkipRange,
    /// `skips` lists the installed bundle
    Skips,
    /// `replaces` names the installed bundle
    Replaces,
}

/// An immutable, resolvable bundle
#[derive(Debug, Clone)]
pub struct Bundle {
    name: String,
    package: String,
    channel: String,
    version: Version,
    replaces: Option<String>,
    skips: Vec<String>,
    skip_range: Option<VersionRange>,
    provided_apis: BTreeSet<ApiKey>,
    required_apis: BTreeSet<ApiKey>,
    properties: Vec<Property>,
    dependencies: Vec<Property>,

    provided_gvks: BTreeSet<Gvk>,
    required_gvks: BTreeSet<Gvk>,
    package_dependencies: Vec<PackageDependency>,
    labels: BTreeSet<String>,
    label_dependencies: Vec<String>,
    deprecated: bool,
    constraints: Vec<Constraint>,
    constraint_errors: Vec<ConstraintError>,
}

impl Bundle {
    /// Build a bundle from its catalog record.
    ///
    /// Typed properties and dependencies are decoded here. Constraints that
    /// fail to parse do not fail construction; they are kept in
    /// [`Bundle::constraint_errors`] for the resolver to act on.
    pub fn from_record(record: BundleRecord) -> Result<Self, BundleError> {
        if record.csv_name.is_empty() {
            return Err(BundleError::MissingField("csvName"));
        }

        let mut package = record.package_name;
        let mut version_str = record.version;
        let mut provided_gvks: BTreeSet<Gvk> = record.provided_apis.iter().map(ApiKey::gvk).collect();
        let mut required_gvks: BTreeSet<Gvk> = record.required_apis.iter().map(ApiKey::gvk).collect();
        let mut package_dependencies = Vec::new();
        let mut labels = BTreeSet::new();
        let mut label_dependencies = Vec::new();
        let mut deprecated = false;
        let mut constraints = Vec::new();
        let mut constraint_errors = Vec::new();

        for property in &record.properties {
            if property.property_type == CONSTRAINT_TYPE {
                match constraints::parse(&property.raw_value()) {
                    Ok(constraint) => constraints.push(constraint),
                    Err(e) => constraint_errors.push(e),
                }
                continue;
            }

            match property.parse()? {
                PropertyValue::Package { package_name, version } => {
                    if package.is_empty() {
                        package = package_name;
                    }
                    if version_str.is_empty() {
                        version_str = version;
                    }
                }
                PropertyValue::Gvk(gvk) => {
                    provided_gvks.insert(gvk);
                }
                PropertyValue::GvkRequired(gvk) => {
                    required_gvks.insert(gvk);
                }
                PropertyValue::PackageRequired(dep) => package_dependencies.push(dep),
                PropertyValue::Label(label) => {
                    labels.insert(label);
                }
                PropertyValue::Deprecated => deprecated = true,
                PropertyValue::Constraint(_) | PropertyValue::Other(_) => {}
            }
        }

        for dependency in &record.dependencies {
            if dependency.property_type == CONSTRAINT_TYPE {
                match constraints::parse(&dependency.raw_value()) {
                    Ok(constraint) => constraints.push(constraint),
                    Err(e) => constraint_errors.push(e),
                }
                continue;
            }

            match dependency.parse_dependency()? {
                Dependency::Package(dep) => package_dependencies.push(dep),
                Dependency::Gvk(gvk) => {
                    required_gvks.insert(gvk);
                }
                Dependency::Label(label) => label_dependencies.push(label),
                Dependency::Constraint(_) => {}
                Dependency::Other(other) => debug!("Ignoring dependency of type {} on {}", other, record.csv_name),
            }
        }

        if package.is_empty() {
            return Err(BundleError::MissingField("packageName"));
        }
        if version_str.is_empty() {
            return Err(BundleError::MissingVersion);
        }

        let version = Version::parse(&version_str).map_err(|source| BundleError::InvalidVersion {
            version: version_str.clone(),
            source,
        })?;

        let skip_range = if record.skip_range.trim().is_empty() {
            None
        } else {
            Some(
                VersionRange::parse(&record.skip_range).map_err(|source| BundleError::InvalidSkipRange {
                    range: record.skip_range.clone(),
                    source,
                })?,
            )
        };

        Ok(Bundle {
            name: record.csv_name,
            package,
            channel: record.channel_name,
            version,
            replaces: Some(record.replaces).filter(|r| !r.is_empty()),
            skips: record.skips,
            skip_range,
            provided_apis: record.provided_apis.into_iter().collect(),
            required_apis: record.required_apis.into_iter().collect(),
            properties: record.properties,
            dependencies: record.dependencies,
            provided_gvks,
            required_gvks,
            package_dependencies,
            labels,
            label_dependencies,
            deprecated,
            constraints,
            constraint_errors,
        })
    }

    /// CSV name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn replaces(&self) -> Option<&str> {
        self.replaces.as_deref()
    }

    pub fn skips(&self) -> &[String] {
        &self.skips
    }

    pub fn skip_range(&self) -> Option<&VersionRange> {
        self.skip_range.as_ref()
    }

    pub fn provided_apis(&self) -> &BTreeSet<ApiKey> {
        &self.provided_apis
    }

    pub fn required_apis(&self) -> &BTreeSet<ApiKey> {
        &self.required_apis
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn dependencies(&self) -> &[Property] {
        &self.dependencies
    }

    /// APIs this bundle provides: `providedApis` plus `olm.gvk` properties
    pub fn provided_gvks(&self) -> &BTreeSet<Gvk> {
        &self.provided_gvks
    }

    /// APIs this bundle needs: `requiredApis`, `olm.gvk.required` properties
    /// and `olm.gvk` dependencies
    pub fn required_gvks(&self) -> &BTreeSet<Gvk> {
        &self.required_gvks
    }

    pub fn package_dependencies(&self) -> &[PackageDependency] {
        &self.package_dependencies
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn label_dependencies(&self) -> &[String] {
        &self.label_dependencies
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint_errors(&self) -> &[ConstraintError] {
        &self.constraint_errors
    }

    pub fn provides(&self, gvk: &Gvk) -> bool {
        self.provided_gvks.contains(gvk)
    }

    /// Classify how this bundle can be reached from `installed`.
    ///
    /// `None` means there is no direct edge and the bundle is not a valid
    /// upgrade target.
    pub fn upgrade_edge_from(&self, installed: &Bundle) -> Option<UpgradeEdge> {
        if self.package != installed.package {
            return None;
        }
        if self.name == installed.name {
            return Some(UpgradeEdge::Stay);
        }
        if self.replaces.as_deref() == Some(installed.name.as_str()) {
            return Some(UpgradeEdge::Replaces);
        }
        if self.skips.iter().any(|s| *s == installed.name) {
            return Some(UpgradeEdge::Skips);
        }
        match &self.skip_range {
            Some(range) if range.contains(&installed.version) => Some(UpgradeEdge::SkipRange),
            _ => None,
        }
    }

    /// `name (package@version)`
    pub fn pretty_string(&self) -> String {
        format!("{} ({}@{})", self.name, self.package, self.version)
    }
}

impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.package == other.package
            && self.channel == other.channel
            && self.version == other.version
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl TryFrom<BundleRecord> for Bundle {
    type Error = BundleError;

    fn try_from(record: BundleRecord) -> Result<Self, Self::Error> {
        Bundle::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(record: BundleRecord) -> Bundle {
        Bundle::from_record(record).unwrap()
    }

    #[test]
    fn test_from_record_json() {
        let record: BundleRecord = serde_json::from_str(
            r#"{
                "csvName": "etcdoperator.v0.9.4",
                "packageName": "etcd",
                "channelName": "alpha",
                "version": "0.9.4",
                "replaces": "etcdoperator.v0.9.2",
                "skips": ["etcdoperator.v0.9.3"],
                "skipRange": "<0.9.4",
                "providedApis": [{"group":"etcd.database.coreos.com","version":"v1beta2","kind":"EtcdCluster","plural":"etcdclusters"}],
                "csvJson": "{}",
                "object": ["..."]
            }"#,
        )
        .unwrap();

        let b = bundle(record);
        assert_eq!(b.name(), "etcdoperator.v0.9.4");
        assert_eq!(b.package(), "etcd");
        assert_eq!(b.channel(), "alpha");
        assert_eq!(b.version().to_string(), "0.9.4");
        assert_eq!(b.replaces(), Some("etcdoperator.v0.9.2"));
        assert!(b.provides(&Gvk::new("etcd.database.coreos.com", "v1beta2", "EtcdCluster")));
        assert_eq!(b.provided_apis().len(), 1);
    }

    #[test]
    fn test_version_from_package_property() {
        let record = BundleRecord {
            csv_name: "foo.v1".into(),
            properties: vec![Property::package("foo", "1.0.0")],
            ..Default::default()
        };
        let b = bundle(record);
        assert_eq!(b.package(), "foo");
        assert_eq!(b.version().to_string(), "1.0.0");
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            Bundle::from_record(BundleRecord::new("foo.v1", "foo", "")),
            Err(BundleError::MissingVersion)
        ));
        assert!(matches!(
            Bundle::from_record(BundleRecord::new("foo.v1", "foo", "1.0")),
            Err(BundleError::InvalidVersion { .. })
        ));
        assert!(matches!(
            Bundle::from_record(BundleRecord::new("foo.v1", "foo", "1.0.0").with_skip_range("~>1")),
            Err(BundleError::InvalidSkipRange { .. })
        ));
        assert!(matches!(
            Bundle::from_record(BundleRecord::new("", "foo", "1.0.0")),
            Err(BundleError::MissingField("csvName"))
        ));
        assert!(matches!(
            Bundle::from_record(
                BundleRecord::new("foo.v1", "foo", "1.0.0")
                    .with_property(Property::new(crate::bundle::GVK_TYPE, serde_json::json!({"kind": "K"})))
            ),
            Err(BundleError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_derived_views() {
        let provided = Gvk::new("g", "v1", "Provided");
        let by_property = Gvk::new("g", "v1", "ByProperty");
        let required = Gvk::new("g", "v1", "Required");
        let dep_gvk = Gvk::new("g", "v1", "Dependency");
        let prop_required = Gvk::new("g", "v1", "PropertyRequired");

        let b = bundle(
            BundleRecord::new("bar.v1", "bar", "1.0.0")
                .providing(provided.clone())
                .requiring(required.clone())
                .with_property(Property::gvk(&by_property))
                .with_property(Property::gvk_required(&prop_required))
                .with_property(Property::label("beta"))
                .with_property(Property::package_required("baz", ">=1.0.0"))
                .with_property(Property::deprecated())
                .with_dependency(Property::gvk(&dep_gvk))
                .with_dependency(Property::package_dependency("foo", ">=1.0.0 <2.0.0"))
                .with_dependency(Property::label("stable")),
        );

        let provided_gvks: Vec<_> = b.provided_gvks().iter().cloned().collect();
        assert_eq!(provided_gvks, vec![by_property, provided]);
        assert_eq!(b.required_gvks().len(), 3);
        assert!(b.required_gvks().contains(&dep_gvk));
        assert!(b.required_gvks().contains(&prop_required));
        let packages: Vec<_> = b.package_dependencies().iter().map(|d| d.package_name.as_str()).collect();
        assert_eq!(packages, vec!["baz", "foo"]);
        assert!(b.labels().contains("beta"));
        assert_eq!(b.label_dependencies(), &["stable".to_string()]);
        assert!(b.is_deprecated());
    }

    #[test]
    fn test_constraint_errors_are_retained() {
        let good = Constraint::gvk(Gvk::new("g", "v", "K"));
        let b = bundle(
            BundleRecord::new("bar.v1", "bar", "1.0.0")
                .with_property(Property::constraint(&good).unwrap())
                .with_property(Property::new(CONSTRAINT_TYPE, serde_json::json!({"bogus": {}}))),
        );
        assert_eq!(b.constraints(), &[good]);
        assert_eq!(b.constraint_errors().len(), 1);
        assert!(matches!(b.constraint_errors()[0], ConstraintError::SchemaViolation(_)));
    }

    #[test]
    fn test_upgrade_edges() {
        let installed = bundle(BundleRecord::new("foo.v1", "foo", "1.0.0"));

        let replaces = bundle(BundleRecord::new("foo.v2", "foo", "2.0.0").with_replaces("foo.v1"));
        let skips = bundle(BundleRecord::new("foo.v3", "foo", "3.0.0").with_skips(&["foo.v1"]));
        let skip_range = bundle(
            BundleRecord::new("foo.v4", "foo", "4.0.0")
                .with_replaces("foo.v3.5")
                .with_skip_range(">=1.0.0 <4.0.0"),
        );
        let unrelated = bundle(BundleRecord::new("foo.v5", "foo", "5.0.0").with_replaces("foo.v4"));
        let other_package = bundle(BundleRecord::new("bar.v2", "bar", "2.0.0").with_replaces("foo.v1"));

        assert_eq!(installed.upgrade_edge_from(&installed), Some(UpgradeEdge::Stay));
        assert_eq!(replaces.upgrade_edge_from(&installed), Some(UpgradeEdge::Replaces));
        assert_eq!(skips.upgrade_edge_from(&installed), Some(UpgradeEdge::Skips));
        assert_eq!(skip_range.upgrade_edge_from(&installed), Some(UpgradeEdge::SkipRange));
        assert_eq!(unrelated.upgrade_edge_from(&installed), None);
        assert_eq!(other_package.upgrade_edge_from(&installed), None);
    }

    #[test]
    fn test_upgrade_edge_precedence() {
        assert!(UpgradeEdge::Replaces > UpgradeEdge::Skips);
        assert!(UpgradeEdge::Skips > UpgradeEdge::SkipRange);
        assert!(UpgradeEdge::SkipRange > UpgradeEdge::Stay);
        assert!(Some(UpgradeEdge::Stay) > None);
    }
}
