//! Typed `{type, value}` pairs carried by catalog bundles.

use std::borrow::Cow;

use olm_semver::VersionRange;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Gvk;
use crate::constraints::Constraint;
use crate::error::BundleError;

pub const PACKAGE_TYPE: &str = "olm.package";
pub const GVK_TYPE: &str = "olm.gvk";
pub const PACKAGE_REQUIRED_TYPE: &str = "olm.package.required";
pub const GVK_REQUIRED_TYPE: &str = "olm.gvk.required";
pub const LABEL_TYPE: &str = "olm.label";
pub const DEPRECATED_TYPE: &str = "olm.deprecated";
pub const CONSTRAINT_TYPE: &str = "olm.constraint";

/// A property or dependency as found in catalog data.
///
/// `value` is normally a string holding JSON. Some tooling inlines the JSON
/// value instead; both forms are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: Value,
}

/// A package that must be present within a version range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    pub package_name: String,
    pub version_range: VersionRange,
}

/// Decoded view of a bundle property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Package { package_name: String, version: String },
    Gvk(Gvk),
    PackageRequired(PackageDependency),
    GvkRequired(Gvk),
    Label(String),
    Deprecated,
    Constraint(Constraint),
    /// Unrecognized property type, carried but ignored
    Other(String),
}

/// Decoded view of an entry of a bundle's `dependencies` list
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    Package(PackageDependency),
    Gvk(Gvk),
    Label(String),
    Constraint(Constraint),
    Other(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageValue {
    package_name: String,
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageRequiredValue {
    package_name: String,
    #[serde(default)]
    version_range: String,
}

#[derive(Deserialize)]
struct LabelValue {
    label: String,
}

impl Property {
    /// Build a property in wire form (value encoded as a JSON string)
    pub fn new(property_type: impl Into<String>, value: Value) -> Self {
        Property {
            property_type: property_type.into(),
            value: Value::String(value.to_string()),
        }
    }

    pub fn package(package_name: &str, version: &str) -> Self {
        Self::new(PACKAGE_TYPE, json!({"packageName": package_name, "version": version}))
    }

    pub fn gvk(gvk: &Gvk) -> Self {
        Self::new(GVK_TYPE, json!({"group": gvk.group, "version": gvk.version, "kind": gvk.kind}))
    }

    pub fn gvk_required(gvk: &Gvk) -> Self {
        Self::new(GVK_REQUIRED_TYPE, json!({"group": gvk.group, "version": gvk.version, "kind": gvk.kind}))
    }

    pub fn package_required(package_name: &str, version_range: &str) -> Self {
        Self::new(
            PACKAGE_REQUIRED_TYPE,
            json!({"packageName": package_name, "versionRange": version_range}),
        )
    }

    pub fn label(label: &str) -> Self {
        Self::new(LABEL_TYPE, json!({ "label": label }))
    }

    pub fn deprecated() -> Self {
        Self::new(DEPRECATED_TYPE, json!({}))
    }

    pub fn constraint(constraint: &Constraint) -> Result<Self, BundleError> {
        Ok(Self::new(CONSTRAINT_TYPE, serde_json::to_value(constraint)?))
    }

    /// A package dependency in `dependencies` form, where `version` is a range
    pub fn package_dependency(package_name: &str, version_range: &str) -> Self {
        Self::new(PACKAGE_TYPE, json!({"packageName": package_name, "version": version_range}))
    }

    /// The JSON document held in `value`
    pub fn raw_value(&self) -> Cow<'_, [u8]> {
        match &self.value {
            Value::String(s) => Cow::Borrowed(s.as_bytes()),
            other => Cow::Owned(other.to_string().into_bytes()),
        }
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, BundleError> {
        let decoded = match &self.value {
            Value::String(s) => serde_json::from_str(s),
            other => T::deserialize(other),
        };
        decoded.map_err(|e| self.invalid(e))
    }

    fn invalid(&self, reason: impl ToString) -> BundleError {
        BundleError::InvalidProperty {
            property_type: self.property_type.clone(),
            reason: reason.to_string(),
        }
    }

    fn decode_range(&self, range: &str) -> Result<VersionRange, BundleError> {
        if range.trim().is_empty() {
            return Ok(VersionRange::any());
        }
        VersionRange::parse(range).map_err(|e| self.invalid(e))
    }

    fn decode_constraint(&self) -> Result<Constraint, BundleError> {
        crate::constraints::parse(&self.raw_value()).map_err(|e| self.invalid(e))
    }

    /// Decode this entry as a bundle property
    pub fn parse(&self) -> Result<PropertyValue, BundleError> {
        Ok(match self.property_type.as_str() {
            PACKAGE_TYPE => {
                let value: PackageValue = self.decode()?;
                PropertyValue::Package {
                    package_name: value.package_name,
                    version: value.version,
                }
            }
            GVK_TYPE => PropertyValue::Gvk(self.decode()?),
            GVK_REQUIRED_TYPE => PropertyValue::GvkRequired(self.decode()?),
            PACKAGE_REQUIRED_TYPE => {
                let value: PackageRequiredValue = self.decode()?;
                PropertyValue::PackageRequired(PackageDependency {
                    version_range: self.decode_range(&value.version_range)?,
                    package_name: value.package_name,
                })
            }
            LABEL_TYPE => PropertyValue::Label(self.decode::<LabelValue>()?.label),
            DEPRECATED_TYPE => PropertyValue::Deprecated,
            CONSTRAINT_TYPE => PropertyValue::Constraint(self.decode_constraint()?),
            other => PropertyValue::Other(other.to_string()),
        })
    }

    /// Decode this entry as a bundle dependency.
    ///
    /// In dependency lists `olm.package` carries a version range and
    /// `olm.gvk` names a required API.
    pub fn parse_dependency(&self) -> Result<Dependency, BundleError> {
        Ok(match self.property_type.as_str() {
            PACKAGE_TYPE => {
                let value: PackageValue = self.decode()?;
                Dependency::Package(PackageDependency {
                    version_range: self.decode_range(&value.version)?,
                    package_name: value.package_name,
                })
            }
            GVK_TYPE => Dependency::Gvk(self.decode()?),
            LABEL_TYPE => Dependency::Label(self.decode::<LabelValue>()?.label),
            CONSTRAINT_TYPE => Dependency::Constraint(self.decode_constraint()?),
            other => Dependency::Other(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_encoded_value() {
        let property: Property = serde_json::from_str(
            r#"{"type":"olm.package","value":"{\"packageName\":\"etcd\",\"version\":\"0.9.4\"}"}"#,
        )
        .unwrap();
        assert_eq!(
            property.parse().unwrap(),
            PropertyValue::Package {
                package_name: "etcd".into(),
                version: "0.9.4".into()
            }
        );
    }

    #[test]
    fn test_parse_inline_value() {
        let property: Property =
            serde_json::from_str(r#"{"type":"olm.gvk","value":{"group":"g1","version":"v1","kind":"Kind"}}"#).unwrap();
        assert_eq!(property.parse().unwrap(), PropertyValue::Gvk(Gvk::new("g1", "v1", "Kind")));
    }

    #[test]
    fn test_constructors_round_trip() {
        let gvk = Gvk::new("g1", "v1", "Kind");
        assert_eq!(Property::gvk_required(&gvk).parse().unwrap(), PropertyValue::GvkRequired(gvk));
        assert_eq!(Property::label("beta").parse().unwrap(), PropertyValue::Label("beta".into()));
        assert_eq!(Property::deprecated().parse().unwrap(), PropertyValue::Deprecated);

        match Property::package_required("foo", ">=1.0.0").parse().unwrap() {
            PropertyValue::PackageRequired(dep) => {
                assert_eq!(dep.package_name, "foo");
                assert_eq!(dep.version_range.to_string(), ">=1.0.0");
            }
            other => panic!("unexpected value {:?}", other),
        }

        let constraint = Constraint::all(vec![]).with_message("nothing");
        assert_eq!(
            Property::constraint(&constraint).unwrap().parse().unwrap(),
            PropertyValue::Constraint(constraint)
        );
    }

    #[test]
    fn test_unknown_type_is_opaque() {
        let property = Property::new("olm.bundle.object", json!({"data": "..."}));
        assert_eq!(property.parse().unwrap(), PropertyValue::Other("olm.bundle.object".into()));
    }

    #[test]
    fn test_malformed_value() {
        let property = Property::new(GVK_TYPE, json!({"group": "g1"}));
        match property.parse() {
            Err(BundleError::InvalidProperty { property_type, .. }) => assert_eq!(property_type, GVK_TYPE),
            other => panic!("unexpected result {:?}", other),
        }

        let bad_range = Property::package_dependency("foo", "~>1");
        assert!(bad_range.parse_dependency().is_err());
    }

    #[test]
    fn test_dependency_package_is_a_range() {
        match Property::package_dependency("foo", ">=1.0.0 <2.0.0").parse_dependency().unwrap() {
            Dependency::Package(dep) => {
                assert_eq!(dep.package_name, "foo");
                assert!(dep.version_range.contains(&"1.5.0".parse().unwrap()));
            }
            other => panic!("unexpected dependency {:?}", other),
        }

        match Property::package_dependency("foo", "").parse_dependency().unwrap() {
            Dependency::Package(dep) => assert!(dep.version_range.is_any()),
            other => panic!("unexpected dependency {:?}", other),
        }
    }

    #[test]
    fn test_raw_value() {
        let encoded = Property::label("x");
        assert_eq!(&*encoded.raw_value(), br#"{"label":"x"}"#);

        let inline = Property {
            property_type: LABEL_TYPE.into(),
            value: json!({"label": "x"}),
        };
        assert_eq!(&*inline.raw_value(), br#"{"label":"x"}"#);
    }
}
