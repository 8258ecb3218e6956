//! Bundle and package data model.

mod api_key;
#[allow(clippy::module_inception)]
mod bundle;
mod property;

pub use api_key::{ApiKey, Gvk};
pub use bundle::{Bundle, BundleRecord, UpgradeEdge};
pub use property::{
    Dependency, PackageDependency, Property, PropertyValue, CONSTRAINT_TYPE, DEPRECATED_TYPE, GVK_REQUIRED_TYPE,
    GVK_TYPE, LABEL_TYPE, PACKAGE_REQUIRED_TYPE, PACKAGE_TYPE,
};
