//! Semantic versioning for operator bundles
//!
//! Strict SemVer 2.0.0 versions plus the range syntax used by bundle
//! dependencies and `skipRange` annotations: comparators joined by
//! whitespace (AND) and `||` (OR), with `x`/`X`/`*` wildcards.

pub mod constraint;
mod version;
mod version_parser;

pub use constraint::{Constraint, Operator, VersionRange};
pub use version::{Prerelease, Version};
pub use version_parser::{SemverError, VersionParser};

/// Check whether a version string satisfies a range string.
///
/// Returns false when either side fails to parse.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (Version::parse(version), VersionRange::parse(range)) {
        (Ok(version), Ok(range)) => range.contains(&version),
        _ => false,
    }
}

/// Sort versions in ascending precedence
pub fn sort(versions: &mut [Version]) {
    versions.sort();
}

/// Sort versions in descending precedence
pub fn rsort(versions: &mut [Version]) {
    versions.sort_by(|a, b| b.cmp(a));
}
