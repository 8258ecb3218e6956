//! VersionRange - disjunction of conjunctive comparator sets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Constraint;
use crate::version_parser::VersionParser;
use crate::{SemverError, Version};

/// A version range such as `>=1.2.3 <2.0.0 || 3.x`.
///
/// Stored as OR-groups of AND-ed comparators. An empty AND-group matches
/// every version (that is how `*` is represented).
#[derive(Debug, Clone)]
pub struct VersionRange {
    alternatives: Vec<Vec<Constraint>>,
    pretty_string: String,
}

impl VersionRange {
    /// Parse a range string
    pub fn parse(range: &str) -> Result<Self, SemverError> {
        VersionParser::new().parse_range(range)
    }

    /// Build a range from already parsed OR-groups
    pub fn new(alternatives: Vec<Vec<Constraint>>, pretty_string: impl Into<String>) -> Self {
        VersionRange {
            alternatives,
            pretty_string: pretty_string.into(),
        }
    }

    /// A range matching every version
    pub fn any() -> Self {
        VersionRange::new(vec![Vec::new()], "*")
    }

    /// Check whether a version lies in this range
    pub fn contains(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|group| group.iter().all(|c| c.matches(version)))
    }

    /// Check whether this range matches every version
    pub fn is_any(&self) -> bool {
        self.alternatives.iter().any(|group| group.is_empty())
    }

    /// The OR-groups of this range
    pub fn alternatives(&self) -> &[Vec<Constraint>] {
        &self.alternatives
    }

    /// The range as originally written
    pub fn pretty_string(&self) -> &str {
        &self.pretty_string
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.alternatives == other.alternatives
    }
}

impl Eq for VersionRange {}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_string)
    }
}

impl FromStr for VersionRange {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty_string)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VersionRange::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_contains_conjunction() {
        let range = VersionRange::parse(">=1.2.3 <2.0.0").unwrap();
        assert!(range.contains(&v("1.2.3")));
        assert!(range.contains(&v("1.99.0")));
        assert!(!range.contains(&v("2.0.0")));
        assert!(!range.contains(&v("1.2.2")));
    }

    #[test]
    fn test_contains_disjunction() {
        let range = VersionRange::parse("<1.0.0 || >=3.0.0").unwrap();
        assert!(range.contains(&v("0.9.0")));
        assert!(range.contains(&v("3.1.0")));
        assert!(!range.contains(&v("2.0.0")));
    }

    #[test]
    fn test_any() {
        let range = VersionRange::any();
        assert!(range.is_any());
        assert!(range.contains(&v("0.0.1-alpha")));
        assert_eq!(range.to_string(), "*");
    }

    #[test]
    fn test_keeps_pretty_string() {
        let range = VersionRange::parse(">= 1.0.0  < 2.0.0").unwrap();
        assert_eq!(range.to_string(), ">= 1.0.0  < 2.0.0");
        assert_eq!(range, VersionRange::parse(">=1.0.0 <2.0.0").unwrap());
    }

    #[test]
    fn test_serde() {
        let range: VersionRange = serde_json::from_str("\">=1.0.0 <2.0.0\"").unwrap();
        assert!(range.contains(&v("1.5.0")));
        assert_eq!(serde_json::to_string(&range).unwrap(), "\">=1.0.0 <2.0.0\"");
        assert!(serde_json::from_str::<VersionRange>("\"~>1\"").is_err());
    }
}
