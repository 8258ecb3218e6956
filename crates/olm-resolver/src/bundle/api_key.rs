use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Group/version/kind of a Kubernetes API, the unit of API matching
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Gvk {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

impl FromStr for Gvk {
    type Err = String;

    /// Parse `group/version/kind`; the group may be empty for core APIs
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [group, version, kind] if !version.is_empty() && !kind.is_empty() => Ok(Gvk::new(*group, *version, *kind)),
            _ => Err(format!("expected GROUP/VERSION/KIND, got \"{}\"", s)),
        }
    }
}

/// An API as described by catalog bundle records.
///
/// Only group, version and kind take part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiKey {
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default)]
    pub plural: String,
}

impl ApiKey {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        ApiKey {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
        }
    }

    pub fn gvk(&self) -> Gvk {
        Gvk::new(&self.group, &self.version, &self.kind)
    }
}

impl From<Gvk> for ApiKey {
    fn from(gvk: Gvk) -> Self {
        ApiKey {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            plural: String::new(),
        }
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{} ({})", self.group, self.version, self.kind, self.plural)
    }
}
