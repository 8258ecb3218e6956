//! The `olm.constraint` tree

use std::fmt;

use olm_semver::VersionRange;
use serde::{Deserialize, Deserializer, Serialize};

use crate::bundle::Gvk;

/// Leaf payload requiring a package within a version range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PackageConstraint {
    pub name: String,
    pub version_range: VersionRange,
}

/// The single payload of a constraint node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Some selected bundle of `name` has a version in `version_range`
    Package(PackageConstraint),
    /// Some selected bundle provides this group/version/kind
    Gvk(Gvk),
    /// Every sub-constraint holds (empty: always true)
    All(Vec<Constraint>),
    /// At least one sub-constraint holds (empty: never true)
    Any(Vec<Constraint>),
    /// No sub-constraint holds (empty: always true)
    None(Vec<Constraint>),
}

/// A parsed `olm.constraint` value.
///
/// Each node carries a human readable `message` and exactly one payload.
/// The wire form is `{"message": ..., "package"|"gvk"|"all"|"any"|"none": ...}`
/// where compounds hold `{"constraints": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraint", into = "RawConstraint")]
pub struct Constraint {
    message: String,
    kind: ConstraintKind,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Constraint {
            message: String::new(),
            kind,
        }
    }

    pub fn package(name: impl Into<String>, version_range: VersionRange) -> Self {
        Self::new(ConstraintKind::Package(PackageConstraint {
            name: name.into(),
            version_range,
        }))
    }

    pub fn gvk(gvk: Gvk) -> Self {
        Self::new(ConstraintKind::Gvk(gvk))
    }

    pub fn all(constraints: Vec<Constraint>) -> Self {
        Self::new(ConstraintKind::All(constraints))
    }

    pub fn any(constraints: Vec<Constraint>) -> Self {
        Self::new(ConstraintKind::Any(constraints))
    }

    pub fn none(constraints: Vec<Constraint>) -> Self {
        Self::new(ConstraintKind::None(constraints))
    }

    /// Attach a human readable failure message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Evaluate the tree, deciding leaves with `leaf`.
    ///
    /// `leaf` is only ever called with package or gvk nodes.
    pub fn evaluate(&self, leaf: &dyn Fn(&Constraint) -> bool) -> bool {
        match &self.kind {
            ConstraintKind::Package(_) | ConstraintKind::Gvk(_) => leaf(self),
            ConstraintKind::All(constraints) => constraints.iter().all(|c| c.evaluate(leaf)),
            ConstraintKind::Any(constraints) => constraints.iter().any(|c| c.evaluate(leaf)),
            ConstraintKind::None(constraints) => !constraints.iter().any(|c| c.evaluate(leaf)),
        }
    }

    /// Structural description, ignoring messages
    pub fn describe(&self) -> String {
        let list = |constraints: &[Constraint]| {
            constraints
                .iter()
                .map(|c| c.describe())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match &self.kind {
            ConstraintKind::Package(p) => format!("package {} in range \"{}\"", p.name, p.version_range),
            ConstraintKind::Gvk(gvk) => format!("api {}", gvk),
            ConstraintKind::All(c) => format!("all of ({})", list(c)),
            ConstraintKind::Any(c) => format!("any of ({})", list(c)),
            ConstraintKind::None(c) => format!("none of ({})", list(c)),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.describe())
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompoundConstraint {
    #[serde(default)]
    constraints: Vec<Constraint>,
}

/// Wire shape: every payload optional, unknown fields rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstraint {
    #[serde(default, deserialize_with = "null_as_empty")]
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    package: Option<PackageConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gvk: Option<Gvk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    all: Option<CompoundConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    any: Option<CompoundConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    none: Option<CompoundConstraint>,
}

/// A `null` message reads as no message
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TryFrom<RawConstraint> for Constraint {
    type Error = String;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        let RawConstraint { message, package, gvk, all, any, none } = raw;

        let mut kinds = Vec::with_capacity(1);
        if let Some(package) = package {
            kinds.push(("package", ConstraintKind::Package(package)));
        }
        if let Some(gvk) = gvk {
            kinds.push(("gvk", ConstraintKind::Gvk(gvk)));
        }
        if let Some(all) = all {
            kinds.push(("all", ConstraintKind::All(all.constraints)));
        }
        if let Some(any) = any {
            kinds.push(("any", ConstraintKind::Any(any.constraints)));
        }
        if let Some(none) = none {
            kinds.push(("none", ConstraintKind::None(none.constraints)));
        }

        if kinds.len() > 1 {
            let names: Vec<&str> = kinds.iter().map(|(name, _)| *name).collect();
            return Err(format!("constraint has more than one payload: {}", names.join(", ")));
        }

        match kinds.pop() {
            Some((_, kind)) => Ok(Constraint { message, kind }),
            None => Err("constraint has no payload, expected one of package, gvk, all, any, none".to_string()),
        }
    }
}

impl From<Constraint> for RawConstraint {
    fn from(constraint: Constraint) -> Self {
        let mut raw = RawConstraint {
            message: constraint.message,
            package: None,
            gvk: None,
            all: None,
            any: None,
            none: None,
        };
        match constraint.kind {
            ConstraintKind::Package(p) => raw.package = Some(p),
            ConstraintKind::Gvk(g) => raw.gvk = Some(g),
            ConstraintKind::All(constraints) => raw.all = Some(CompoundConstraint { constraints }),
            ConstraintKind::Any(constraints) => raw.any = Some(CompoundConstraint { constraints }),
            ConstraintKind::None(constraints) => raw.none = Some(CompoundConstraint { constraints }),
        }
        raw
    }
}
