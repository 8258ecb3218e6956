use std::fmt;

use olm_semver::VersionRange;

use super::pool::{Pool, VarId};
use super::rule::Reason;

/// One reason that contributes to a failed resolution.
///
/// The description is rendered against the pool when the problem is
/// created, so it stays meaningful after the pool is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    reason: Reason,
    description: String,
}

impl Problem {
    /// Create a problem, describing the reason against the pool
    pub fn new(reason: Reason, pool: &Pool) -> Self {
        let description = describe_reason(pool, &reason);
        Self { reason, description }
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Bundle names of some candidates, comma separated
fn bundle_names(pool: &Pool, ids: &[VarId]) -> String {
    ids.iter()
        .filter_map(|&id| pool.bundle(id))
        .map(|b| b.name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Explain why no bundle of `package` in `range` could be used
fn package_availability(pool: &Pool, package: &str, range: &VersionRange, channel: Option<&str>) -> String {
    if pool.package_vars(package).is_empty() {
        return "package not found in catalog".to_string();
    }

    let candidates = pool.what_provides(package, range, channel);
    if candidates.is_empty() {
        format!("no bundle matches, available versions: {}", pool.versions_of(package).join(", "))
    } else {
        format!("candidates {}", bundle_names(pool, &candidates))
    }
}

fn parse_range(range: Option<&str>) -> VersionRange {
    range
        .and_then(|r| VersionRange::parse(r).ok())
        .unwrap_or_else(VersionRange::any)
}

/// Describe a reason in human-readable form
fn describe_reason(pool: &Pool, reason: &Reason) -> String {
    match reason {
        Reason::Required {
            package,
            range,
            channel,
        } => {
            let mut line = format!("required package \"{}\"", package);
            if let Some(range) = range {
                line.push_str(&format!(" in range \"{}\"", range));
            }
            if let Some(channel) = channel {
                line.push_str(&format!(" in channel \"{}\"", channel));
            }
            let availability = package_availability(pool, package, &parse_range(range.as_deref()), channel.as_deref());
            format!("{}: {}", line, availability)
        }
        Reason::RequiredApi { gvk } => {
            let providers = pool.providers(gvk);
            if providers.is_empty() {
                format!("required api {}: no bundle provides it", gvk)
            } else {
                format!("required api {}: provided by {}", gvk, bundle_names(pool, providers))
            }
        }
        Reason::Installed { package, bundle } => {
            format!("installed package \"{}\" ({}) must stay installed", package, bundle)
        }
        Reason::Dependency {
            bundle,
            package,
            range,
        } => {
            let availability = package_availability(pool, package, &parse_range(Some(range)), None);
            format!(
                "bundle {} requires package \"{}\" in range \"{}\": {}",
                bundle, package, range, availability
            )
        }
        Reason::ApiDependency { bundle, gvk } => {
            if pool.providers(gvk).is_empty() {
                format!("bundle {} requires api {}: no bundle provides it", bundle, gvk)
            } else {
                format!(
                    "bundle {} requires api {}: provided by {}",
                    bundle,
                    gvk,
                    bundle_names(pool, pool.providers(gvk))
                )
            }
        }
        Reason::LabelDependency { bundle, label } => {
            if pool.label_providers(label).is_empty() {
                format!("bundle {} requires label \"{}\": no bundle offers it", bundle, label)
            } else {
                format!("bundle {} requires label \"{}\"", bundle, label)
            }
        }
        Reason::Constraint {
            bundle,
            message,
            description,
        } => {
            if message.is_empty() {
                format!("bundle {} requires {}", bundle, description)
            } else {
                format!("bundle {}: {}", bundle, message)
            }
        }
        Reason::AtMostOnePackage { package } => {
            format!("at most one bundle of package \"{}\" can be selected", package)
        }
        Reason::AtMostOneProvider { gvk } => {
            format!("at most one bundle can provide api {}", gvk)
        }
        Reason::AddedPackages { limit } => format!("at most {} new packages can be added", limit),
        Reason::NotUpgradeable { bundle, installed } => {
            format!("bundle {} is not an upgrade of installed bundle {}", bundle, installed)
        }
        Reason::Deprecated { bundle } => format!("bundle {} is deprecated", bundle),
        Reason::Unparseable { bundle, error } => {
            format!("bundle {} has an invalid constraint: {}", bundle, error)
        }
    }
}

/// Collection of problems explaining a failed resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    /// Create a new empty problem set
    pub fn new() -> Self {
        Self { problems: Vec::new() }
    }

    /// Add a problem
    pub fn add(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Get all problems
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    /// Check if any problem description contains `text`
    pub fn mentions(&self, text: &str) -> bool {
        self.problems.iter().any(|p| p.description.contains(text))
    }
}

impl fmt::Display for ProblemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.problems.is_empty() {
            return write!(f, "no bundle selection satisfies the requirements");
        }
        write!(f, "no bundle selection satisfies the requirements:")?;
        for problem in &self.problems {
            write!(f, "\n  - {}", problem)?;
        }
        Ok(())
    }
}
