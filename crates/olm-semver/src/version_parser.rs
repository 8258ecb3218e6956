//! Version and range parsing module

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::constraint::{Constraint, Operator, VersionRange};
use crate::version::{Prerelease, Version};

/// Error type for version and range parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemverError {
    #[error("Invalid version string \"{0}\"")]
    InvalidVersion(String),
    #[error("Could not parse version range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: String },
}

lazy_static! {
    // Strict SemVer 2.0.0 grammar (semver.org recommended expression)
    static ref STRICT_VERSION_RE: Regex = Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$"
    ).unwrap();

    // Lenient form used inside ranges: optional `v`, partial versions, x-wildcards
    static ref RANGE_VERSION_RE: Regex = Regex::new(
        r"^v?(\d+|[xX*])(?:\.(\d+|[xX*]))?(?:\.(\d+|[xX*]))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$"
    ).unwrap();
}

/// Position of the first wildcard in a partial version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wildcard {
    None,
    Major,
    Minor,
    Patch,
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

fn parse_prerelease(pre: &str) -> Vec<Prerelease> {
    pre.split('.')
        .map(|id| match id.parse::<u64>() {
            Ok(n) if id.chars().all(|c| c.is_ascii_digit()) => Prerelease::Numeric(n),
            _ => Prerelease::Alpha(id.to_string()),
        })
        .collect()
}

fn parse_build(build: Option<&str>) -> Vec<String> {
    build
        .map(|b| b.split('.').map(String::from).collect())
        .unwrap_or_default()
}

/// Parser for versions and version ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionParser;

impl VersionParser {
    /// Create a new version parser
    pub fn new() -> Self {
        VersionParser
    }

    /// Check if a string is a valid strict version
    pub fn is_valid(&self, version: &str) -> bool {
        self.parse_version(version).is_ok()
    }

    /// Parse a strict SemVer 2.0.0 version
    pub fn parse_version(&self, version: &str) -> Result<Version, SemverError> {
        let invalid = || SemverError::InvalidVersion(version.to_string());
        let caps = STRICT_VERSION_RE.captures(version).ok_or_else(invalid)?;

        let number = |i: usize| -> Result<u64, SemverError> {
            caps.get(i)
                .map(|m| m.as_str())
                .unwrap_or("0")
                .parse::<u64>()
                .map_err(|_| invalid())
        };

        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre: caps.get(4).map(|m| parse_prerelease(m.as_str())).unwrap_or_default(),
            build: parse_build(caps.get(5).map(|m| m.as_str())),
        })
    }

    /// Parse a version range.
    ///
    /// Alternatives are separated by `||`, comparators inside an alternative
    /// by whitespace. An operator may be separated from its version by spaces.
    pub fn parse_range(&self, range: &str) -> Result<VersionRange, SemverError> {
        let trimmed = range.trim();
        if trimmed.is_empty() {
            return Err(range_error(range, "empty range"));
        }

        let mut alternatives = Vec::new();
        for alternative in trimmed.split("||") {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                return Err(range_error(range, "empty alternative around '||'"));
            }

            let mut group = Vec::new();
            for token in self.split_and_constraints(range, alternative)? {
                group.extend(self.parse_constraint(range, &token)?);
            }
            alternatives.push(group);
        }

        Ok(VersionRange::new(alternatives, trimmed))
    }

    /// Split an alternative into comparator tokens, gluing bare operators to
    /// the version that follows them (`>= 1.0.0` -> `>=1.0.0`).
    fn split_and_constraints(&self, range: &str, input: &str) -> Result<Vec<String>, SemverError> {
        let mut parts = Vec::new();
        let mut pending: Option<&str> = None;

        for token in input.split_whitespace() {
            let is_operator = token.chars().all(|c| matches!(c, '<' | '>' | '=' | '!'));
            match (pending.take(), is_operator) {
                (Some(op), false) => parts.push(format!("{}{}", op, token)),
                (Some(op), true) => {
                    return Err(range_error(range, &format!("operator '{}' followed by operator '{}'", op, token)));
                }
                (None, true) => pending = Some(token),
                (None, false) => parts.push(token.to_string()),
            }
        }

        if let Some(op) = pending {
            return Err(range_error(range, &format!("dangling operator '{}'", op)));
        }

        Ok(parts)
    }

    /// Parse one comparator token into zero or more constraints.
    /// Wildcards expand into bounds; a match-all token yields no constraints.
    fn parse_constraint(&self, range: &str, token: &str) -> Result<Vec<Constraint>, SemverError> {
        let (operator, rest) = Operator::split_prefix(token);
        if rest.is_empty() {
            return Err(range_error(range, &format!("missing version after '{}'", token)));
        }

        let caps = RANGE_VERSION_RE
            .captures(rest)
            .ok_or_else(|| range_error(range, &format!("invalid version '{}'", rest)))?;

        let wildcard = wildcard_position(&caps);
        if wildcard != Wildcard::None && (caps.get(4).is_some() || caps.get(5).is_some()) {
            return Err(range_error(range, &format!("wildcard version '{}' cannot carry pre-release or build data", rest)));
        }

        let number = |i: usize| -> Result<u64, SemverError> {
            match caps.get(i).map(|m| m.as_str()) {
                None => Ok(0),
                Some(s) if is_wildcard(s) => Ok(0),
                Some(s) => s
                    .parse::<u64>()
                    .map_err(|_| range_error(range, &format!("version component '{}' out of range", s))),
            }
        };

        let lower = Version::new(number(1)?, number(2)?, number(3)?);

        let upper = match wildcard {
            Wildcard::Major => {
                return match operator {
                    Operator::Equal | Operator::GreaterThanOrEqual | Operator::LessThanOrEqual => Ok(Vec::new()),
                    _ => Err(range_error(range, &format!("operator '{}' cannot be used with '{}'", operator, rest))),
                };
            }
            Wildcard::Minor => lower.next_major(),
            Wildcard::Patch => lower.next_minor(),
            Wildcard::None => {
                let version = Version {
                    pre: caps.get(4).map(|m| parse_prerelease(m.as_str())).unwrap_or_default(),
                    build: parse_build(caps.get(5).map(|m| m.as_str())),
                    ..lower
                };
                return Ok(vec![Constraint::new(operator, version)]);
            }
        };

        let expanded = match operator {
            Operator::Equal => vec![
                Constraint::new(Operator::GreaterThanOrEqual, lower),
                Constraint::new(Operator::LessThan, upper),
            ],
            Operator::GreaterThanOrEqual => vec![Constraint::new(Operator::GreaterThanOrEqual, lower)],
            Operator::GreaterThan => vec![Constraint::new(Operator::GreaterThanOrEqual, upper)],
            Operator::LessThan => vec![Constraint::new(Operator::LessThan, lower)],
            Operator::LessThanOrEqual => vec![Constraint::new(Operator::LessThan, upper)],
            Operator::NotEqual => {
                return Err(range_error(range, &format!("'!=' cannot be combined with wildcard '{}'", rest)));
            }
        };

        Ok(expanded)
    }
}

fn wildcard_position(caps: &Captures<'_>) -> Wildcard {
    let part = |i: usize| caps.get(i).map(|m| m.as_str());
    if part(1).map_or(false, is_wildcard) {
        Wildcard::Major
    } else if part(2).map_or(false, is_wildcard) {
        Wildcard::Minor
    } else if part(3).map_or(false, is_wildcard) {
        Wildcard::Patch
    } else {
        Wildcard::None
    }
}

fn range_error(range: &str, reason: &str) -> SemverError {
    SemverError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn satisfies(version: &str, range: &str) -> bool {
        VersionParser::new().parse_range(range).unwrap().contains(&v(version))
    }

    #[test]
    fn test_parse_versions() {
        let parser = VersionParser::new();
        let version = parser.parse_version("1.2.3-rc.1+build.5").unwrap();
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert_eq!(version.pre, vec![Prerelease::Alpha("rc".into()), Prerelease::Numeric(1)]);
        assert_eq!(version.build, vec!["build".to_string(), "5".to_string()]);
    }

    #[test]
    fn test_parse_versions_fails() {
        let parser = VersionParser::new();
        for invalid in ["", "1", "1.2", "v1.2.3", "01.2.3", "1.2.3-", "1.2.3-01", "1.2.3+", " 1.2.3", "a.b.c"] {
            assert!(parser.parse_version(invalid).is_err(), "{:?} should be invalid", invalid);
        }
    }

    #[test]
    fn test_is_valid() {
        let parser = VersionParser::new();
        assert!(parser.is_valid("0.0.0"));
        assert!(parser.is_valid("1.0.0-alpha-a.b-c-somethinglong+build.1-aef.1-its-okay"));
        assert!(!parser.is_valid("99999999999999999999999.0.0"));
    }

    #[test]
    fn test_parse_range_simple() {
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(satisfies("1.2.3", "=1.2.3"));
        assert!(satisfies("1.2.3", "==1.2.3"));
        assert!(!satisfies("1.2.4", "1.2.3"));
        assert!(satisfies("1.2.4", "!1.2.3"));
        assert!(satisfies("1.2.4", "!=1.2.3"));
        assert!(satisfies("2.0.0", ">1.2.3"));
        assert!(!satisfies("1.2.3", "<1.2.3"));
        assert!(satisfies("1.2.3", "<=1.2.3"));
    }

    #[test]
    fn test_parse_range_spaced_operator() {
        assert!(satisfies("1.5.0", ">= 1.0.0 < 2.0.0"));
        assert!(!satisfies("2.0.0", ">= 1.0.0 < 2.0.0"));
    }

    #[test]
    fn test_parse_range_partial_versions() {
        assert!(satisfies("1.2.0", ">=1.2"));
        assert!(satisfies("1.0.0", "1"));
        assert!(!satisfies("1.0.1", "1"));
        assert!(satisfies("1.0.0", "v1.0.0"));
    }

    #[test]
    fn test_parse_range_wildcards() {
        assert!(satisfies("1.9.9", "1.x"));
        assert!(!satisfies("2.0.0", "1.x"));
        assert!(satisfies("1.2.9", "1.2.x"));
        assert!(!satisfies("1.3.0", "1.2.x"));
        assert!(satisfies("2.0.0", ">1.x"));
        assert!(!satisfies("1.9.0", ">1.x"));
        assert!(satisfies("1.0.0", ">=1.x"));
        assert!(satisfies("0.9.0", "<1.x"));
        assert!(!satisfies("1.0.0", "<1.x"));
        assert!(satisfies("1.2.9", "<=1.2.x"));
        assert!(!satisfies("1.3.0", "<=1.2.x"));
        assert!(satisfies("0.0.1", "*"));
        assert!(satisfies("7.0.0", "x"));
    }

    #[test]
    fn test_parse_range_disjunctive() {
        assert!(satisfies("0.5.0", "<1.0.0 || >=2.0.0 <3.0.0"));
        assert!(satisfies("2.5.0", "<1.0.0 || >=2.0.0 <3.0.0"));
        assert!(!satisfies("1.5.0", "<1.0.0 || >=2.0.0 <3.0.0"));
        assert!(satisfies("3.0.0", "1.x || 3.x"));
    }

    #[test]
    fn test_parse_range_fails() {
        let parser = VersionParser::new();
        for invalid in ["", "   ", "||", "1.0.0 ||", ">=", ">= >= 1.0.0", "~1.0.0", "^1.0.0", "!=1.x", ">*", "1.x-beta", "foo"] {
            assert!(parser.parse_range(invalid).is_err(), "{:?} should be invalid", invalid);
        }
    }

    #[test]
    fn test_range_error_message() {
        let err = VersionParser::new().parse_range(">=").unwrap_err();
        assert_eq!(err.to_string(), "Could not parse version range \">=\": dangling operator '>='");
    }
}
