use olm_semver::SemverError;
use thiserror::Error;

use crate::solver::ProblemSet;

/// Errors produced while parsing an `olm.constraint` document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("constraint document is {size} bytes, exceeding the maximum of {max} bytes")]
    MaxSizeExceeded { size: usize, max: usize },

    #[error("constraint document does not match the schema: {0}")]
    SchemaViolation(String),
}

/// Errors produced while turning a catalog record into a [`crate::Bundle`]
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Bundle has no version and no olm.package property")]
    MissingVersion,

    #[error("Invalid bundle version \"{version}\": {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: SemverError,
    },

    #[error("Invalid skipRange \"{range}\": {source}")]
    InvalidSkipRange {
        range: String,
        #[source]
        source: SemverError,
    },

    #[error("Invalid {property_type} value: {reason}")]
    InvalidProperty { property_type: String, reason: String },

    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced by a resolution attempt
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("{0}")]
    UnsatisfiableRequirement(ProblemSet),

    #[error("Ambiguous selection for package {package}: {first} and {second} are equally preferred")]
    AmbiguousSelection {
        package: String,
        first: String,
        second: String,
    },

    #[error("Bundle {bundle} has an invalid constraint: {source}")]
    InvalidConstraint {
        bundle: String,
        #[source]
        source: ConstraintError,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resolution was cancelled")]
    Cancelled,

    #[error("Resolution deadline exceeded")]
    DeadlineExceeded,

    #[error("Resolution exceeded the limit of {0} search iterations")]
    IterationLimit(u64),
}

impl ResolverError {
    /// Problems explaining an unsatisfiable resolution, if this is one
    pub fn problems(&self) -> Option<&ProblemSet> {
        match self {
            ResolverError::UnsatisfiableRequirement(problems) => Some(problems),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
