//! Operator bundle constraint model and dependency resolver.
//!
//! Catalog bundles are loaded into an immutable [`Snapshot`]; a [`Resolver`]
//! turns a [`Request`] into a [`Selection`] of one bundle per package, honoring
//! API and package dependencies, `olm.constraint` properties and upgrade
//! edges from installed bundles.

pub mod bundle;
pub mod config;
pub mod constraints;
pub mod context;
pub mod error;
pub mod snapshot;
pub mod solver;

pub use bundle::{ApiKey, Bundle, BundleRecord, Gvk, Property, UpgradeEdge};
pub use config::{InvalidConstraintPolicy, ResolverConfig};
pub use constraints::{Constraint, ConstraintKind, PackageConstraint, MAX_CONSTRAINT_SIZE};
pub use context::Context;
pub use error::{BundleError, ConstraintError, ResolverError, Result};
pub use snapshot::{RejectedBundle, Snapshot};
pub use solver::{Operation, PackageRequirement, Problem, ProblemSet, Request, Resolver, Selection};
