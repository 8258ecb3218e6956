//! Boolean constraints attached to bundles through `olm.constraint` properties.

#[allow(clippy::module_inception)]
mod constraint;
mod parser;

pub use constraint::{Constraint, ConstraintKind, PackageConstraint};
pub use parser::{parse, parse_value, MAX_CONSTRAINT_SIZE};
