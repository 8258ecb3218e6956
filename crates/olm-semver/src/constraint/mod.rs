//! Constraint types for version matching

#[allow(clippy::module_inception)]
mod constraint;
mod operator;
mod range;

pub use constraint::Constraint;
pub use operator::{InvalidOperatorError, Operator};
pub use range::VersionRange;
