//! SAT-based bundle resolver.
//!
//! Every candidate bundle is a boolean variable. Requirements, dependencies,
//! `olm.constraint` properties and upgrade rules become clauses, and a DPLL
//! search finds the preferred selection.
//!
//! # Architecture
//!
//! - [`Pool`]: The candidate bundles of one resolution, indexed by package and API
//! - [`Request`]: Requested packages and APIs plus the installed bundles
//! - [`RuleGenerator`]: Turns the pool and request into a [`RuleSet`]
//! - [`Formula`]: Constraint trees compiled to clauses (Tseitin encoding)
//! - [`Solver`]: Unit propagation and chronological backtracking
//! - [`Policy`]: Deterministic preference between candidates
//! - [`Resolver`]: Entry point, including failure explanations
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: One group of clauses per [`Reason`]
//! 2. **Unit Propagation**: Force decisions from unit clauses
//! 3. **Decision Making**: Satisfy the first open clause with the best candidate
//! 4. **Backtracking**: Flip the most recent decision on conflict
//! 5. **Minimization**: Search again under a shrinking bound on added packages
//! 6. **Explanation**: On failure, shrink the rule groups to a minimal
//!    unsatisfiable core and describe it as a [`ProblemSet`]
//!
//! # Example
//!
//! ```ignore
//! use olm_resolver::{Context, Request, Resolver, ResolverConfig, Snapshot};
//!
//! let snapshot = Snapshot::from_json(&catalog_bytes)?;
//! let mut request = Request::new();
//! request.require_version("etcd", ">=0.9.0");
//!
//! let resolver = Resolver::new(ResolverConfig::default());
//! match resolver.resolve(&Context::new(), &snapshot, &request) {
//!     Ok(selection) => println!("Selected {:?}", selection.names()),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

mod decisions;
mod formula;
mod policy;
mod pool;
mod problem;
mod request;
mod rule;
mod rule_generator;
mod rule_set;
mod selection;
#[allow(clippy::module_inception)]
mod solver;
mod watch_graph;


pub use decisions::Decisions;
pub use formula::{Encoded, Encoder, Formula};
pub use policy::Policy;
pub use pool::{Pool, VarId};
pub use problem::{Problem, ProblemSet};
pub use request::{PackageRequirement, Request};
pub use rule::{Literal, Reason, Rule, RuleType};
pub use rule_generator::{limit_added_packages, GeneratedRules, RuleGenerator};
pub use rule_set::RuleSet;
pub use selection::{Operation, Selection};
pub use solver::{Outcome, Resolver, Solver};
pub use watch_graph::WatchGraph;
