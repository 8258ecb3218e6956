use std::fmt;

use super::pool::VarId;
use crate::bundle::Gvk;

/// A literal in SAT terms - positive means "select", negative means "don't select"
pub type Literal = i32;

/// Types of rules generated during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// A package named by the request
    Required,
    /// An API named by the request
    RequiredApi,
    /// An installed package must stay installed
    Installed,
    /// Bundle dependency: if A is selected, then B|C|D must be selected
    Dependency,
    /// Clause compiled from an `olm.constraint`
    Constraint,
    /// At most one of these bundles can be selected (n-ary conflict)
    MultiConflict,
    /// A bundle that must not be selected
    Prohibition,
    /// Clause of an at-most-k count over selections
    Cardinality,
}

impl RuleType {
    /// Check if this is a multi-conflict rule type
    pub fn is_multi_conflict(&self) -> bool {
        matches!(self, RuleType::MultiConflict)
    }
}

/// Why a rule exists; used to explain failures.
///
/// Every rule generated for the same purpose shares one reason (and one
/// group), so an explanation can switch them on and off together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Required {
        package: String,
        range: Option<String>,
        channel: Option<String>,
    },
    RequiredApi {
        gvk: Gvk,
    },
    Installed {
        package: String,
        bundle: String,
    },
    Dependency {
        bundle: String,
        package: String,
        range: String,
    },
    ApiDependency {
        bundle: String,
        gvk: Gvk,
    },
    LabelDependency {
        bundle: String,
        label: String,
    },
    Constraint {
        bundle: String,
        message: String,
        description: String,
    },
    AtMostOnePackage {
        package: String,
    },
    AtMostOneProvider {
        gvk: Gvk,
    },
    AddedPackages {
        limit: usize,
    },
    NotUpgradeable {
        bundle: String,
        installed: String,
    },
    Deprecated {
        bundle: String,
    },
    Unparseable {
        bundle: String,
        error: String,
    },
}

/// A SAT rule (clause).
///
/// Rules are disjunctions (OR) of literals. A rule is satisfied when
/// at least one of its literals is true.
///
/// # Examples
///
/// - `[A]` - bundle A must be selected (assertion)
/// - `[-A]` - bundle A must not be selected
/// - `[-A, B, C]` - if A is selected, then B or C must be selected
/// - `[]` - unsatisfiable
///
/// A multi-conflict rule `[-A, -B, -C]` means at most one of A, B, C.
#[derive(Clone, PartialEq, Eq)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    /// Assigned by RuleSet
    id: u32,
    /// Reason group, assigned by RuleSet
    group: u32,
    disabled: bool,
}

impl Rule {
    /// Create a new rule with the given literals
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            group: 0,
            disabled: false,
        }
    }

    /// Create an assertion rule (single literal that must be true)
    pub fn assertion(literal: Literal, rule_type: RuleType) -> Self {
        Self::new(vec![literal], rule_type)
    }

    /// If source is selected, one of targets must be.
    /// With no targets this prohibits the source.
    pub fn requires(source: VarId, targets: &[VarId]) -> Self {
        let mut literals = Vec::with_capacity(targets.len() + 1);
        literals.push(-source);
        literals.extend_from_slice(targets);
        Self::new(literals, RuleType::Dependency)
    }

    /// At most one of these bundles can be selected.
    /// The rule watches all literals and triggers when any becomes true.
    pub fn multi_conflict(vars: &[VarId]) -> Self {
        Self::new(vars.iter().map(|&v| -v).collect(), RuleType::MultiConflict)
    }

    /// The bundle must not be selected
    pub fn prohibit(var: VarId) -> Self {
        Self::assertion(-var, RuleType::Prohibition)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_group(&mut self, group: u32) {
        self.group = group;
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_multi_conflict(&self) -> bool {
        self.rule_type.is_multi_conflict()
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Remove duplicate literals, keeping the first occurrence.
    ///
    /// Returns false if the rule contains a literal and its negation, in
    /// which case it is always satisfied.
    pub fn normalize(&mut self) -> bool {
        let mut seen: Vec<Literal> = Vec::with_capacity(self.literals.len());
        for &literal in &self.literals {
            if seen.contains(&-literal) {
                return false;
            }
            if !seen.contains(&literal) {
                seen.push(literal);
            }
        }
        self.literals = seen;
        true
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule#{}({:?}, {:?}", self.id, self.rule_type, self.literals)?;
        if self.disabled {
            write!(f, ", disabled")?;
        }
        write!(f, ")")
    }
}
