use super::pool::VarId;
use super::rule::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Assignment {
    value: bool,
    level: u32,
    /// Rule that forced the assignment; `None` for branch decisions
    rule: Option<u32>,
}

/// Partial assignment of the search, with its trail.
///
/// The trail lists assigned literals in assignment order, which is also
/// level order, so backtracking only ever pops from its end.
#[derive(Debug, Default)]
pub struct Decisions {
    assignments: Vec<Option<Assignment>>,
    trail: Vec<Literal>,
    level: u32,
}

impl Decisions {
    /// Create a tracker for variables `1..=num_vars`
    pub fn with_capacity(num_vars: usize) -> Self {
        Self {
            assignments: vec![None; num_vars + 1],
            trail: Vec::with_capacity(num_vars),
            level: 0,
        }
    }

    fn get(&self, var: VarId) -> Option<&Assignment> {
        self.assignments.get(var.unsigned_abs() as usize).and_then(Option::as_ref)
    }

    /// Current branch depth
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Open a new branch level
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Assign `literal` at the current level.
    ///
    /// Returns false when the variable already holds the opposite value;
    /// assigning an already true literal again is a no-op.
    pub fn decide(&mut self, literal: Literal, rule: Option<u32>) -> bool {
        let index = literal.unsigned_abs() as usize;
        if index >= self.assignments.len() {
            self.assignments.resize(index + 1, None);
        }

        if let Some(existing) = self.assignments[index] {
            return existing.value == (literal > 0);
        }

        self.assignments[index] = Some(Assignment {
            value: literal > 0,
            level: self.level,
            rule,
        });
        self.trail.push(literal);
        true
    }

    /// The literal is true under the assignment
    pub fn satisfied(&self, literal: Literal) -> bool {
        self.get(literal).is_some_and(|a| a.value == (literal > 0))
    }

    /// The literal is false under the assignment
    pub fn conflict(&self, literal: Literal) -> bool {
        self.get(literal).is_some_and(|a| a.value != (literal > 0))
    }

    pub fn undecided(&self, var: VarId) -> bool {
        self.get(var).is_none()
    }

    pub fn decided_true(&self, var: VarId) -> bool {
        self.get(var).is_some_and(|a| a.value)
    }

    /// Rule that forced the variable of `literal`
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        self.get(literal).and_then(|a| a.rule)
    }

    /// Undo every assignment made above `target_level`
    pub fn revert_to_level(&mut self, target_level: u32) {
        while let Some(&literal) = self.trail.last() {
            let index = literal.unsigned_abs() as usize;
            match self.assignments[index] {
                Some(a) if a.level > target_level => {
                    self.assignments[index] = None;
                    self.trail.pop();
                }
                _ => break,
            }
        }
        self.level = target_level;
    }

    /// Variables assigned true, ascending
    pub fn selected(&self) -> impl Iterator<Item = VarId> + '_ {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_some_and(|a| a.value))
            .map(|(var, _)| var as VarId)
    }

    /// Literal at a trail position
    pub fn literal_at(&self, index: usize) -> Option<Literal> {
        self.trail.get(index).copied()
    }

    /// Number of assigned variables
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }
}
