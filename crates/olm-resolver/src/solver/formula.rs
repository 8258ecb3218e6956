//! Propositional formulas and their clause encoding.
//!
//! Constraint trees compile to a [`Formula`] over bundle variables. The
//! [`Encoder`] turns formulas into CNF clauses with the Tseitin
//! transformation, introducing one auxiliary variable per compound node, so
//! nothing here depends on the search engine.

use super::pool::VarId;
use super::rule::Literal;

/// A propositional formula over solver variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Var(VarId),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Const(bool),
}

impl Formula {
    /// Disjunction of variables; false when empty
    pub fn any_of(vars: &[VarId]) -> Formula {
        Formula::Or(vars.iter().map(|&v| Formula::Var(v)).collect())
    }

    pub fn negate(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    /// Evaluate under an assignment of variables
    pub fn evaluate(&self, assignment: &dyn Fn(VarId) -> bool) -> bool {
        match self {
            Formula::Var(v) => assignment(*v),
            Formula::Not(f) => !f.evaluate(assignment),
            Formula::And(fs) => fs.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(fs) => fs.iter().any(|f| f.evaluate(assignment)),
            Formula::Const(b) => *b,
        }
    }

    /// Simplify: propagate constants, remove double negation, flatten nested
    /// AND/OR and unwrap single-child compounds.
    pub fn fold(self) -> Formula {
        match self {
            Formula::Var(_) | Formula::Const(_) => self,
            Formula::Not(inner) => match inner.fold() {
                Formula::Const(b) => Formula::Const(!b),
                Formula::Not(f) => *f,
                other => other.negate(),
            },
            Formula::And(children) => Self::fold_compound(children, true),
            Formula::Or(children) => Self::fold_compound(children, false),
        }
    }

    /// `identity` is the neutral constant: true for AND, false for OR
    fn fold_compound(children: Vec<Formula>, identity: bool) -> Formula {
        let mut folded = Vec::with_capacity(children.len());
        for child in children {
            match child.fold() {
                Formula::Const(b) if b == identity => {}
                Formula::Const(_) => return Formula::Const(!identity),
                Formula::And(grandchildren) if identity => folded.extend(grandchildren),
                Formula::Or(grandchildren) if !identity => folded.extend(grandchildren),
                other => {
                    if !folded.contains(&other) {
                        folded.push(other);
                    }
                }
            }
        }

        match folded.len() {
            0 => Formula::Const(identity),
            1 => folded.pop().unwrap_or(Formula::Const(identity)),
            _ if identity => Formula::And(folded),
            _ => Formula::Or(folded),
        }
    }
}

/// Result of encoding a sub-formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    Const(bool),
    Literal(Literal),
}

/// Tseitin encoder producing clauses and auxiliary variables
#[derive(Debug)]
pub struct Encoder {
    next_var: VarId,
    clauses: Vec<Vec<Literal>>,
}

impl Encoder {
    /// Auxiliary variables are allocated from `first_aux` upwards
    pub fn new(first_aux: VarId) -> Self {
        Self {
            next_var: first_aux,
            clauses: Vec::new(),
        }
    }

    /// The next auxiliary variable that would be allocated
    pub fn next_var(&self) -> VarId {
        self.next_var
    }

    /// Clauses produced since the last call
    pub fn take_clauses(&mut self) -> Vec<Vec<Literal>> {
        std::mem::take(&mut self.clauses)
    }

    /// Allocate a fresh auxiliary variable
    pub fn aux(&mut self) -> VarId {
        let var = self.next_var;
        self.next_var += 1;
        var
    }

    /// Encode a formula, returning a literal equivalent to it
    pub fn encode(&mut self, formula: &Formula) -> Encoded {
        match formula {
            Formula::Const(b) => Encoded::Const(*b),
            Formula::Var(v) => Encoded::Literal(*v),
            Formula::Not(inner) => match self.encode(inner) {
                Encoded::Const(b) => Encoded::Const(!b),
                Encoded::Literal(l) => Encoded::Literal(-l),
            },
            Formula::And(children) => self.encode_compound(children, true),
            Formula::Or(children) => self.encode_compound(children, false),
        }
    }

    fn encode_compound(&mut self, children: &[Formula], is_and: bool) -> Encoded {
        let mut literals = Vec::with_capacity(children.len());
        for child in children {
            match self.encode(child) {
                Encoded::Const(b) if b == is_and => {}
                Encoded::Const(_) => return Encoded::Const(!is_and),
                Encoded::Literal(l) => literals.push(l),
            }
        }

        match literals.as_slice() {
            [] => Encoded::Const(is_and),
            [single] => Encoded::Literal(*single),
            _ => {
                let x = self.aux();
                if is_and {
                    // x -> every child, all children -> x
                    for &l in &literals {
                        self.clauses.push(vec![-x, l]);
                    }
                    let mut back = vec![x];
                    back.extend(literals.iter().map(|&l| -l));
                    self.clauses.push(back);
                } else {
                    // x -> some child, any child -> x
                    let mut forward = vec![-x];
                    forward.extend_from_slice(&literals);
                    self.clauses.push(forward);
                    for &l in &literals {
                        self.clauses.push(vec![x, -l]);
                    }
                }
                Encoded::Literal(x)
            }
        }
    }

    /// Emit clauses for `guard -> formula`.
    ///
    /// Top-level conjunctions become one clause per child and top-level
    /// disjunctions a single clause, so common shapes need no auxiliary
    /// variables.
    pub fn require_implied(&mut self, guard: Literal, formula: Formula) {
        match formula.fold() {
            Formula::Const(true) => {}
            Formula::Const(false) => self.clauses.push(vec![-guard]),
            Formula::And(children) => {
                for child in children {
                    self.require_implied(guard, child);
                }
            }
            Formula::Or(children) => {
                let mut clause = vec![-guard];
                for child in &children {
                    match self.encode(child) {
                        Encoded::Const(true) => return,
                        Encoded::Const(false) => {}
                        Encoded::Literal(l) => clause.push(l),
                    }
                }
                self.clauses.push(clause);
            }
            other => match self.encode(&other) {
                Encoded::Const(true) => {}
                Encoded::Const(false) => self.clauses.push(vec![-guard]),
                Encoded::Literal(l) => self.clauses.push(vec![-guard, l]),
            },
        }
    }

    /// Emit clauses for `guard -> at most k of literals`, or unconditionally
    /// without a guard.
    ///
    /// Uses a sequential counter: `counts[i][j]` is forced true once more
    /// than `j` of the first `i + 1` literals hold.
    pub fn at_most(&mut self, guard: Option<Literal>, literals: &[Literal], k: usize) {
        let n = literals.len();
        if n <= k {
            return;
        }
        if k == 0 {
            for &l in literals {
                self.push_guarded(guard, vec![-l]);
            }
            return;
        }

        let counts: Vec<Vec<VarId>> = (0..n - 1).map(|_| (0..k).map(|_| self.aux()).collect()).collect();
        for (i, &x) in literals.iter().enumerate() {
            if i + 1 < n {
                self.push_guarded(guard, vec![-x, counts[i][0]]);
            }
            if i == 0 {
                continue;
            }
            let previous = &counts[i - 1];
            if i + 1 < n {
                for j in 0..k {
                    self.push_guarded(guard, vec![-previous[j], counts[i][j]]);
                }
                for j in 1..k {
                    self.push_guarded(guard, vec![-x, -previous[j - 1], counts[i][j]]);
                }
            }
            // one more would exceed k
            self.push_guarded(guard, vec![-x, -previous[k - 1]]);
        }
    }

    fn push_guarded(&mut self, guard: Option<Literal>, mut clause: Vec<Literal>) {
        if let Some(guard) = guard {
            clause.insert(0, -guard);
        }
        self.clauses.push(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(v: VarId) -> Formula {
        Formula::Var(v)
    }

    /// Check that `guard -> formula` is exactly what the clauses express:
    /// for every assignment of the base variables with the guard set, some
    /// assignment of the auxiliaries satisfies the clauses iff the formula
    /// holds.
    fn assert_equivalent(formula: Formula, base_vars: VarId) {
        let guard = base_vars + 1;
        let mut encoder = Encoder::new(guard + 1);
        encoder.require_implied(guard, formula.clone());
        let aux_count = encoder.next_var() - guard - 1;
        let clauses = encoder.take_clauses();

        for base in 0..(1u32 << base_vars) {
            let expected = formula.evaluate(&|v| base & (1 << (v - 1)) != 0);
            let satisfiable = (0..(1u32 << aux_count)).any(|aux| {
                let value = |v: VarId| {
                    if v <= base_vars {
                        base & (1 << (v - 1)) != 0
                    } else if v == guard {
                        true
                    } else {
                        aux & (1 << (v - guard - 1)) != 0
                    }
                };
                clauses
                    .iter()
                    .all(|clause| clause.iter().any(|&l| value(l.abs()) == (l > 0)))
            });
            assert_eq!(satisfiable, expected, "assignment {:b} of {:?}", base, formula);
        }
    }

    #[test]
    fn test_fold_constants() {
        assert_eq!(Formula::And(vec![]).fold(), Formula::Const(true));
        assert_eq!(Formula::Or(vec![]).fold(), Formula::Const(false));
        assert_eq!(Formula::Or(vec![]).negate().fold(), Formula::Const(true));
        assert_eq!(Formula::And(vec![var(1), Formula::Const(false)]).fold(), Formula::Const(false));
        assert_eq!(Formula::Or(vec![var(1), Formula::Const(true)]).fold(), Formula::Const(true));
        assert_eq!(Formula::And(vec![var(1), Formula::Const(true)]).fold(), var(1));
    }

    #[test]
    fn test_fold_flattens() {
        let nested = Formula::Or(vec![Formula::Or(vec![var(1), var(2)]), var(3), var(1)]);
        assert_eq!(nested.fold(), Formula::Or(vec![var(1), var(2), var(3)]));
        assert_eq!(var(1).negate().negate().fold(), var(1));
    }

    #[test]
    fn test_implied_disjunction_needs_no_aux() {
        let mut encoder = Encoder::new(10);
        encoder.require_implied(5, Formula::any_of(&[1, 2]));
        assert_eq!(encoder.take_clauses(), vec![vec![-5, 1, 2]]);
        assert_eq!(encoder.next_var(), 10);
    }

    #[test]
    fn test_implied_constants() {
        let mut encoder = Encoder::new(10);
        encoder.require_implied(5, Formula::any_of(&[]));
        encoder.require_implied(6, Formula::And(vec![]));
        assert_eq!(encoder.take_clauses(), vec![vec![-5]]);
    }

    #[test]
    fn test_implied_negation() {
        let mut encoder = Encoder::new(10);
        encoder.require_implied(5, Formula::any_of(&[1, 2]).negate());
        let clauses = encoder.take_clauses();
        // One auxiliary for the OR, then the guard forbids it
        assert_eq!(encoder.next_var(), 11);
        assert!(clauses.contains(&vec![-5, -10]));
        assert!(clauses.contains(&vec![-10, 1, 2]));
        assert!(clauses.contains(&vec![10, -1]));
        assert!(clauses.contains(&vec![10, -2]));
    }

    #[test]
    fn test_encoding_is_equivalent() {
        assert_equivalent(Formula::any_of(&[1, 2]), 3);
        assert_equivalent(Formula::any_of(&[1, 2]).negate(), 3);
        assert_equivalent(Formula::And(vec![var(1), var(2).negate()]), 3);
        assert_equivalent(
            Formula::Or(vec![Formula::And(vec![var(1), var(2)]), Formula::And(vec![var(2), var(3)]).negate()]),
            3,
        );
        assert_equivalent(
            Formula::And(vec![
                Formula::Or(vec![var(1), var(3)]).negate(),
                Formula::Or(vec![Formula::any_of(&[]), var(2)]),
            ])
            .negate(),
            3,
        );
    }

    #[test]
    fn test_at_most_counts() {
        for n in 1..=4 as VarId {
            let literals: Vec<Literal> = (1..=n).collect();
            for k in 0..=n as usize {
                let guard = n + 1;
                let mut encoder = Encoder::new(guard + 1);
                encoder.at_most(Some(guard), &literals, k);
                let aux_count = encoder.next_var() - guard - 1;
                let clauses = encoder.take_clauses();

                for base in 0..(1u32 << n) {
                    for guarded in [false, true] {
                        let satisfiable = (0..(1u32 << aux_count)).any(|aux| {
                            let value = |v: VarId| {
                                if v <= n {
                                    base & (1 << (v - 1)) != 0
                                } else if v == guard {
                                    guarded
                                } else {
                                    aux & (1 << (v - guard - 1)) != 0
                                }
                            };
                            clauses
                                .iter()
                                .all(|clause| clause.iter().any(|&l| value(l.abs()) == (l > 0)))
                        });
                        let expected = !guarded || base.count_ones() as usize <= k;
                        assert_eq!(satisfiable, expected, "at most {} of {:b}, guard {}", k, base, guarded);
                    }
                }
            }
        }
    }

    #[test]
    fn test_at_most_zero_forbids_all() {
        let mut encoder = Encoder::new(10);
        encoder.at_most(None, &[1, 2], 0);
        assert_eq!(encoder.take_clauses(), vec![vec![-1], vec![-2]]);
        assert_eq!(encoder.next_var(), 10);
    }
}
