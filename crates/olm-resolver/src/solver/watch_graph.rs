use super::decisions::Decisions;
use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched literals graph for unit propagation.
///
/// Each non-assertion rule watches two of its literals; the pair currently
/// watched is stored per rule. When a watched literal becomes false, the
/// watch moves to another literal that is not false. If there is none, the
/// rule is either unit (the other watch is forced) or in conflict.
///
/// Multi-conflict rules watch all of their literals: selecting any bundle
/// in them forces every other one off.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Maps literal index -> IDs of rules watching that literal
    watches: Vec<Vec<u32>>,

    /// Currently watched pair, indexed by rule ID
    watched: Vec<[Literal; 2]>,
}

impl WatchGraph {
    /// Convert literal to index (handles positive and negative literals)
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn watches_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from the enabled rules of a rule set
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self {
            watches: Vec::new(),
            watched: vec![[0, 0]; rules.len()],
        };

        for rule in rules.enabled() {
            graph.add_rule(rule);
        }

        graph
    }

    fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            // Assertions and empty rules are handled at level 0
            return;
        }

        let rule_id = rule.id();
        if rule.is_multi_conflict() {
            for &literal in literals {
                self.watches_mut(literal).push(rule_id);
            }
            return;
        }

        let pair = [literals[0], literals[1]];
        if let Some(slot) = self.watched.get_mut(rule_id as usize) {
            *slot = pair;
        }
        self.watches_mut(pair[0]).push(rule_id);
        self.watches_mut(pair[1]).push(rule_id);
    }

    /// IDs of rules watching a literal
    pub fn watching(&self, literal: Literal) -> &[u32] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Propagate a literal that was just decided true.
    ///
    /// Forced literals are decided right away (recording the forcing rule)
    /// and queued on `decisions` for their own propagation. Returns the ID
    /// of a rule whose literals are all false.
    pub fn propagate(&mut self, literal: Literal, rules: &RuleSet, decisions: &mut Decisions) -> Result<(), u32> {
        let false_literal = -literal;
        let idx = Self::literal_to_index(false_literal);
        if idx >= self.watches.len() {
            return Ok(());
        }

        let watching = std::mem::take(&mut self.watches[idx]);
        let mut keep = Vec::with_capacity(watching.len());
        let mut pending = watching.into_iter();

        while let Some(rule_id) = pending.next() {
            let Some(rule) = rules.get(rule_id) else {
                continue;
            };

            if rule.is_multi_conflict() {
                keep.push(rule_id);
                for &other in rule.literals() {
                    if other == false_literal || decisions.satisfied(other) {
                        continue;
                    }
                    if decisions.conflict(other) {
                        keep.extend(pending);
                        self.watches[idx].extend(keep);
                        return Err(rule_id);
                    }
                    decisions.decide(other, Some(rule_id));
                }
                continue;
            }

            let pair = self.watched[rule_id as usize];
            let other = if pair[0] == false_literal { pair[1] } else { pair[0] };

            if decisions.satisfied(other) {
                keep.push(rule_id);
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&l| l != pair[0] && l != pair[1] && !decisions.conflict(l));

            if let Some(replacement) = replacement {
                self.watched[rule_id as usize] = [other, replacement];
                self.watches_mut(replacement).push(rule_id);
                continue;
            }

            keep.push(rule_id);
            if decisions.conflict(other) {
                keep.extend(pending);
                self.watches[idx].extend(keep);
                return Err(rule_id);
            }
            decisions.decide(other, Some(rule_id));
        }

        self.watches[idx].extend(keep);
        Ok(())
    }
}
