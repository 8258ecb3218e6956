use super::rule::{Reason, Rule, RuleType};

/// Collection of SAT rules, grouped by the reason they were generated for.
///
/// Rule IDs follow generation order, which the solver relies on when
/// choosing what to decide next.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// All rules indexed by ID
    rules: Vec<Rule>,

    /// Reason of each group, indexed by group ID
    reasons: Vec<Reason>,

    /// Rule IDs of each group
    groups: Vec<Vec<u32>>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new group of rules sharing a reason, returning its ID
    pub fn add_group(&mut self, reason: Reason) -> u32 {
        let id = self.reasons.len() as u32;
        self.reasons.push(reason);
        self.groups.push(Vec::new());
        id
    }

    /// Add a rule to a group, returning its ID
    pub fn add(&mut self, mut rule: Rule, group: u32) -> u32 {
        let id = self.rules.len() as u32;
        rule.set_id(id);
        rule.set_group(group);
        if let Some(members) = self.groups.get_mut(group as usize) {
            members.push(id);
        }
        self.rules.push(rule);
        id
    }

    /// Get a rule by ID
    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    /// All rules in generation order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Enabled rules in generation order
    pub fn enabled(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_enabled())
    }

    /// Get the total number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the rule set is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Count rules by type
    pub fn count_by_type(&self, rule_type: RuleType) -> usize {
        self.rules.iter().filter(|r| r.rule_type() == rule_type).count()
    }

    /// Number of groups
    pub fn group_count(&self) -> usize {
        self.reasons.len()
    }

    /// The reason shared by a group
    pub fn reason(&self, group: u32) -> Option<&Reason> {
        self.reasons.get(group as usize)
    }

    /// IDs of the rules in a group
    pub fn group_rules(&self, group: u32) -> &[u32] {
        self.groups.get(group as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if a group has any enabled rule
    pub fn is_group_enabled(&self, group: u32) -> bool {
        self.group_rules(group)
            .iter()
            .any(|&id| self.get(id).map_or(false, Rule::is_enabled))
    }

    /// Disable every rule of a group
    pub fn disable_group(&mut self, group: u32) {
        self.set_group_enabled(group, false);
    }

    /// Enable every rule of a group
    pub fn enable_group(&mut self, group: u32) {
        self.set_group_enabled(group, true);
    }

    fn set_group_enabled(&mut self, group: u32, enabled: bool) {
        let Some(members) = self.groups.get(group as usize) else {
            return;
        };
        for &id in members {
            if let Some(rule) = self.rules.get_mut(id as usize) {
                if enabled {
                    rule.enable();
                } else {
                    rule.disable();
                }
            }
        }
    }
}
