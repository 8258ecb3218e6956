use std::collections::BTreeSet;
use std::time::Instant;

use log::{debug, info, trace, warn};

use super::decisions::Decisions;
use super::policy::Policy;
use super::pool::{Pool, VarId};
use super::problem::{Problem, ProblemSet};
use super::request::Request;
use super::rule::{Literal, Reason};
use super::rule_generator::{limit_added_packages, RuleGenerator};
use super::rule_set::RuleSet;
use super::selection::Selection;
use super::watch_graph::WatchGraph;
use crate::config::ResolverConfig;
use crate::context::Context;
use crate::error::{ResolverError, Result};
use crate::snapshot::Snapshot;

/// Result of one search over the enabled rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Bundle variables selected by the first solution found
    Satisfiable(Vec<VarId>),
    Unsatisfiable,
}

/// A decision that can still be flipped
#[derive(Debug, Clone, Copy)]
struct Branch {
    literal: Literal,
    flipped: bool,
}

/// DPLL search over a rule set.
///
/// Unit propagation runs on a two-watched-literal graph built from the
/// enabled rules. Decisions follow the rule order and the [`Policy`]; on
/// conflict the most recent unflipped decision is flipped (chronological
/// backtracking), so the search is complete.
pub struct Solver<'a> {
    pool: &'a Pool,
    rules: &'a RuleSet,
    policy: Policy,
    num_vars: usize,
    max_iterations: u64,
}

impl<'a> Solver<'a> {
    /// Create a new solver
    pub fn new(pool: &'a Pool, rules: &'a RuleSet, num_vars: usize) -> Self {
        Self {
            pool,
            rules,
            policy: Policy::new(),
            num_vars,
            max_iterations: ResolverConfig::default().max_iterations,
        }
    }

    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    /// Search for a solution
    pub fn solve(&self, ctx: &Context) -> Result<Outcome> {
        let mut decisions = Decisions::with_capacity(self.num_vars);
        let mut watches = WatchGraph::from_rules(self.rules);

        // Level 0: assertions, then everything they force
        for rule in self.rules.enabled() {
            match rule.literals() {
                [] => {
                    trace!("Empty rule {:?}", rule);
                    return Ok(Outcome::Unsatisfiable);
                }
                [literal] => {
                    if !decisions.decide(*literal, Some(rule.id())) {
                        trace!("Conflicting assertion {:?}", rule);
                        return Ok(Outcome::Unsatisfiable);
                    }
                }
                _ => {}
            }
        }

        let mut propagated = 0;
        if self.propagate(&mut watches, &mut decisions, &mut propagated).is_err() {
            return Ok(Outcome::Unsatisfiable);
        }

        let mut branches: Vec<Branch> = Vec::new();
        let mut iterations = 0u64;

        loop {
            ctx.check()?;
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ResolverError::IterationLimit(self.max_iterations));
            }

            let Some(literal) = self.next_decision(&decisions)? else {
                let selected = decisions.selected().filter(|&v| self.pool.is_bundle(v)).collect();
                debug!("Solution found after {} iterations", iterations);
                return Ok(Outcome::Satisfiable(selected));
            };

            trace!("Deciding {} at level {}", literal, decisions.level() + 1);
            decisions.increment_level();
            decisions.decide(literal, None);
            branches.push(Branch {
                literal,
                flipped: false,
            });

            while let Err(conflict) = self.propagate(&mut watches, &mut decisions, &mut propagated) {
                trace!("Conflict on rule {:?}", self.rules.get(conflict));
                loop {
                    let Some(branch) = branches.pop() else {
                        return Ok(Outcome::Unsatisfiable);
                    };
                    decisions.revert_to_level(branches.len() as u32);
                    propagated = decisions.len();

                    if !branch.flipped {
                        iterations += 1;
                        decisions.increment_level();
                        decisions.decide(-branch.literal, None);
                        branches.push(Branch {
                            literal: -branch.literal,
                            flipped: true,
                        });
                        break;
                    }
                }
            }
        }
    }

    /// Propagate every queued decision; returns the conflicting rule
    fn propagate(&self, watches: &mut WatchGraph, decisions: &mut Decisions, index: &mut usize) -> std::result::Result<(), u32> {
        while let Some(literal) = decisions.literal_at(*index) {
            *index += 1;
            watches.propagate(literal, self.rules, decisions)?;
        }
        Ok(())
    }

    /// Choose the next literal to decide.
    ///
    /// The first rule (in generation order) that is not satisfied, whose
    /// negative literals are all false and that still has an undecided
    /// positive literal demands a selection: its best bundle by policy, or
    /// its first auxiliary literal. With no such rule, the lowest undecided
    /// variable is decided false.
    fn next_decision(&self, decisions: &Decisions) -> Result<Option<Literal>> {
        for rule in self.rules.enabled() {
            if rule.is_multi_conflict() || rule.literals().len() < 2 {
                continue;
            }

            let literals = rule.literals();
            if literals.iter().any(|&l| decisions.satisfied(l)) {
                continue;
            }
            if literals.iter().any(|&l| l < 0 && decisions.undecided(-l)) {
                continue;
            }

            let open: Vec<Literal> = literals
                .iter()
                .copied()
                .filter(|&l| l > 0 && decisions.undecided(l))
                .collect();
            if open.is_empty() {
                continue;
            }

            let bundles: Vec<VarId> = open.iter().copied().filter(|&l| self.pool.is_bundle(l)).collect();
            if let Some(best) = self.policy.select(self.pool, &bundles)? {
                return Ok(Some(best));
            }
            return Ok(open.first().copied());
        }

        Ok((1..=self.num_vars as VarId)
            .find(|&v| decisions.undecided(v))
            .map(|v| -v))
    }
}

/// Resolves requests against catalog snapshots.
///
/// A resolver only holds configuration; each call builds its own pool and
/// rules, so one resolver can serve concurrent resolutions over shared
/// snapshots.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Select one bundle per needed package.
    ///
    /// Among satisfying selections, the one adding the fewest packages wins;
    /// within that bound the search order prefers the highest versions.
    /// Fails with [`ResolverError::UnsatisfiableRequirement`] carrying the
    /// explanation when no selection satisfies every rule.
    pub fn resolve(&self, ctx: &Context, snapshot: &Snapshot, request: &Request) -> Result<Selection> {
        let start = Instant::now();
        ctx.check()?;

        let pool = Pool::new(snapshot, &request.installed);
        let generated = RuleGenerator::new(&pool, &self.config).generate(request)?;
        let mut rules = generated.rules;

        let outcome = self.search(ctx, &pool, &rules, generated.num_vars)?;
        match outcome {
            Outcome::Satisfiable(vars) => {
                let vars = self.minimize(ctx, &pool, &rules, generated.num_vars, vars)?;
                let mut selection = Selection::new();
                for var in vars {
                    if let Some(bundle) = pool.bundle(var) {
                        selection.insert(bundle.clone());
                    }
                }
                info!(
                    "Resolved {} bundles from {} candidates in {:?}",
                    selection.len(),
                    pool.len(),
                    start.elapsed()
                );
                Ok(selection)
            }
            Outcome::Unsatisfiable => {
                let problems = self.explain(ctx, &pool, &mut rules, generated.num_vars)?;
                info!(
                    "Resolution failed with {} problems in {:?}",
                    problems.len(),
                    start.elapsed()
                );
                Err(ResolverError::UnsatisfiableRequirement(problems))
            }
        }
    }

    fn search(&self, ctx: &Context, pool: &Pool, rules: &RuleSet, num_vars: usize) -> Result<Outcome> {
        Solver::new(pool, rules, num_vars)
            .with_max_iterations(self.config.max_iterations)
            .solve(ctx)
    }

    /// Search again under a shrinking bound on added packages until no
    /// selection fits; the last one found adds the fewest packages.
    fn minimize(
        &self,
        ctx: &Context,
        pool: &Pool,
        rules: &RuleSet,
        num_vars: usize,
        mut best: Vec<VarId>,
    ) -> Result<Vec<VarId>> {
        loop {
            let added = added_packages(pool, &best);
            if added == 0 {
                return Ok(best);
            }

            let mut bounded = rules.clone();
            let bounded_vars = limit_added_packages(pool, &mut bounded, num_vars, added - 1);
            match self.search(ctx, pool, &bounded, bounded_vars) {
                Ok(Outcome::Satisfiable(vars)) => {
                    debug!("Found a selection adding fewer than {} packages", added);
                    best = vars;
                }
                Ok(Outcome::Unsatisfiable) => {
                    debug!("No selection adds fewer than {} packages", added);
                    return Ok(best);
                }
                Err(ResolverError::IterationLimit(limit)) => {
                    warn!("Stopped minimizing after {} iterations, keeping {} added packages", limit, added);
                    return Ok(best);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reduce the rule groups to a minimal unsatisfiable core.
    ///
    /// Chunks of groups are disabled together; a chunk whose removal keeps
    /// the rules unsatisfiable stays removed, otherwise it is split in half
    /// and retried, down to single groups. Once the check budget is spent,
    /// remaining chunks are reported whole.
    fn explain(&self, ctx: &Context, pool: &Pool, rules: &mut RuleSet, num_vars: usize) -> Result<ProblemSet> {
        let groups: Vec<u32> = (0..rules.group_count() as u32).collect();

        let core = if self.config.explain {
            let mut core = Vec::new();
            let mut pending = vec![groups];
            let mut checks = 0;

            while let Some(chunk) = pending.pop() {
                if checks >= self.config.max_explanation_checks {
                    core.extend(chunk);
                    continue;
                }
                checks += 1;
                ctx.check()?;

                for &group in &chunk {
                    rules.disable_group(group);
                }
                let needed = match self.search(ctx, pool, rules, num_vars) {
                    Ok(Outcome::Unsatisfiable) => false,
                    Ok(Outcome::Satisfiable(_))
                    | Err(ResolverError::IterationLimit(_))
                    | Err(ResolverError::AmbiguousSelection { .. }) => true,
                    Err(e) => return Err(e),
                };
                if !needed {
                    continue;
                }

                for &group in &chunk {
                    rules.enable_group(group);
                }
                if chunk.len() == 1 {
                    core.extend(chunk);
                } else {
                    let (front, back) = chunk.split_at(chunk.len() / 2);
                    pending.push(back.to_vec());
                    pending.push(front.to_vec());
                }
            }

            debug!("Explanation used {} checks, core has {} groups", checks, core.len());
            core.sort_unstable();
            core
        } else {
            groups
                .into_iter()
                .filter(|&g| {
                    matches!(
                        rules.reason(g),
                        Some(Reason::Required { .. } | Reason::RequiredApi { .. } | Reason::Installed { .. })
                    )
                })
                .collect()
        };

        let mut problems = ProblemSet::new();
        for group in core {
            if let Some(reason) = rules.reason(group) {
                problems.add(Problem::new(reason.clone(), pool));
            }
        }
        Ok(problems)
    }
}

/// Number of distinct packages selected that are not installed
fn added_packages(pool: &Pool, vars: &[VarId]) -> usize {
    vars.iter()
        .filter_map(|&v| pool.bundle(v))
        .map(|bundle| bundle.package())
        .filter(|package| !pool.is_installed_package(package))
        .collect::<BTreeSet<_>>()
        .len()
}
