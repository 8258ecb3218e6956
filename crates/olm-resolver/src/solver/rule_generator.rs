use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use olm_semver::VersionRange;

use super::formula::{Encoder, Formula};
use super::pool::{Pool, VarId};
use super::request::Request;
use super::rule::{Literal, Reason, Rule, RuleType};
use super::rule_set::RuleSet;
use crate::bundle::{Bundle, Gvk};
use crate::config::{InvalidConstraintPolicy, ResolverConfig};
use crate::constraints::{Constraint, ConstraintKind};
use crate::error::{ResolverError, Result};

/// Rules of one resolution and the number of variables they use
#[derive(Debug)]
pub struct GeneratedRules {
    pub rules: RuleSet,
    /// Bundle variables followed by auxiliary ones
    pub num_vars: usize,
}

/// Generates SAT rules from the pool and a request.
///
/// Rules are emitted in a fixed order, which the search relies on:
/// - Root requirements: at least one matching bundle per requested package or API
/// - Installed packages: some bundle of each installed package stays selected
/// - Per bundle: package, API and label dependencies, then compiled constraints
/// - At most one bundle per package and one provider per required API,
///   guarded by the requirers for APIs the request does not name
/// - Prohibitions: bundles off the upgrade graph, deprecated bundles and
///   bundles with unparseable constraints
pub struct RuleGenerator<'a> {
    pool: &'a Pool,
    config: &'a ResolverConfig,
    rules: RuleSet,
    encoder: Encoder,
}

impl<'a> RuleGenerator<'a> {
    /// Create a new rule generator
    pub fn new(pool: &'a Pool, config: &'a ResolverConfig) -> Self {
        Self {
            pool,
            config,
            rules: RuleSet::new(),
            encoder: Encoder::new(pool.len() as VarId + 1),
        }
    }

    /// Generate all rules for a request
    pub fn generate(mut self, request: &Request) -> Result<GeneratedRules> {
        let start = std::time::Instant::now();

        self.add_root_require_rules(request)?;
        debug!("After root require rules: {} rules", self.rules.len());

        self.add_installed_rules();

        let pool = self.pool;
        for id in pool.ids() {
            if let Some(bundle) = pool.bundle(id) {
                self.add_bundle_rules(id, bundle)?;
            }
        }
        debug!("After bundle rules: {} rules", self.rules.len());

        self.add_same_package_conflict_rules();
        self.add_provider_conflict_rules(request);
        debug!("After conflict rules: {} rules", self.rules.len());

        self.add_upgrade_rules();
        self.add_deprecation_rules();

        let num_vars = (self.encoder.next_var() - 1) as usize;
        info!(
            "Generated {} rules in {} groups over {} bundles and {} auxiliary variables in {:?}",
            self.rules.len(),
            self.rules.group_count(),
            self.pool.len(),
            num_vars - self.pool.len(),
            start.elapsed()
        );
        debug!(
            "Rules by type: dependency={} constraint={} conflict={} cardinality={} prohibition={}",
            self.rules.count_by_type(RuleType::Dependency),
            self.rules.count_by_type(RuleType::Constraint),
            self.rules.count_by_type(RuleType::MultiConflict),
            self.rules.count_by_type(RuleType::Cardinality),
            self.rules.count_by_type(RuleType::Prohibition)
        );

        Ok(GeneratedRules {
            rules: self.rules,
            num_vars,
        })
    }

    /// Add a clause, dropping duplicate literals and tautologies
    fn add_clause(&mut self, literals: Vec<Literal>, rule_type: RuleType, group: u32) {
        let mut rule = Rule::new(literals, rule_type);
        if rule.normalize() {
            self.rules.add(rule, group);
        }
    }

    fn add_root_require_rules(&mut self, request: &Request) -> Result<()> {
        for (name, requirement) in &request.requires {
            let range = match &requirement.version_range {
                Some(range) => VersionRange::parse(range)
                    .map_err(|e| ResolverError::InvalidRequest(format!("package {}: {}", name, e)))?,
                None => VersionRange::any(),
            };

            let candidates = self.pool.what_provides(name, &range, requirement.channel.as_deref());
            if candidates.is_empty() {
                debug!("No candidates for required package {} {}", name, range);
            }

            let group = self.rules.add_group(Reason::Required {
                package: name.clone(),
                range: requirement.version_range.clone(),
                channel: requirement.channel.clone(),
            });
            self.add_clause(candidates, RuleType::Required, group);
        }

        for gvk in &request.required_apis {
            let group = self.rules.add_group(Reason::RequiredApi { gvk: gvk.clone() });
            self.add_clause(self.pool.providers(gvk).to_vec(), RuleType::RequiredApi, group);
        }

        Ok(())
    }

    fn add_installed_rules(&mut self) {
        let installed: Vec<(String, VarId)> = self
            .pool
            .installed()
            .map(|(package, id)| (package.to_string(), id))
            .collect();

        for (package, id) in installed {
            let bundle = self.pool.bundle(id).map(|b| b.name().to_string()).unwrap_or_default();
            let group = self.rules.add_group(Reason::Installed {
                package: package.clone(),
                bundle,
            });
            self.add_clause(self.pool.package_vars(&package).to_vec(), RuleType::Installed, group);
        }
    }

    fn add_bundle_rules(&mut self, id: VarId, bundle: &Bundle) -> Result<()> {
        for error in bundle.constraint_errors() {
            match self.config.invalid_constraint_policy {
                InvalidConstraintPolicy::Fail => {
                    return Err(ResolverError::InvalidConstraint {
                        bundle: bundle.name().to_string(),
                        source: error.clone(),
                    });
                }
                InvalidConstraintPolicy::ExcludeBundle => {
                    warn!("Excluding bundle {}: {}", bundle.name(), error);
                    let group = self.rules.add_group(Reason::Unparseable {
                        bundle: bundle.name().to_string(),
                        error: error.to_string(),
                    });
                    self.rules.add(Rule::prohibit(id), group);
                }
            }
        }

        for dependency in bundle.package_dependencies() {
            let candidates = self
                .pool
                .what_provides(&dependency.package_name, &dependency.version_range, None);
            let group = self.rules.add_group(Reason::Dependency {
                bundle: bundle.name().to_string(),
                package: dependency.package_name.clone(),
                range: dependency.version_range.to_string(),
            });
            self.add_clause(Rule::requires(id, &candidates).literals().to_vec(), RuleType::Dependency, group);
        }

        for gvk in bundle.required_gvks() {
            let group = self.rules.add_group(Reason::ApiDependency {
                bundle: bundle.name().to_string(),
                gvk: gvk.clone(),
            });
            let rule = Rule::requires(id, self.pool.providers(gvk));
            self.add_clause(rule.literals().to_vec(), RuleType::Dependency, group);
        }

        for label in bundle.label_dependencies() {
            let group = self.rules.add_group(Reason::LabelDependency {
                bundle: bundle.name().to_string(),
                label: label.clone(),
            });
            let rule = Rule::requires(id, self.pool.label_providers(label));
            self.add_clause(rule.literals().to_vec(), RuleType::Dependency, group);
        }

        for constraint in bundle.constraints() {
            let group = self.rules.add_group(Reason::Constraint {
                bundle: bundle.name().to_string(),
                message: constraint.message().to_string(),
                description: constraint.describe(),
            });
            let formula = self.compile(constraint);
            self.encoder.require_implied(id, formula);
            for clause in self.encoder.take_clauses() {
                self.add_clause(clause, RuleType::Constraint, group);
            }
        }

        Ok(())
    }

    /// Compile a constraint tree into a formula over bundle variables
    fn compile(&self, constraint: &Constraint) -> Formula {
        match constraint.kind() {
            ConstraintKind::Package(package) => {
                Formula::any_of(&self.pool.what_provides(&package.name, &package.version_range, None))
            }
            ConstraintKind::Gvk(gvk) => Formula::any_of(self.pool.providers(gvk)),
            ConstraintKind::All(children) => Formula::And(children.iter().map(|c| self.compile(c)).collect()),
            ConstraintKind::Any(children) => Formula::Or(children.iter().map(|c| self.compile(c)).collect()),
            ConstraintKind::None(children) => {
                Formula::And(children.iter().map(|c| self.compile(c).negate()).collect())
            }
        }
    }

    fn add_same_package_conflict_rules(&mut self) {
        let packages: Vec<String> = self.pool.packages().map(str::to_string).collect();
        for package in packages {
            let vars = self.pool.package_vars(&package);
            if vars.len() < 2 {
                continue;
            }
            let rule = Rule::multi_conflict(vars);
            let group = self.rules.add_group(Reason::AtMostOnePackage { package });
            self.rules.add(rule, group);
        }
    }

    /// A required API is provided by exactly one selected bundle.
    ///
    /// APIs named by the request get an unconditional conflict. APIs only
    /// required by bundles get one guarded by a "required" variable that
    /// each requiring bundle implies, so unselected requirers add nothing.
    fn add_provider_conflict_rules(&mut self, request: &Request) {
        let pool = self.pool;
        let requested: BTreeSet<&Gvk> = request.required_apis.iter().collect();

        for &gvk in &requested {
            let providers = pool.providers(gvk);
            if providers.len() < 2 {
                continue;
            }
            let group = self.rules.add_group(Reason::AtMostOneProvider { gvk: gvk.clone() });
            self.rules.add(Rule::multi_conflict(providers), group);
        }

        let mut requirers: BTreeMap<&Gvk, Vec<VarId>> = BTreeMap::new();
        for id in pool.ids() {
            let Some(bundle) = pool.bundle(id) else {
                continue;
            };
            for gvk in bundle.required_gvks() {
                if !requested.contains(gvk) {
                    requirers.entry(gvk).or_default().push(id);
                }
            }
        }

        for (gvk, bundles) in requirers {
            let providers = pool.providers(gvk);
            if providers.len() < 2 {
                continue;
            }
            let group = self.rules.add_group(Reason::AtMostOneProvider { gvk: gvk.clone() });
            let required = self.encoder.aux();
            for id in bundles {
                self.add_clause(vec![-id, required], RuleType::Cardinality, group);
            }
            self.encoder.at_most(Some(required), providers, 1);
            for clause in self.encoder.take_clauses() {
                self.add_clause(clause, RuleType::Cardinality, group);
            }
        }
    }

    /// Bundles of an installed package must be reachable from the installed bundle
    fn add_upgrade_rules(&mut self) {
        let installed: Vec<(String, VarId)> = self
            .pool
            .installed()
            .map(|(package, id)| (package.to_string(), id))
            .collect();

        for (package, installed_id) in installed {
            let Some(installed) = self.pool.bundle(installed_id) else {
                continue;
            };
            for &id in self.pool.package_vars(&package) {
                let Some(candidate) = self.pool.bundle(id) else {
                    continue;
                };
                if candidate.upgrade_edge_from(installed).is_some() {
                    continue;
                }
                debug!("Bundle {} is not an upgrade of {}", candidate.name(), installed.name());
                let group = self.rules.add_group(Reason::NotUpgradeable {
                    bundle: candidate.name().to_string(),
                    installed: installed.name().to_string(),
                });
                self.rules.add(Rule::prohibit(id), group);
            }
        }
    }

    fn add_deprecation_rules(&mut self) {
        if self.config.allow_deprecated {
            return;
        }

        for id in self.pool.ids() {
            let Some(bundle) = self.pool.bundle(id) else {
                continue;
            };
            if !bundle.is_deprecated() {
                continue;
            }
            let is_installed = self
                .pool
                .installed_bundle(bundle.package())
                .map_or(false, |installed| installed.name() == bundle.name());
            if is_installed {
                continue;
            }
            let group = self.rules.add_group(Reason::Deprecated {
                bundle: bundle.name().to_string(),
            });
            self.rules.add(Rule::prohibit(id), group);
        }
    }
}

/// Restrict `rules` to selections that add at most `limit` packages
/// beyond the installed ones.
///
/// A package counts as added when any of its bundles is selected. Returns
/// the variable count including the new auxiliaries.
pub fn limit_added_packages(pool: &Pool, rules: &mut RuleSet, num_vars: usize, limit: usize) -> usize {
    let mut encoder = Encoder::new(num_vars as VarId + 1);
    let mut clauses = Vec::new();
    let mut added = Vec::new();

    for package in pool.packages() {
        if pool.is_installed_package(package) {
            continue;
        }
        match pool.package_vars(package) {
            [] => {}
            [single] => added.push(*single),
            vars => {
                let selected = encoder.aux();
                clauses.extend(vars.iter().map(|&v| vec![-v, selected]));
                added.push(selected);
            }
        }
    }
    encoder.at_most(None, &added, limit);
    clauses.extend(encoder.take_clauses());

    let group = rules.add_group(Reason::AddedPackages { limit });
    for literals in clauses {
        let mut rule = Rule::new(literals, RuleType::Cardinality);
        if rule.normalize() {
            rules.add(rule, group);
        }
    }
    (encoder.next_var() - 1) as usize
}
