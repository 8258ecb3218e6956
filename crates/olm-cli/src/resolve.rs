//! Resolve command - pick one bundle per package for a set of requirements.

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;
use console::style;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use olm_resolver::{
    Bundle, Context, Gvk, InvalidConstraintPolicy, Operation, PackageRequirement, Request, Resolver, ResolverError,
    Selection, Snapshot,
};
use olm_semver::VersionRange;

use crate::config::OlmConfig;
use crate::EXIT_INVALID;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Catalog snapshot (JSON array of bundle records, or {"bundles": [...]})
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Installed bundles (same format as the catalog)
    #[arg(long, value_name = "FILE")]
    pub installed: Option<PathBuf>,

    /// Required package, optionally with a version range and a channel
    #[arg(long, value_name = "PKG[@RANGE][#CHANNEL]", action = clap::ArgAction::Append)]
    pub require: Vec<String>,

    /// Required API, provided by exactly one selected bundle
    #[arg(long = "require-api", value_name = "GROUP/VERSION/KIND", action = clap::ArgAction::Append)]
    pub require_api: Vec<String>,

    /// Abort the resolution after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Allow deprecated bundles
    #[arg(long)]
    pub allow_deprecated: bool,

    /// Fail when a bundle carries an invalid constraint instead of excluding it
    #[arg(long)]
    pub strict_constraints: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `PKG[@RANGE][#CHANNEL]`
pub fn parse_requirement(arg: &str) -> Result<(String, PackageRequirement)> {
    let (rest, channel) = match arg.split_once('#') {
        Some((rest, channel)) if !channel.is_empty() => (rest, Some(channel.to_string())),
        Some(_) => bail!("Empty channel in requirement \"{}\"", arg),
        None => (arg, None),
    };

    let (name, version_range) = match rest.split_once('@') {
        Some((name, range)) => {
            VersionRange::parse(range).with_context(|| format!("Invalid version range in requirement \"{}\"", arg))?;
            (name, Some(range.to_string()))
        }
        None => (rest, None),
    };

    if name.is_empty() {
        bail!("Missing package name in requirement \"{}\"", arg);
    }

    Ok((name.to_string(), PackageRequirement { version_range, channel }))
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Snapshot::from_json(&bytes).with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Build the request. Errors here are invalid input.
fn build_request(args: &ResolveArgs, installed: Option<&Path>) -> Result<Request> {
    let mut request = Request::new();

    for arg in &args.require {
        let (name, requirement) = parse_requirement(arg)?;
        request.require_with(name, requirement);
    }

    for arg in &args.require_api {
        let gvk: Gvk = arg.parse().map_err(|e: String| anyhow!(e))?;
        request.require_api(gvk);
    }

    if let Some(path) = installed {
        let snapshot = read_snapshot(path)?;
        if let Some(rejected) = snapshot.rejected().first() {
            bail!("Invalid installed bundle {}: {}", rejected.name, rejected.error);
        }
        for bundle in snapshot.bundles() {
            request.add_installed(bundle.clone());
        }
    }

    Ok(request)
}

pub fn execute(args: ResolveArgs, config: Option<&OlmConfig>) -> Result<i32> {
    let catalog = args
        .catalog
        .clone()
        .or_else(|| config.and_then(OlmConfig::catalog))
        .ok_or_else(|| anyhow!("No catalog given; pass --catalog or set resolve.catalog in olm-resolve.toml"))?;
    let installed = args.installed.clone().or_else(|| config.and_then(OlmConfig::installed));

    let snapshot = match read_snapshot(&catalog) {
        Ok(snapshot) => snapshot,
        Err(e) => return invalid_input(&e),
    };
    for rejected in snapshot.rejected() {
        eprintln!("{} skipped {}: {}", style("Warning:").yellow(), rejected.name, rejected.error);
    }

    let request = match build_request(&args, installed.as_deref()) {
        Ok(request) => request,
        Err(e) => return invalid_input(&e),
    };

    let mut resolver_config = config.map(|c| c.resolver.clone()).unwrap_or_default();
    if args.allow_deprecated {
        resolver_config = resolver_config.allow_deprecated(true);
    }
    if args.strict_constraints {
        resolver_config = resolver_config.invalid_constraint_policy(InvalidConstraintPolicy::Fail);
    }

    let mut ctx = Context::new();
    if let Some(secs) = args.timeout.or_else(|| config.and_then(|c| c.resolve.timeout)) {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    log::info!(
        "Resolving {} packages and {} apis against {} bundles",
        request.requires.len(),
        request.required_apis.len(),
        snapshot.len()
    );

    match Resolver::new(resolver_config).resolve(&ctx, &snapshot, &request) {
        Ok(selection) => {
            print_selection(&selection, &request.installed, args.json)?;
            Ok(0)
        }
        Err(e @ ResolverError::UnsatisfiableRequirement(_))
        | Err(e @ ResolverError::AmbiguousSelection { .. })
        | Err(e @ ResolverError::InvalidConstraint { .. })
        | Err(e @ ResolverError::InvalidRequest(_)) => {
            print_failure(&e, args.json)?;
            Ok(EXIT_INVALID)
        }
        Err(e) => Err(e.into()),
    }
}

fn invalid_input(error: &anyhow::Error) -> Result<i32> {
    eprintln!("{} {:#}", style("Error:").red().bold(), error);
    Ok(EXIT_INVALID)
}

fn bundle_json(bundle: &Bundle) -> serde_json::Value {
    json!({
        "name": bundle.name(),
        "package": bundle.package(),
        "version": bundle.version().to_string(),
        "channel": bundle.channel(),
    })
}

fn print_selection(selection: &Selection, installed: &[Arc<Bundle>], as_json: bool) -> Result<()> {
    let operations = selection.operations(installed);

    if as_json {
        let operations: Vec<serde_json::Value> = operations
            .iter()
            .map(|op| match op {
                Operation::Install(bundle) => json!({"install": bundle.name()}),
                Operation::Upgrade { from, to } => json!({"upgrade": {"from": from.name(), "to": to.name()}}),
                Operation::Unchanged(bundle) => json!({"keep": bundle.name()}),
            })
            .collect();
        let output = json!({
            "selection": selection.bundles().map(|b| bundle_json(b)).collect::<Vec<_>>(),
            "operations": operations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if selection.is_empty() {
        println!("{} Nothing to select", style("Info:").cyan());
        return Ok(());
    }

    println!("{} {} bundles selected", style("Resolved:").green().bold(), selection.len());
    for op in &operations {
        let marker = match op {
            Operation::Install(_) => style("+").green(),
            Operation::Upgrade { .. } => style("^").cyan(),
            Operation::Unchanged(_) => style("=").dim(),
        };
        println!("  {} {}", marker, op);
    }
    Ok(())
}

fn print_failure(error: &ResolverError, as_json: bool) -> Result<()> {
    if as_json {
        let problems: Vec<&str> = error
            .problems()
            .map(|set| set.iter().map(|p| p.description()).collect())
            .unwrap_or_default();
        let output = json!({
            "error": error.to_string(),
            "problems": problems,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match error.problems() {
        Some(problems) => {
            eprintln!(
                "{} no bundle selection satisfies the requirements",
                style("Unsatisfiable:").red().bold()
            );
            for problem in problems.iter() {
                eprintln!("  {} {}", style("-").dim(), problem);
            }
        }
        None => eprintln!("{} {}", style("Error:").red().bold(), error),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {"csvName": "foo.v1", "packageName": "foo", "channelName": "stable", "version": "1.0.0"},
        {"csvName": "foo.v2", "packageName": "foo", "channelName": "stable", "version": "2.0.0", "replaces": "foo.v1"},
        {"csvName": "bar.v1", "packageName": "bar", "channelName": "stable", "version": "1.0.0",
         "providedApis": [{"group": "example.com", "version": "v1", "kind": "Bar"}]}
    ]"#;

    fn args(catalog: PathBuf) -> ResolveArgs {
        ResolveArgs {
            catalog: Some(catalog),
            installed: None,
            require: Vec::new(),
            require_api: Vec::new(),
            timeout: None,
            allow_deprecated: false,
            strict_constraints: false,
            json: true,
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_requirement() {
        let (name, req) = parse_requirement("foo").unwrap();
        assert_eq!(name, "foo");
        assert_eq!(req, PackageRequirement::default());

        let (name, req) = parse_requirement("foo@>=1.0.0 <2.0.0#stable").unwrap();
        assert_eq!(name, "foo");
        assert_eq!(req.version_range.as_deref(), Some(">=1.0.0 <2.0.0"));
        assert_eq!(req.channel.as_deref(), Some("stable"));

        let (_, req) = parse_requirement("foo#alpha").unwrap();
        assert_eq!(req.version_range, None);
        assert_eq!(req.channel.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_parse_requirement_errors() {
        assert!(parse_requirement("").is_err());
        assert!(parse_requirement("@1.0.0").is_err());
        assert!(parse_requirement("foo@not a range").is_err());
        assert!(parse_requirement("foo#").is_err());
    }

    #[test]
    fn test_resolve() {
        let dir = TempDir::new().unwrap();
        let mut args = args(write(&dir, "catalog.json", CATALOG));
        args.require = vec!["foo".to_string()];
        args.require_api = vec!["example.com/v1/Bar".to_string()];

        assert_eq!(execute(args, None).unwrap(), 0);
    }

    #[test]
    fn test_unsatisfiable_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let mut args = args(write(&dir, "catalog.json", CATALOG));
        args.require = vec!["foo@>=3.0.0".to_string()];

        assert_eq!(execute(args, None).unwrap(), EXIT_INVALID);
    }

    #[test]
    fn test_bad_input() {
        let dir = TempDir::new().unwrap();

        let mut bad_api = args(write(&dir, "catalog.json", CATALOG));
        bad_api.require_api = vec!["Bar".to_string()];
        assert_eq!(execute(bad_api, None).unwrap(), EXIT_INVALID);

        let broken = args(write(&dir, "broken.json", "{"));
        assert_eq!(execute(broken, None).unwrap(), EXIT_INVALID);

        let missing = args(dir.path().join("missing.json"));
        assert_eq!(execute(missing, None).unwrap(), EXIT_INVALID);
    }

    #[test]
    fn test_installed_and_config() {
        let dir = TempDir::new().unwrap();
        write(&dir, "catalog.json", CATALOG);
        write(
            &dir,
            "installed.json",
            r#"[{"csvName": "foo.v1", "packageName": "foo", "channelName": "stable", "version": "1.0.0"}]"#,
        );
        write(
            &dir,
            "olm-resolve.toml",
            "[resolve]\ncatalog = \"catalog.json\"\ninstalled = \"installed.json\"\ntimeout = 10\n",
        );
        let config = OlmConfig::load(dir.path()).unwrap().unwrap();

        let mut args = args(PathBuf::new());
        args.catalog = None;
        args.require = vec!["foo@>=2.0.0".to_string()];

        let installed = config.installed();
        let request = build_request(&args, installed.as_deref()).unwrap();
        assert_eq!(request.installed.len(), 1);
        assert_eq!(request.installed[0].name(), "foo.v1");

        assert_eq!(execute(args, Some(&config)).unwrap(), 0);
    }

    #[test]
    fn test_missing_catalog_is_an_error() {
        let mut args = args(PathBuf::new());
        args.catalog = None;
        assert!(execute(args, None).is_err());
    }
}
