//! Constraint documents: parsing limits, schema strictness and how the
//! resolver honors constraint semantics.

use olm_resolver::constraints::{self, ConstraintKind};
use olm_resolver::{
    BundleRecord, Constraint, ConstraintError, Context, Gvk, Property, Request, Resolver, ResolverError, Snapshot,
    MAX_CONSTRAINT_SIZE,
};
use olm_semver::{Version, VersionRange};
use proptest::prelude::*;

const PACKAGES: usize = 3;
const KINDS: usize = 4;

fn kind(i: usize) -> Gvk {
    Gvk::new("example.com", "v1", format!("Kind{}", i))
}

/// Packages p0..p2 at 1.0.0, where pN provides KindN. Kind3 has no provider.
fn leaf_catalog(app: Constraint) -> Snapshot {
    let mut records: Vec<BundleRecord> = (0..PACKAGES)
        .map(|i| BundleRecord::new(&format!("p{}.v1", i), &format!("p{}", i), "1.0.0").providing(kind(i)))
        .collect();
    records.push(
        BundleRecord::new("app.v1", "app", "1.0.0").with_property(Property::constraint(&app).unwrap()),
    );
    Snapshot::from_records(records)
}

/// Decide a leaf against the packages selected in `subset` (bit N is pN)
fn holds(constraint: &Constraint, subset: u32) -> bool {
    let one = Version::parse("1.0.0").unwrap();
    constraint.evaluate(&|leaf| match leaf.kind() {
        ConstraintKind::Package(p) => {
            let index = p.name.trim_start_matches('p').parse::<u32>().unwrap();
            subset & (1 << index) != 0 && p.version_range.contains(&one)
        }
        ConstraintKind::Gvk(gvk) => (0..PACKAGES).any(|i| subset & (1 << i) != 0 && *gvk == kind(i)),
        _ => unreachable!("only leaves are decided"),
    })
}

fn selected_subset(names: &[&str]) -> u32 {
    (0..PACKAGES)
        .filter(|i| names.contains(&format!("p{}.v1", i).as_str()))
        .fold(0, |acc, i| acc | (1 << i))
}

fn leaf() -> impl Strategy<Value = Constraint> {
    prop_oneof![
        (0..PACKAGES, any::<bool>()).prop_map(|(i, matching)| {
            let range = if matching { ">=1.0.0 <2.0.0" } else { ">=2.0.0" };
            Constraint::package(format!("p{}", i), VersionRange::parse(range).unwrap())
        }),
        (0..KINDS).prop_map(|i| Constraint::gvk(kind(i))),
    ]
}

fn tree() -> impl Strategy<Value = Constraint> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Constraint::all),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Constraint::any),
            prop::collection::vec(inner, 0..3).prop_map(Constraint::none),
        ]
    })
}

fn messaged_tree() -> impl Strategy<Value = Constraint> {
    let range = prop::sample::select(vec!["*", ">=1.2.3 <2.0.0", "<1.0.0 || >=3.0.0", "1.x", ">1.0.0 <=2.0.0"]);
    let leaf = prop_oneof![
        ("[a-z]{1,8}", range).prop_map(|(name, range)| Constraint::package(name, VersionRange::parse(range).unwrap())),
        ("[a-z.]{0,12}", "v[0-9]", "[A-Z][a-z]{0,6}").prop_map(|(g, v, k)| Constraint::gvk(Gvk::new(g, v, k))),
    ];
    let tree = leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Constraint::all),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Constraint::any),
            prop::collection::vec(inner, 0..4).prop_map(Constraint::none),
        ]
    });
    (tree, "[a-zA-Z ]{0,16}").prop_map(|(tree, message)| tree.with_message(message))
}

#[test]
fn test_size_limit_checked_before_decoding() {
    // Not even valid JSON; only the size is looked at
    let oversized = vec![b'{'; MAX_CONSTRAINT_SIZE + 1];
    match constraints::parse(&oversized) {
        Err(ConstraintError::MaxSizeExceeded { size, max }) => {
            assert_eq!(size, MAX_CONSTRAINT_SIZE + 1);
            assert_eq!(max, 131_072);
        }
        other => panic!("expected MaxSizeExceeded, got {:?}", other),
    }
}

#[test]
fn test_document_at_size_limit_is_decoded() {
    let message = "m".repeat(MAX_CONSTRAINT_SIZE - 64);
    let mut raw = format!(r#"{{"message":"{}","all":{{"constraints":[]}}}}"#, message).into_bytes();
    raw.resize(MAX_CONSTRAINT_SIZE, b' ');

    let constraint = constraints::parse(&raw).unwrap();
    assert_eq!(constraint.message().len(), MAX_CONSTRAINT_SIZE - 64);
}

#[test]
fn test_unknown_fields_at_any_depth() {
    let documents = [
        r#"{"extra": 1, "all": {"constraints": []}}"#,
        r#"{"all": {"constraints": [], "extra": 1}}"#,
        r#"{"any": {"constraints": [{"package": {"name": "foo", "versionRange": "*", "extra": 1}}]}}"#,
        r#"{"none": {"constraints": [{"all": {"constraints": [{"gvk": {"group": "g", "version": "v1", "kind": "K", "plural": "ks"}}]}}]}}"#,
    ];

    for document in documents {
        assert!(
            matches!(constraints::parse(document.as_bytes()), Err(ConstraintError::SchemaViolation(_))),
            "{} should be rejected",
            document
        );
    }
}

#[test]
fn test_payload_count() {
    assert!(matches!(
        constraints::parse(br#"{"message": "nothing here"}"#),
        Err(ConstraintError::SchemaViolation(_))
    ));
    assert!(matches!(
        constraints::parse(br#"{"all": {"constraints": []}, "any": {"constraints": []}}"#),
        Err(ConstraintError::SchemaViolation(_))
    ));
}

#[test]
fn test_invalid_constraint_rejects_bundle_by_default() {
    let record = BundleRecord::new("app.v1", "app", "1.0.0")
        .with_property(Property::new("olm.constraint", serde_json::json!({"bogus": true})));
    let bundle = olm_resolver::Bundle::from_record(record).unwrap();
    assert_eq!(bundle.constraint_errors().len(), 1);

    let snapshot = Snapshot::from_bundles(vec![bundle]);
    let mut request = Request::new();
    request.require("app");

    match Resolver::default().resolve(&Context::new(), &snapshot, &request) {
        Err(ResolverError::UnsatisfiableRequirement(problems)) => {
            assert!(problems.mentions("app.v1 has an invalid constraint"));
        }
        other => panic!("expected an unsatisfiable requirement, got {:?}", other),
    }
}

#[test]
fn test_empty_compounds_in_resolution() {
    for (constraint, satisfiable) in [
        (Constraint::all(vec![]), true),
        (Constraint::none(vec![]), true),
        (Constraint::any(vec![]), false),
    ] {
        let snapshot = leaf_catalog(constraint.clone());
        let mut request = Request::new();
        request.require("app");

        let result = Resolver::default().resolve(&Context::new(), &snapshot, &request);
        assert_eq!(result.is_ok(), satisfiable, "{}", constraint.describe());
        if let Ok(selection) = result {
            assert_eq!(selection.names(), vec!["app.v1"]);
        }
    }
}

proptest! {
    #[test]
    fn prop_json_round_trip(constraint in messaged_tree()) {
        let raw = serde_json::to_vec(&constraint).unwrap();
        prop_assert!(raw.len() <= MAX_CONSTRAINT_SIZE);
        let parsed = constraints::parse(&raw).unwrap();
        prop_assert_eq!(parsed, constraint);
    }

    #[test]
    fn prop_none_negates(constraint in tree(), subset in 0u32..(1 << PACKAGES)) {
        let negated = Constraint::none(vec![constraint.clone()]);
        prop_assert_eq!(holds(&negated, subset), !holds(&constraint, subset));
    }

    #[test]
    fn prop_resolver_honors_constraint(constraint in tree()) {
        let satisfiable = (0..(1u32 << PACKAGES)).any(|subset| holds(&constraint, subset));
        let fewest = (0..(1u32 << PACKAGES))
            .filter(|&subset| holds(&constraint, subset))
            .map(u32::count_ones)
            .min();

        let snapshot = leaf_catalog(constraint.clone());
        let mut request = Request::new();
        request.require("app");

        match Resolver::default().resolve(&Context::new(), &snapshot, &request) {
            Ok(selection) => {
                prop_assert!(satisfiable);
                prop_assert!(selection.contains("app.v1"));
                let selected = selected_subset(&selection.names());
                prop_assert!(holds(&constraint, selected));
                // No satisfying selection adds fewer packages
                prop_assert_eq!(Some(selected.count_ones()), fewest);
            }
            Err(ResolverError::UnsatisfiableRequirement(_)) => prop_assert!(!satisfiable),
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }

    #[test]
    fn prop_resolver_honors_negation(constraint in tree()) {
        let negated = Constraint::none(vec![constraint.clone()]);
        let satisfiable = (0..(1u32 << PACKAGES)).any(|subset| !holds(&constraint, subset));

        let snapshot = leaf_catalog(negated);
        let mut request = Request::new();
        request.require("app");

        match Resolver::default().resolve(&Context::new(), &snapshot, &request) {
            Ok(selection) => {
                prop_assert!(satisfiable);
                prop_assert!(!holds(&constraint, selected_subset(&selection.names())));
            }
            Err(ResolverError::UnsatisfiableRequirement(_)) => prop_assert!(!satisfiable),
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}
