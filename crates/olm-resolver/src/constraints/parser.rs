use log::debug;

use super::Constraint;
use crate::error::ConstraintError;

/// Maximum accepted size of one serialized constraint document, in bytes.
///
/// Nesting depth is not limited by the schema, so this ceiling is what bounds
/// it. Catalogs depend on the value; do not change it.
pub const MAX_CONSTRAINT_SIZE: usize = 2 << 16;

/// Parse a raw `olm.constraint` JSON document.
///
/// Documents over [`MAX_CONSTRAINT_SIZE`] are rejected before decoding.
/// Unknown fields at any depth, malformed shapes, nodes with zero or several
/// payloads and trailing data are schema violations. serde_json's own
/// recursion limit also applies.
pub fn parse(raw: &[u8]) -> Result<Constraint, ConstraintError> {
    if raw.len() > MAX_CONSTRAINT_SIZE {
        return Err(ConstraintError::MaxSizeExceeded {
            size: raw.len(),
            max: MAX_CONSTRAINT_SIZE,
        });
    }

    serde_json::from_slice(raw).map_err(|e| {
        debug!("Rejected constraint document: {}", e);
        ConstraintError::SchemaViolation(e.to_string())
    })
}

/// Parse a constraint held as an already decoded JSON value.
///
/// The value is re-serialized first so the size ceiling applies to it too.
pub fn parse_value(value: &serde_json::Value) -> Result<Constraint, ConstraintError> {
    let raw = serde_json::to_vec(value).map_err(|e| ConstraintError::SchemaViolation(e.to_string()))?;
    parse(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintKind;

    #[test]
    fn test_parse_nested() {
        let raw = br#"{
            "message": "requires foo or the Kind api",
            "any": {"constraints": [
                {"package": {"name": "foo", "versionRange": ">=1.0.0 <2.0.0"}},
                {"none": {"constraints": [{"gvk": {"group": "g1", "version": "v1", "kind": "Kind"}}]}}
            ]}
        }"#;
        let constraint = parse(raw).unwrap();
        assert_eq!(constraint.message(), "requires foo or the Kind api");
        match constraint.kind() {
            ConstraintKind::Any(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1].kind(), ConstraintKind::None(inner) if inner.len() == 1));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_size_limit_boundary() {
        // Pad with whitespace so the document stays valid JSON
        let body = br#"{"all":{"constraints":[]}}"#;
        let mut at_limit = vec![b' '; MAX_CONSTRAINT_SIZE - body.len()];
        at_limit.extend_from_slice(body);
        assert_eq!(at_limit.len(), MAX_CONSTRAINT_SIZE);
        assert!(parse(&at_limit).is_ok());

        at_limit.insert(0, b' ');
        assert_eq!(
            parse(&at_limit),
            Err(ConstraintError::MaxSizeExceeded {
                size: MAX_CONSTRAINT_SIZE + 1,
                max: MAX_CONSTRAINT_SIZE
            })
        );
    }

    #[test]
    fn test_oversized_garbage_is_not_decoded() {
        let raw = vec![b'{'; MAX_CONSTRAINT_SIZE + 10];
        assert!(matches!(parse(&raw), Err(ConstraintError::MaxSizeExceeded { .. })));
    }

    #[test]
    fn test_unknown_fields() {
        for raw in [
            r#"{"message":"m","bogus":1,"all":{"constraints":[]}}"#,
            r#"{"package":{"name":"foo","versionRange":"*","extra":true}}"#,
            r#"{"gvk":{"group":"g","version":"v","kind":"K","plural":"ks"}}"#,
            r#"{"all":{"constraints":[],"op":"and"}}"#,
            r#"{"any":{"constraints":[{"none":{"constraints":[{"message":"x","unknown":{}}]}}]}}"#,
        ] {
            assert!(
                matches!(parse(raw.as_bytes()), Err(ConstraintError::SchemaViolation(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_malformed_shapes() {
        for raw in [
            "",
            "[]",
            "null",
            r#"{"all":[]}"#,
            r#"{"package":{"name":"foo"}}"#,
            r#"{"package":{"name":"foo","versionRange":"not a range"}}"#,
            r#"{"gvk":{"group":"g","version":"v"}}"#,
            r#"{"message":5,"all":{"constraints":[]}}"#,
            r#"{"all":{"constraints":[]}} {"all":{"constraints":[]}}"#,
        ] {
            assert!(
                matches!(parse(raw.as_bytes()), Err(ConstraintError::SchemaViolation(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 200;
        let mut raw = String::new();
        for _ in 0..depth {
            raw.push_str(r#"{"all":{"constraints":["#);
        }
        raw.push_str(r#"{"gvk":{"group":"g","version":"v","kind":"K"}}"#);
        for _ in 0..depth {
            raw.push_str("]}}");
        }
        assert!(raw.len() < MAX_CONSTRAINT_SIZE);
        assert!(matches!(parse(raw.as_bytes()), Err(ConstraintError::SchemaViolation(_))));
    }

    #[test]
    fn test_parse_value() {
        let value = serde_json::json!({"none": {"constraints": []}});
        assert_eq!(parse_value(&value).unwrap(), Constraint::none(vec![]));
    }
}
