//! Codec tests: grammar acceptance, rejection, and round-trip identity.

use crate::models::ancestry::{is_sane, Ancestry};
use crate::models::config::PrimaryKeyType;
use crate::models::node::{NodeId, ValidationError};

fn parse_int(raw: &str) -> Result<Ancestry, ValidationError> {
    Ancestry::parse(Some(raw), PrimaryKeyType::Integer)
}

#[test]
fn empty_and_missing_are_valid_roots() {
    assert!(Ancestry::parse(None, PrimaryKeyType::Integer)
        .unwrap()
        .is_root());
    assert!(Ancestry::parse(Some(""), PrimaryKeyType::Integer)
        .unwrap()
        .is_root());
}

#[test]
fn valid_values_parse() {
    for raw in ["3", "10/2", "1/4/30", "1/2,3", "1/2,3/4/5,6"] {
        assert!(parse_int(raw).is_ok(), "{raw:?} should parse");
    }
}

#[test]
fn malformed_values_fail() {
    for raw in [
        "1/3/", "/2/3", "a/b", "-34", ",1", "1,", "1//2", "1,,2", " 1", "1 /2",
    ] {
        let result = parse_int(raw);
        assert!(
            matches!(result, Err(ValidationError::InvalidGrammar { .. })),
            "{raw:?} should be rejected, got {result:?}"
        );
    }
}

#[test]
fn parse_serialize_roundtrip() {
    for raw in ["3", "10/2", "1/4/30", "1/2,3", "7/8,9/10"] {
        let parsed = parse_int(raw).unwrap();
        assert_eq!(parsed.serialize().as_deref(), Some(raw));
        assert_eq!(
            Ancestry::parse(parsed.serialize().as_deref(), PrimaryKeyType::Integer).unwrap(),
            parsed
        );
    }
    assert_eq!(Ancestry::root().serialize(), None);
}

#[test]
fn integer_keys_are_typed() {
    let parsed = parse_int("1/4/30").unwrap();
    assert_eq!(
        parsed.branches(),
        &[vec![NodeId::Int(1), NodeId::Int(4), NodeId::Int(30)]]
    );
}

#[test]
fn string_keys_use_key_alphabet() {
    let parsed = Ancestry::parse(Some("a1/b-2,c_3"), PrimaryKeyType::String).unwrap();
    assert_eq!(parsed.branches().len(), 2);
    assert_eq!(parsed.branches()[0][1], NodeId::from("b-2"));

    // Integer grammar rejects the same value
    assert!(Ancestry::parse(Some("a1/b-2"), PrimaryKeyType::Integer).is_err());
    // Separator misuse is rejected for string keys too
    assert!(Ancestry::parse(Some("a//b"), PrimaryKeyType::String).is_err());
}

#[test]
fn contains_and_self_exclusion() {
    let parsed = parse_int("1/2,3/4").unwrap();
    assert!(parsed.contains(&NodeId::Int(3)));
    assert!(!parsed.contains(&NodeId::Int(5)));

    assert!(parsed.assert_excludes(&NodeId::Int(5)).is_ok());
    assert_eq!(
        parsed.assert_excludes(&NodeId::Int(2)),
        Err(ValidationError::SelfAncestry)
    );
}

#[test]
fn sanity_check_gates_propagation() {
    let id = NodeId::Int(7);
    assert!(is_sane(None, Some(&id), PrimaryKeyType::Integer));
    assert!(is_sane(Some("1/2"), Some(&id), PrimaryKeyType::Integer));
    // Malformed value is insane, not an error
    assert!(!is_sane(Some("1/2/"), Some(&id), PrimaryKeyType::Integer));
    // Self-referential value is insane
    assert!(!is_sane(Some("1/7"), Some(&id), PrimaryKeyType::Integer));
    // With no assigned id only the grammar is checked
    assert!(is_sane(Some("1/7"), None, PrimaryKeyType::Integer));
}
