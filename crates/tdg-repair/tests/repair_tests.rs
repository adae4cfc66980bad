//! Property tests for the repair pipeline

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use tdg_repair::{repair_json, steps, RepairStep};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn cases_document() -> impl Strategy<Value = Value> {
    prop::collection::vec(
        ("[A-Za-z ]{1,20}", 200u16..500, prop::bool::ANY),
        1..5,
    )
    .prop_map(|cases| {
        let cases: Vec<Value> = cases
            .into_iter()
            .map(|(name, status, valid)| {
                json!({
                    "name": name,
                    "expected_status": status,
                    "test_type": if valid { "valid" } else { "negative" },
                    "body": {"tags": ["a", "b"]}
                })
            })
            .collect();
        json!({ "cases": cases })
    })
}

proptest! {
    /// Tenet: valid JSON passes through untouched
    #[test]
    fn prop_valid_json_is_pristine(value in json_value()) {
        for text in [serde_json::to_string(&value).unwrap(), serde_json::to_string_pretty(&value).unwrap()] {
            let out = repair_json(&text).unwrap();
            prop_assert!(out.is_pristine());
            prop_assert_eq!(&out.value, &value);
        }
    }

    /// Tenet: every text step is the identity on valid JSON
    #[test]
    fn prop_steps_identity_on_valid(value in json_value()) {
        let text = serde_json::to_string(&value).unwrap();
        prop_assert_eq!(steps::normalize_literals(&text), text.clone());
        prop_assert_eq!(steps::insert_missing_commas(&text), text.clone());
        prop_assert_eq!(steps::close_unterminated_strings(&text), text.clone());
        prop_assert_eq!(steps::complete_structures(&text), text);
    }

    /// Tenet: repairing a repaired value changes nothing
    #[test]
    fn prop_repair_is_idempotent(doc in cases_document(), cut in 1usize..200) {
        let text = serde_json::to_string(&doc).unwrap();
        let cut = text.len().saturating_sub(cut).max(1);
        let truncated: String = text.chars().take(cut).collect();
        let first = repair_json(&truncated).unwrap();
        let again = repair_json(&serde_json::to_string(&first.value).unwrap()).unwrap();
        prop_assert!(again.is_pristine());
        prop_assert_eq!(again.value, first.value);
    }

    /// Tenet: a missing final closer is restored
    #[test]
    fn prop_missing_final_closer(doc in cases_document()) {
        let text = serde_json::to_string(&doc).unwrap();
        let without_brace = &text[..text.len() - 1];
        prop_assert_eq!(repair_json(without_brace).unwrap().value, doc.clone());

        let cases = serde_json::to_string(&doc["cases"]).unwrap();
        let without_bracket = &cases[..cases.len() - 1];
        prop_assert_eq!(&repair_json(without_bracket).unwrap().value, &doc["cases"]);
    }
}

/// Tenet: a response cut inside an element keeps the complete elements
#[test]
fn test_truncated_mid_element_keeps_complete_cases() {
    let text = r#"{"cases": [{"name": "one", "expected_status": 200}, {"name": "two", "body": {"tags": ["x", "y"#;
    let out = repair_json(text).unwrap();
    let cases = out.value["cases"].as_array().unwrap();
    assert_eq!(cases[0]["name"], "one");
    assert_eq!(cases[1]["body"]["tags"], json!(["x", "y"]));
}

/// Tenet: structural garbage after the array still salvages its elements
#[test]
fn test_keyed_array_salvage() {
    let text = r#"{"cases": [{"name": "a"}, {"name": "b"}], "summary": : }"#;
    let out = repair_json(text).unwrap();
    assert_eq!(out.applied.last(), Some(&RepairStep::KeyedArray));
    assert_eq!(out.value, json!({"cases": [{"name": "a"}, {"name": "b"}]}));
}

/// Tenet: prose around a bare array yields the array
#[test]
fn test_prose_around_array() {
    let text = r#"Result: "cases": [{"name": "a"}, {"name": "b"}, {broken"#;
    let out = repair_json(text).unwrap();
    assert_eq!(out.applied.last(), Some(&RepairStep::BalancedPrefix));
    assert_eq!(out.value[0]["name"], "a");
    assert_eq!(out.value.as_array().map(Vec::len), Some(3));
}
