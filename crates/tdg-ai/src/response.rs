//! Turning model output into test cases
//!
//! Model output is repaired, then read leniently: any field may be missing
//! or mistyped and falls back to a default or the endpoint's own value.

use crate::error::GenerationProviderError;
use indexmap::IndexMap;
use rand::Rng;
use serde_json::{Map, Value};
use tdg_repair::JsonRepairEngine;
use tdg_schema::{Endpoint, HttpMethod};
use tdg_synth::{conform, SchemaSynthesizer, TestCase, TestType};

/// Repair `text` and read the cases it holds
///
/// # Errors
///
/// [`GenerationProviderError::Unrepairable`] when repair fails and
/// [`GenerationProviderError::EmptyResponse`] when no case survives.
pub fn decode(
    text: &str,
    engine: &JsonRepairEngine,
    endpoint: &Endpoint,
    backend: &str,
) -> Result<Vec<TestCase>, GenerationProviderError> {
    let outcome = engine.repair(text)?;
    if !outcome.is_pristine() {
        tracing::debug!(backend, steps = ?outcome.applied, "repaired model output");
    }
    let cases = parse_cases(&outcome.value, endpoint);
    if cases.is_empty() {
        return Err(GenerationProviderError::EmptyResponse {
            backend: backend.to_string(),
        });
    }
    Ok(cases)
}

/// Cases from a `{"cases": [...]}` object or a bare array
#[must_use]
pub fn parse_cases(value: &Value, endpoint: &Endpoint) -> Vec<TestCase> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("cases") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(index, obj)| case_from_object(obj, endpoint, index))
        .collect()
}

fn case_from_object(obj: &Map<String, Value>, endpoint: &Endpoint, index: usize) -> TestCase {
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let method = text("method")
        .and_then(|m| HttpMethod::parse(&m))
        .unwrap_or(endpoint.method);
    let test_type = text("test_type")
        .and_then(|t| TestType::parse_lenient(&t))
        .unwrap_or_default();
    let expected_status = obj
        .get("expected_status")
        .and_then(|status| match status {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .and_then(|n| u16::try_from(n).ok())
        .filter(|n| (100..=599).contains(n))
        .unwrap_or(200);

    let mut case = TestCase::new(
        text("name").unwrap_or_else(|| format!("ai_case_{index}")),
        method,
        text("path").unwrap_or_else(|| endpoint.path.clone()),
        test_type,
        expected_status,
    );
    case.description = text("description");
    case.headers = obj
        .get("headers")
        .and_then(Value::as_object)
        .map(|headers| {
            headers
                .iter()
                .map(|(k, v)| {
                    let value = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();
    case.query_params = value_map(obj.get("query_params"));
    case.path_params = value_map(obj.get("path_params"));
    case.body = obj.get("body").filter(|b| !b.is_null()).cloned();
    case.expected_response = obj.get("expected_response").filter(|b| !b.is_null()).cloned();
    case
}

fn value_map(value: Option<&Value>) -> IndexMap<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Coerce the bodies of valid cases toward the endpoint's request schema
pub fn conform_cases<R: Rng + ?Sized>(
    mut cases: Vec<TestCase>,
    endpoint: &Endpoint,
    synthesizer: &SchemaSynthesizer,
    domain_hint: Option<&str>,
    rng: &mut R,
) -> Vec<TestCase> {
    let Some(schema) = endpoint.request_body_schema.as_ref() else {
        return cases;
    };
    for case in cases.iter_mut().filter(|c| c.test_type == TestType::Valid) {
        let body = case.body.take().unwrap_or(Value::Null);
        case.body = Some(conform(body, schema, synthesizer, domain_hint, rng));
    }
    cases
}
