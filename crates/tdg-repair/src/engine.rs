//! The staged repair pipeline

use crate::error::JsonRepairError;
use crate::steps;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// A repair decision recorded in [`RepairOutcome::applied`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStep {
    /// Removed markdown code fences
    StripFences,
    /// Quoted bare names/values and mapped foreign literals
    NormalizeLiterals,
    /// Inserted commas between adjacent values
    InsertCommas,
    /// Closed unterminated strings
    CloseStrings,
    /// Appended missing closers and dropped trailing commas
    CompleteStructures,
    /// Parsed the first balanced container
    BalancedPrefix,
    /// Rebuilt the wrapper object around complete array elements
    KeyedArray,
    /// Gave up and returned an empty wrapper
    EmptyFallback,
}

impl RepairStep {
    /// Stable name used in logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StripFences => "strip_fences",
            Self::NormalizeLiterals => "normalize_literals",
            Self::InsertCommas => "insert_commas",
            Self::CloseStrings => "close_strings",
            Self::CompleteStructures => "complete_structures",
            Self::BalancedPrefix => "balanced_prefix",
            Self::KeyedArray => "keyed_array",
            Self::EmptyFallback => "empty_fallback",
        }
    }
}

impl Display for RepairStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repaired value with its audit trail
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// Parsed value
    pub value: Value,
    /// Steps that changed the text, in order
    pub applied: Vec<RepairStep>,
}

impl RepairOutcome {
    /// Whether the input parsed without changes
    #[inline]
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.applied.is_empty()
    }

    /// Whether the value came from the empty fallback
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.applied.last() == Some(&RepairStep::EmptyFallback)
    }
}

/// Pipeline options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOptions {
    /// Key whose array is salvaged in the last stage
    pub wrapper_key: String,
    /// Return `{"<wrapper_key>": []}` instead of failing
    pub empty_fallback: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            wrapper_key: "cases".to_string(),
            empty_fallback: true,
        }
    }
}

impl RepairOptions {
    /// Set the salvaged key
    #[inline]
    #[must_use]
    pub fn with_wrapper_key(mut self, key: impl Into<String>) -> Self {
        self.wrapper_key = key.into();
        self
    }

    /// Enable or disable the empty fallback
    #[inline]
    #[must_use]
    pub fn with_empty_fallback(mut self, enabled: bool) -> Self {
        self.empty_fallback = enabled;
        self
    }
}

type TextStep = (RepairStep, fn(&str) -> String);

const TEXT_STEPS: [TextStep; 4] = [
    (RepairStep::NormalizeLiterals, steps::normalize_literals),
    (RepairStep::InsertCommas, steps::insert_missing_commas),
    (RepairStep::CloseStrings, steps::close_unterminated_strings),
    (RepairStep::CompleteStructures, steps::complete_structures),
];

/// Runs the repair pipeline
#[derive(Debug, Clone, Default)]
pub struct JsonRepairEngine {
    options: RepairOptions,
}

impl JsonRepairEngine {
    /// Engine with the given options
    #[inline]
    #[must_use]
    pub fn new(options: RepairOptions) -> Self {
        Self { options }
    }

    /// Current options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &RepairOptions {
        &self.options
    }

    /// Repair `text` into a JSON value
    ///
    /// # Errors
    ///
    /// [`JsonRepairError::EmptyInput`] for blank input;
    /// [`JsonRepairError::Unrepairable`] when nothing parses and the empty
    /// fallback is disabled.
    pub fn repair(&self, text: &str) -> Result<RepairOutcome, JsonRepairError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(JsonRepairError::EmptyInput);
        }
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Ok(RepairOutcome {
                value,
                applied: Vec::new(),
            });
        }

        let mut applied = Vec::new();
        let mut current = trimmed.to_string();

        let unfenced = steps::strip_code_fences(&current);
        if unfenced != current {
            current = unfenced;
            applied.push(RepairStep::StripFences);
            if let Some(outcome) = parsed(&current, &applied) {
                return Ok(outcome);
            }
        }

        for (step, apply) in TEXT_STEPS {
            let next = apply(&current);
            if next == current {
                continue;
            }
            tracing::debug!(step = %step, "applied json repair step");
            current = next;
            applied.push(step);
            if let Some(outcome) = parsed(&current, &applied) {
                return Ok(outcome);
            }
        }

        if let Some(value) = steps::longest_balanced_prefix(&current) {
            applied.push(RepairStep::BalancedPrefix);
            return Ok(RepairOutcome { value, applied });
        }

        // salvage from the original text: earlier steps may have mangled prose
        let keyed = steps::extract_keyed_array(&current, &self.options.wrapper_key)
            .or_else(|| steps::extract_keyed_array(trimmed, &self.options.wrapper_key));
        if let Some(value) = keyed {
            applied.push(RepairStep::KeyedArray);
            return Ok(RepairOutcome { value, applied });
        }

        if self.options.empty_fallback {
            tracing::warn!(
                steps = applied.len(),
                "json repair exhausted, returning empty wrapper"
            );
            applied.push(RepairStep::EmptyFallback);
            let mut wrapper = serde_json::Map::new();
            wrapper.insert(self.options.wrapper_key.clone(), Value::Array(Vec::new()));
            return Ok(RepairOutcome {
                value: Value::Object(wrapper),
                applied,
            });
        }

        Err(JsonRepairError::Unrepairable { applied })
    }
}

fn parsed(text: &str, applied: &[RepairStep]) -> Option<RepairOutcome> {
    serde_json::from_str(text).ok().map(|value| RepairOutcome {
        value,
        applied: applied.to_vec(),
    })
}

/// Repair with default options
///
/// # Errors
///
/// See [`JsonRepairEngine::repair`].
pub fn repair_json(text: &str) -> Result<RepairOutcome, JsonRepairError> {
    JsonRepairEngine::default().repair(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_valid_input_untouched() {
        let out = repair_json(r#"{"cases": [{"name": "a"}]}"#).unwrap();
        assert!(out.is_pristine());
        assert_eq!(out.value, json!({"cases": [{"name": "a"}]}));
    }

    #[test]
    fn test_fenced_response() {
        let out = repair_json("```json\n{\"cases\": []}\n```").unwrap();
        assert_eq!(out.applied, vec![RepairStep::StripFences]);
        assert_eq!(out.value, json!({"cases": []}));
    }

    #[test]
    fn test_truncated_response_completed() {
        let out = repair_json(r#"{"cases": [{"name": "Valid create", "expected_status": 201}, {"name": "Missing na"#).unwrap();
        assert_eq!(
            out.applied,
            vec![RepairStep::CloseStrings, RepairStep::CompleteStructures]
        );
        let cases = out.value["cases"].as_array().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1]["name"], "Missing na");
    }

    #[test]
    fn test_prose_wrapped_response() {
        let out = repair_json("Here are your cases:\n{\"cases\": [{\"name\": \"x\"}]}\nLet me know!").unwrap();
        assert_eq!(out.value, json!({"cases": [{"name": "x"}]}));
        assert_eq!(out.applied.last(), Some(&RepairStep::BalancedPrefix));
    }

    #[test]
    fn test_steps_are_ordered() {
        let out = repair_json("{'cases': [{'name': 'a'} {'name': 'b'}").unwrap();
        assert_eq!(
            out.applied,
            vec![
                RepairStep::NormalizeLiterals,
                RepairStep::InsertCommas,
                RepairStep::CompleteStructures,
            ]
        );
        assert_eq!(out.value, json!({"cases": [{"name": "a"}, {"name": "b"}]}));
    }

    #[test]
    fn test_empty_fallback() {
        let out = repair_json("I cannot help with that.").unwrap();
        assert!(out.is_fallback());
        assert_eq!(out.value, json!({"cases": []}));
    }

    #[test]
    fn test_fallback_disabled_is_error() {
        let engine = JsonRepairEngine::new(RepairOptions::default().with_empty_fallback(false));
        let err = engine.repair("no json here").unwrap_err();
        assert!(matches!(err, JsonRepairError::Unrepairable { .. }));
        assert!(matches!(engine.repair("   "), Err(JsonRepairError::EmptyInput)));
    }

    #[test]
    fn test_step_names() {
        assert_eq!(RepairStep::CloseStrings.to_string(), "close_strings");
        assert_eq!(
            serde_json::to_value(RepairStep::KeyedArray).unwrap(),
            json!("keyed_array")
        );
    }
}
