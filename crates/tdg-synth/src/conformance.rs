//! Checking and repairing values against a schema node
//!
//! Validation runs through `jsonschema` (draft 7). OpenAPI 3.0 spellings are
//! rewritten first: boolean `exclusiveMinimum`/`exclusiveMaximum` become
//! numeric bounds and `nullable` becomes a `null` type member.

use crate::synthesizer::{SchemaSynthesizer, SynthesisMode};
use jsonschema::{Draft, JSONSchema};
use rand::Rng;
use serde_json::{json, Map, Value};
use tdg_schema::{SchemaNode, SchemaType};

/// Draft 7 rendering of `node`
#[must_use]
pub fn to_draft7(node: &SchemaNode) -> Value {
    let mut value = serde_json::to_value(node).unwrap_or(Value::Bool(true));
    rewrite(&mut value);
    value
}

fn rewrite(schema: &mut Value) {
    let Value::Object(obj) = schema else {
        return;
    };

    for (flag, bound) in [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")] {
        match obj.get(flag) {
            Some(Value::Bool(true)) => {
                let value = obj.remove(bound).unwrap_or(Value::Null);
                obj.remove(flag);
                if value.is_number() {
                    obj.insert(flag.to_string(), value);
                }
            }
            Some(Value::Bool(false)) => {
                obj.remove(flag);
            }
            _ => {}
        }
    }

    if obj.remove("nullable") == Some(Value::Bool(true)) {
        let ty = obj.remove("type");
        let union = match ty {
            Some(Value::String(t)) => json!([t, "null"]),
            Some(Value::Array(mut types)) => {
                if !types.contains(&json!("null")) {
                    types.push(json!("null"));
                }
                Value::Array(types)
            }
            _ => Value::Null,
        };
        if !union.is_null() {
            obj.insert("type".to_string(), union);
        }
    }

    // Cycle stubs carry a dangling reference
    obj.remove("$ref");

    for key in ["items", "additionalProperties", "not"] {
        if let Some(child) = obj.get_mut(key) {
            rewrite(child);
        }
    }
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = obj.get_mut(key) {
            branches.iter_mut().for_each(rewrite);
        }
    }
    if let Some(Value::Object(properties)) = obj.get_mut("properties") {
        properties.values_mut().for_each(rewrite);
    }
}

/// Whether `value` satisfies `node`. Schemas that fail to compile accept
/// everything.
#[must_use]
pub fn validates(value: &Value, node: &SchemaNode) -> bool {
    let schema = to_draft7(node);
    match JSONSchema::options().with_draft(Draft::Draft7).compile(&schema) {
        Ok(compiled) => compiled.is_valid(value),
        Err(error) => {
            tracing::debug!(%error, "schema not usable for validation");
            true
        }
    }
}

/// Return `value` if it satisfies `node`, else a copy coerced toward it.
///
/// Scalars are converted between representations (`"5"` to `5`), numbers
/// are clamped into range, missing required properties are synthesized and
/// undeclared ones dropped when the schema forbids them. Anything that cannot
/// be coerced is replaced by a freshly synthesized valid value.
pub fn conform<R: Rng + ?Sized>(
    value: Value,
    node: &SchemaNode,
    synthesizer: &SchemaSynthesizer,
    domain_hint: Option<&str>,
    rng: &mut R,
) -> Value {
    if validates(&value, node) {
        return value;
    }
    let mut coercer = Coercer {
        synthesizer,
        domain_hint,
        rng,
    };
    coercer.coerce(value, node, None)
}

struct Coercer<'a, R: Rng + ?Sized> {
    synthesizer: &'a SchemaSynthesizer,
    domain_hint: Option<&'a str>,
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Coercer<'_, R> {
    fn fresh(&mut self, node: &SchemaNode, field: Option<&str>) -> Value {
        match field {
            Some(name) => self.synthesizer.synthesize_field(
                node,
                SynthesisMode::Valid,
                name,
                self.domain_hint,
                &mut *self.rng,
            ),
            None => self
                .synthesizer
                .synthesize(node, SynthesisMode::Valid, self.domain_hint, &mut *self.rng),
        }
    }

    fn coerce(&mut self, value: Value, node: &SchemaNode, field: Option<&str>) -> Value {
        if value.is_null() && node.allows_null() {
            return value;
        }
        if let Some(allowed) = node.enum_values.as_deref().filter(|v| !v.is_empty()) {
            return if allowed.contains(&value) {
                value
            } else {
                self.fresh(node, field)
            };
        }

        match node.primary_type() {
            Some(SchemaType::String) => {
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return self.fresh(node, field),
                };
                let candidate = Value::String(text);
                if validates(&candidate, node) {
                    candidate
                } else {
                    self.fresh(node, field)
                }
            }
            Some(SchemaType::Integer) => {
                let number = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    Value::Bool(b) => Some(f64::from(u8::from(*b))),
                    _ => None,
                };
                match number {
                    Some(n) => json!(clamp(n.round(), node) as i64),
                    None => self.fresh(node, field),
                }
            }
            Some(SchemaType::Number) => {
                let number = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match number.filter(|n| n.is_finite()) {
                    Some(n) => json!(clamp(n, node)),
                    None => self.fresh(node, field),
                }
            }
            Some(SchemaType::Boolean) => match value {
                Value::Bool(_) => value,
                Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
                Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|n| n != 0.0)),
                _ => self.fresh(node, field),
            },
            Some(SchemaType::Array) => match value {
                Value::Array(items) => match node.items.as_deref() {
                    Some(item_schema) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| self.coerce(item, item_schema, field))
                            .collect(),
                    ),
                    None => Value::Array(items),
                },
                _ => self.fresh(node, field),
            },
            Some(SchemaType::Object) => match value {
                Value::Object(obj) => Value::Object(self.coerce_object(obj, node)),
                _ => self.fresh(node, field),
            },
            Some(SchemaType::Null) => Value::Null,
            Some(SchemaType::Unknown) | None => value,
        }
    }

    fn coerce_object(&mut self, obj: Map<String, Value>, node: &SchemaNode) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in obj {
            match node.properties.get(&key) {
                Some(prop) => {
                    let value = self.coerce(value, prop, Some(&key));
                    out.insert(key, value);
                }
                None if node.permits_additional() => {
                    out.insert(key, value);
                }
                None => {}
            }
        }
        for name in &node.required {
            if out.contains_key(name) {
                continue;
            }
            let value = match node.properties.get(name) {
                Some(prop) => self.fresh(prop, Some(name)),
                None => Value::String(format!("test_{name}")),
            };
            out.insert(name.clone(), value);
        }
        out
    }
}

fn clamp(n: f64, node: &SchemaNode) -> f64 {
    let mut n = n;
    if let Some(lo) = node.lower_bound() {
        if n < lo.value || (lo.exclusive && n <= lo.value) {
            n = if lo.exclusive { lo.value + 1.0 } else { lo.value };
        }
    }
    if let Some(hi) = node.upper_bound() {
        if n > hi.value || (hi.exclusive && n >= hi.value) {
            n = if hi.exclusive { hi.value - 1.0 } else { hi.value };
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn node(value: Value) -> SchemaNode {
        serde_json::from_value(value).unwrap()
    }

    fn pet() -> SchemaNode {
        node(json!({
            "type": "object",
            "required": ["name", "age"],
            "additionalProperties": false,
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "age": {"type": "integer", "minimum": 0, "maximum": 30},
                "vaccinated": {"type": "boolean"}
            }
        }))
    }

    #[test]
    fn test_draft7_rewrites() {
        let schema = node(json!({
            "type": "integer", "minimum": 0, "exclusiveMinimum": true, "nullable": true
        }));
        assert_eq!(
            to_draft7(&schema),
            json!({"type": ["integer", "null"], "exclusiveMinimum": 0.0})
        );
        assert!(validates(&json!(null), &schema));
        assert!(!validates(&json!(0), &schema));
        assert!(validates(&json!(1), &schema));
    }

    #[test]
    fn test_valid_value_untouched() {
        let value = json!({"name": "Rex", "age": 3});
        let mut rng = StdRng::seed_from_u64(1);
        let out = conform(value.clone(), &pet(), &SchemaSynthesizer::default(), None, &mut rng);
        assert_eq!(out, value);
    }

    #[test]
    fn test_coercion() {
        let value = json!({"age": "45", "vaccinated": "true", "owner": "x"});
        let mut rng = StdRng::seed_from_u64(1);
        let schema = pet();
        let out = conform(value, &schema, &SchemaSynthesizer::default(), None, &mut rng);
        assert_eq!(out["age"], json!(30));
        assert_eq!(out["vaccinated"], json!(true));
        assert!(out["name"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(out.get("owner").is_none());
        assert!(validates(&out, &schema));
    }

    #[test]
    fn test_wrong_shape_is_replaced() {
        let mut rng = StdRng::seed_from_u64(4);
        let schema = pet();
        let out = conform(json!("nope"), &schema, &SchemaSynthesizer::default(), None, &mut rng);
        assert!(validates(&out, &schema));
    }
}
