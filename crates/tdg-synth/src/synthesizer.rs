//! Schema-driven value synthesis
//!
//! [`SchemaSynthesizer::synthesize`] produces a JSON value for a schema node
//! in one of three modes:
//! - **valid**: satisfies every supported constraint
//! - **boundary**: sits on a declared edge (length, bound, item count)
//! - **negative**: breaks the schema, by wrong type or by a constraint
//!
//! All randomness comes from the caller's RNG, so a seeded RNG makes output
//! reproducible.

use crate::formats;
use crate::pattern::PatternGenerator;
use crate::vocab::{self, Domain, FieldKind};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tdg_schema::{AdditionalProperties, Bound, SchemaNode, SchemaType};

/// How a value relates to its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// Satisfies the schema
    Valid,
    /// On a declared edge of the schema
    Boundary,
    /// Violates the schema
    Negative,
}

/// Defaults applied where a schema is silent
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisLimits {
    /// `maxLength` assumed for valid strings
    pub max_string_length: u64,
    /// `maxLength` assumed for boundary strings
    pub boundary_max_length: u64,
    /// `maxItems` assumed for arrays
    pub max_array_items: u64,
    /// `minimum` assumed for numbers
    pub number_min: f64,
    /// `maximum` assumed for numbers
    pub number_max: f64,
    /// Chance an optional property is included
    pub optional_property_probability: f64,
    /// Chance extra properties are injected where allowed
    pub additional_property_probability: f64,
    /// Chance a negative value is a plain type mismatch
    pub type_mismatch_probability: f64,
}

impl Default for SynthesisLimits {
    fn default() -> Self {
        Self {
            max_string_length: 100,
            boundary_max_length: 1000,
            max_array_items: 10,
            number_min: 0.0,
            number_max: 1_000_000.0,
            optional_property_probability: 0.5,
            additional_property_probability: 0.3,
            type_mismatch_probability: 0.5,
        }
    }
}

/// Value of the wrong primitive type for `ty`
#[must_use]
pub fn type_mismatch(ty: SchemaType) -> Option<Value> {
    let value = match ty {
        SchemaType::String => json!(123),
        SchemaType::Number => json!("not_a_number"),
        SchemaType::Integer => json!(3.5),
        SchemaType::Boolean => json!("yes"),
        SchemaType::Array => json!("not_an_array"),
        SchemaType::Object => json!("not_an_object"),
        SchemaType::Null => json!("not_null"),
        SchemaType::Unknown => return None,
    };
    Some(value)
}

#[derive(Debug, Clone, Copy)]
struct Context<'a> {
    domain: Option<Domain>,
    field: Option<&'a str>,
}

impl<'a> Context<'a> {
    fn field(self, name: &'a str) -> Self {
        Self {
            field: Some(name),
            ..self
        }
    }
}

/// Generates values for schema nodes
#[derive(Debug, Default)]
pub struct SchemaSynthesizer {
    limits: SynthesisLimits,
    patterns: Mutex<HashMap<String, Option<Arc<PatternGenerator>>>>,
}

impl SchemaSynthesizer {
    /// Synthesizer with custom limits
    #[must_use]
    pub fn new(limits: SynthesisLimits) -> Self {
        Self {
            limits,
            patterns: Mutex::new(HashMap::new()),
        }
    }

    /// Active limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> &SynthesisLimits {
        &self.limits
    }

    /// Generate a value for `node`
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        mode: SynthesisMode,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Value {
        let ctx = Context {
            domain: domain_hint.and_then(Domain::detect),
            field: None,
        };
        self.generate(node, mode, ctx, rng)
    }

    /// Generate a value for a named field, letting the name shape free text
    pub fn synthesize_field<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        mode: SynthesisMode,
        field: &str,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Value {
        let ctx = Context {
            domain: domain_hint.and_then(Domain::detect),
            field: Some(field),
        };
        self.generate(node, mode, ctx, rng)
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        mode: SynthesisMode,
        ctx: Context<'_>,
        rng: &mut R,
    ) -> Value {
        match mode {
            SynthesisMode::Valid => self.valid(node, ctx, rng),
            SynthesisMode::Boundary => self.boundary(node, ctx, rng),
            SynthesisMode::Negative => self.negative(node, ctx, rng),
        }
    }

    fn valid<R: Rng + ?Sized>(&self, node: &SchemaNode, ctx: Context<'_>, rng: &mut R) -> Value {
        if let Some(choices) = node.choices() {
            return choices.choose(rng).cloned().unwrap_or(Value::Null);
        }
        if !node.all_of.is_empty() {
            return self.valid(&merge_all_of(node), ctx, rng);
        }
        if let Some(branch) = pick_branch(node, rng) {
            return self.valid(branch, ctx, rng);
        }

        match node.primary_type() {
            Some(SchemaType::String) => Value::String(self.string(node, ctx, rng)),
            Some(SchemaType::Integer) => self.integer(node, rng),
            Some(SchemaType::Number) => self.number(node, rng),
            Some(SchemaType::Boolean) => Value::Bool(rng.gen_bool(0.5)),
            Some(SchemaType::Array) => {
                let (min, max) = self.item_range(node);
                let count = rng.gen_range(min..=max);
                self.fill_array(node, count, ctx, rng)
            }
            Some(SchemaType::Object) => self.object(node, SynthesisMode::Valid, ctx, rng),
            Some(SchemaType::Null) => Value::Null,
            Some(SchemaType::Unknown) | None => Value::String(vocab::word(rng).to_string()),
        }
    }

    fn boundary<R: Rng + ?Sized>(&self, node: &SchemaNode, ctx: Context<'_>, rng: &mut R) -> Value {
        if let Some(choices) = node.choices() {
            return choices.choose(rng).cloned().unwrap_or(Value::Null);
        }
        if !node.all_of.is_empty() {
            return self.boundary(&merge_all_of(node), ctx, rng);
        }
        if let Some(branch) = pick_branch(node, rng) {
            return self.boundary(branch, ctx, rng);
        }

        let ty = node.primary_type();
        match ty {
            Some(SchemaType::String) if node.min_length.is_some() || node.max_length.is_some() => {
                let min = node.min_length.unwrap_or(0);
                let max = node.max_length.unwrap_or(self.limits.boundary_max_length);
                let len = match rng.gen_range(0..3) {
                    0 => min,
                    1 => max,
                    _ => 0,
                };
                Value::String(filler(len))
            }
            Some(t @ (SchemaType::Integer | SchemaType::Number)) => {
                let integer = t == SchemaType::Integer;
                let edge = match (node.lower_bound(), node.upper_bound()) {
                    (Some(lo), Some(hi)) => {
                        if rng.gen_bool(0.5) {
                            Some(inner_edge(lo, Side::Lower, integer))
                        } else {
                            Some(inner_edge(hi, Side::Upper, integer))
                        }
                    }
                    (Some(lo), None) => Some(inner_edge(lo, Side::Lower, integer)),
                    (None, Some(hi)) => Some(inner_edge(hi, Side::Upper, integer)),
                    (None, None) => None,
                };
                edge.unwrap_or_else(|| self.valid(node, ctx, rng))
            }
            Some(SchemaType::Array) if node.min_items.is_some() || node.max_items.is_some() => {
                let (min, max) = self.item_range(node);
                let count = if rng.gen_bool(0.5) { min } else { max };
                self.fill_array(node, count, ctx, rng)
            }
            Some(SchemaType::Object) => self.object(node, SynthesisMode::Boundary, ctx, rng),
            _ => self.valid(node, ctx, rng),
        }
    }

    fn negative<R: Rng + ?Sized>(&self, node: &SchemaNode, ctx: Context<'_>, rng: &mut R) -> Value {
        if !node.all_of.is_empty() {
            return self.negative(&merge_all_of(node), ctx, rng);
        }
        if node.primary_type().is_none() {
            if let Some(branch) = pick_branch(node, rng) {
                return self.negative(branch, ctx, rng);
            }
        }

        let ty = node.primary_type();
        let mismatch = ty.and_then(type_mismatch);
        if mismatch.is_some() && rng.gen_bool(self.limits.type_mismatch_probability) {
            return mismatch.unwrap_or(Value::Null);
        }
        self.violation(node, ty, ctx, rng)
            .or(mismatch)
            .unwrap_or(Value::Null)
    }

    /// A value breaking one declared constraint, if any applies
    fn violation<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        ty: Option<SchemaType>,
        ctx: Context<'_>,
        rng: &mut R,
    ) -> Option<Value> {
        if let Some(values) = node.enum_values.as_deref().filter(|v| !v.is_empty()) {
            return invalid_enum(values, ty);
        }

        match ty? {
            SchemaType::String => {
                if let Some(pattern) = node.pattern.as_deref() {
                    let generator = self.pattern(pattern);
                    let breaking = ["does_not_match_pattern", "", "!@#$%^&*()", "\u{0}"]
                        .into_iter()
                        .find(|c| generator.as_ref().map_or(true, |g| !g.matches(c)));
                    if let Some(candidate) = breaking {
                        return Some(Value::String(candidate.to_string()));
                    }
                }
                if let Some(min) = node.min_length.filter(|m| *m > 0) {
                    return Some(Value::String(filler(min - 1)));
                }
                if let Some(max) = node.max_length {
                    return Some(Value::String(filler(max + 1)));
                }
                node.format
                    .as_deref()
                    .and_then(formats::invalid)
                    .map(|s| Value::String(s.to_string()))
            }
            t @ (SchemaType::Integer | SchemaType::Number) => {
                let integer = t == SchemaType::Integer;
                let below = node.lower_bound().and_then(|lo| outer_edge(lo, Side::Lower, integer));
                let above = || node.upper_bound().and_then(|hi| outer_edge(hi, Side::Upper, integer));
                if let Some(edge) = below.or_else(above) {
                    return Some(edge);
                }
                node.multiple_of
                    .filter(|m| *m > 0.0)
                    .map(|m| json!(m * 1.5))
            }
            SchemaType::Array => {
                if let Some(min) = node.min_items.filter(|m| *m > 0) {
                    return Some(self.fill_array(node, min - 1, ctx, rng));
                }
                if let Some(max) = node.max_items {
                    return Some(self.fill_array(node, max + 1, ctx, rng));
                }
                let items = node.items.as_deref();
                if node.unique_items {
                    let element = match items {
                        Some(items) => self.valid(items, ctx, rng),
                        None => Value::String(vocab::word(rng).to_string()),
                    };
                    return Some(Value::Array(vec![element.clone(), element]));
                }
                items
                    .filter(|items| items.primary_type().is_some())
                    .map(|items| Value::Array(vec![self.negative(items, ctx, rng)]))
            }
            SchemaType::Object => {
                if let Some(first) = node.required.first() {
                    let mut obj = self.object_map(node, SynthesisMode::Valid, ctx, rng);
                    obj.remove(first);
                    return Some(Value::Object(obj));
                }
                if !node.permits_additional() {
                    let mut obj = self.object_map(node, SynthesisMode::Valid, ctx, rng);
                    let key = (0..)
                        .map(|i| format!("unexpected_property_{i}"))
                        .find(|k| !node.properties.contains_key(k))
                        .unwrap_or_default();
                    obj.insert(key, json!("unexpected"));
                    return Some(Value::Object(obj));
                }
                let (name, wrong) = node.properties.iter().find_map(|(name, prop)| {
                    prop.primary_type()
                        .and_then(type_mismatch)
                        .map(|wrong| (name, wrong))
                })?;
                let mut obj = self.object_map(node, SynthesisMode::Valid, ctx, rng);
                obj.insert(name.clone(), wrong);
                Some(Value::Object(obj))
            }
            SchemaType::Boolean | SchemaType::Null | SchemaType::Unknown => None,
        }
    }

    fn string<R: Rng + ?Sized>(&self, node: &SchemaNode, ctx: Context<'_>, rng: &mut R) -> String {
        let min = to_usize(node.min_length.unwrap_or(0));
        let max = to_usize(
            node.max_length
                .unwrap_or(self.limits.max_string_length)
                .max(node.min_length.unwrap_or(0)),
        );

        if let Some(value) = node.format.as_deref().and_then(|f| formats::generate(f, rng)) {
            return value;
        }
        if let Some(pattern) = node.pattern.as_deref() {
            if let Some(value) = self
                .pattern(pattern)
                .and_then(|g| g.generate(rng, min, max))
            {
                return value;
            }
        }

        let text = match FieldKind::detect(ctx.field, node.description.as_deref()) {
            Some(kind) => vocab::for_field(rng, kind, ctx.domain),
            None => {
                let words = rng.gen_range(2..=8);
                vocab::sentence(rng, words, ctx.domain)
            }
        };
        fit_length(text, min, max)
    }

    fn integer<R: Rng + ?Sized>(&self, node: &SchemaNode, rng: &mut R) -> Value {
        let lo = node.lower_bound().map(|b| inner_int(b, Side::Lower));
        let hi = node.upper_bound().map(|b| inner_int(b, Side::Upper));
        let (lo, hi) = match (lo, hi) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, lo.max(self.limits.number_max as i64).saturating_add(100)),
            (None, Some(hi)) => (hi.min(self.limits.number_min as i64).saturating_sub(100), hi),
            (None, None) => (
                self.limits.number_min as i64,
                self.limits.number_max as i64,
            ),
        };
        if lo >= hi {
            return json!(lo);
        }

        let value = rng.gen_range(lo..=hi);
        match node.multiple_of.filter(|m| *m >= 1.0 && m.fract() == 0.0) {
            Some(m) => json!(snap_int(value, m as i64, lo, hi)),
            None => json!(value),
        }
    }

    fn number<R: Rng + ?Sized>(&self, node: &SchemaNode, rng: &mut R) -> Value {
        let lo = node.lower_bound().map(|b| inner_float(b, Side::Lower));
        let hi = node.upper_bound().map(|b| inner_float(b, Side::Upper));
        let (lo, hi) = match (lo, hi) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, lo.max(self.limits.number_max) + 100.0),
            (None, Some(hi)) => (hi.min(self.limits.number_min) - 100.0, hi),
            (None, None) => (self.limits.number_min, self.limits.number_max),
        };
        if lo >= hi || !lo.is_finite() || !hi.is_finite() {
            return json!(lo);
        }

        let raw = rng.gen_range(lo..=hi);
        let value = match node.multiple_of.filter(|m| *m > 0.0) {
            Some(m) => {
                let mut v = (raw / m).round() * m;
                if v < lo {
                    v += m;
                }
                if v > hi {
                    v -= m;
                }
                v
            }
            None => ((raw * 100.0).round() / 100.0).clamp(lo, hi),
        };
        json!(value)
    }

    fn item_range(&self, node: &SchemaNode) -> (u64, u64) {
        let min = node.min_items.unwrap_or(0);
        let max = node
            .max_items
            .unwrap_or(self.limits.max_array_items)
            .max(min);
        (min, max)
    }

    fn fill_array<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        count: u64,
        ctx: Context<'_>,
        rng: &mut R,
    ) -> Value {
        let default_item = SchemaNode::of_type(SchemaType::String);
        let item = node.items.as_deref().unwrap_or(&default_item);
        let mut items: Vec<Value> = Vec::new();
        for _ in 0..count {
            let mut candidate = self.valid(item, ctx, rng);
            if node.unique_items {
                let mut retries = 4;
                while items.contains(&candidate) && retries > 0 {
                    candidate = self.valid(item, ctx, rng);
                    retries -= 1;
                }
                if items.contains(&candidate) {
                    continue;
                }
            }
            items.push(candidate);
        }
        Value::Array(items)
    }

    fn object<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        mode: SynthesisMode,
        ctx: Context<'_>,
        rng: &mut R,
    ) -> Value {
        Value::Object(self.object_map(node, mode, ctx, rng))
    }

    fn object_map<R: Rng + ?Sized>(
        &self,
        node: &SchemaNode,
        mode: SynthesisMode,
        ctx: Context<'_>,
        rng: &mut R,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, prop) in &node.properties {
            let include = node.is_required(name)
                || rng.gen_bool(self.limits.optional_property_probability);
            if include {
                let value = self.generate(prop, mode, ctx.field(name), rng);
                out.insert(name.clone(), value);
            }
        }

        if mode == SynthesisMode::Valid
            && node.permits_additional()
            && rng.gen_bool(self.limits.additional_property_probability)
        {
            let extra = rng.gen_range(1..=3);
            for _ in 0..extra {
                let key = vocab::word(rng);
                if out.contains_key(key) || node.properties.contains_key(key) {
                    continue;
                }
                let value = match &node.additional_properties {
                    Some(AdditionalProperties::Schema(schema)) => self.valid(schema, ctx, rng),
                    _ => Value::String(vocab::word(rng).to_string()),
                };
                out.insert(key.to_string(), value);
            }
        }
        out
    }

    fn pattern(&self, pattern: &str) -> Option<Arc<PatternGenerator>> {
        let mut cache = self.patterns.lock();
        cache
            .entry(pattern.to_string())
            .or_insert_with(|| match PatternGenerator::compile(pattern) {
                Ok(generator) => Some(Arc::new(generator)),
                Err(error) => {
                    tracing::debug!(pattern, %error, "pattern not usable for generation");
                    None
                }
            })
            .clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

/// Closest valid integer to a bound
fn inner_int(bound: Bound, side: Side) -> i64 {
    match (side, bound.exclusive) {
        (Side::Lower, false) => bound.value.ceil() as i64,
        (Side::Lower, true) => (bound.value.floor() as i64).saturating_add(1),
        (Side::Upper, false) => bound.value.floor() as i64,
        (Side::Upper, true) => (bound.value.ceil() as i64).saturating_sub(1),
    }
}

/// Closest valid float to a bound
fn inner_float(bound: Bound, side: Side) -> f64 {
    match (side, bound.exclusive) {
        (_, false) => bound.value,
        (Side::Lower, true) => bound.value + 0.01,
        (Side::Upper, true) => bound.value - 0.01,
    }
}

fn inner_edge(bound: Bound, side: Side, integer: bool) -> Value {
    if integer {
        json!(inner_int(bound, side))
    } else {
        json!(inner_float(bound, side))
    }
}

/// Closest invalid value past a bound.
///
/// `None` for an integer bound at the edge of the int64 range: no integer
/// lies past it, and `f64` cannot tell `i64::MIN - 1` from `i64::MIN`.
fn outer_edge(bound: Bound, side: Side, integer: bool) -> Option<Value> {
    if integer {
        let edge = inner_int(bound, side);
        let past = match side {
            Side::Lower => edge.checked_sub(1),
            Side::Upper => edge.checked_add(1),
        };
        past.map(|v| json!(v))
    } else {
        Some(json!(match (side, bound.exclusive) {
            (_, true) => bound.value,
            (Side::Lower, false) => bound.value - 1.0,
            (Side::Upper, false) => bound.value + 1.0,
        }))
    }
}

fn snap_int(value: i64, multiple: i64, lo: i64, hi: i64) -> i64 {
    let Some(mut snapped) = ((value as f64 / multiple as f64).round() as i64).checked_mul(multiple) else {
        return value;
    };
    if snapped < lo {
        snapped = snapped.saturating_add(multiple);
    }
    if snapped > hi {
        snapped = snapped.saturating_sub(multiple);
    }
    if (lo..=hi).contains(&snapped) {
        snapped
    } else {
        value
    }
}

fn invalid_enum(values: &[Value], ty: Option<SchemaType>) -> Option<Value> {
    match ty {
        Some(SchemaType::Integer | SchemaType::Number) => {
            let max = values.iter().filter_map(Value::as_f64).fold(0.0, f64::max);
            let candidate = max.floor() + 1.0;
            Some(if ty == Some(SchemaType::Integer) {
                json!(candidate as i64)
            } else {
                json!(candidate)
            })
        }
        Some(SchemaType::Boolean) => [json!(true), json!(false)]
            .into_iter()
            .find(|b| !values.contains(b)),
        _ => {
            let mut token = "invalid_enum_value".to_string();
            while values.iter().any(|v| v.as_str() == Some(token.as_str())) {
                token.push('_');
            }
            Some(Value::String(token))
        }
    }
}

/// Pick one `anyOf`/`oneOf` branch
fn pick_branch<'n, R: Rng + ?Sized>(node: &'n SchemaNode, rng: &mut R) -> Option<&'n SchemaNode> {
    if !node.any_of.is_empty() {
        node.any_of.choose(rng)
    } else {
        node.one_of.choose(rng)
    }
}

/// Shallow union of `allOf` branches into one node
#[must_use]
pub fn merge_all_of(node: &SchemaNode) -> SchemaNode {
    let mut merged = node.clone();
    merged.all_of.clear();
    for branch in &node.all_of {
        let branch: Cow<'_, SchemaNode> = if branch.all_of.is_empty() {
            Cow::Borrowed(branch)
        } else {
            Cow::Owned(merge_all_of(branch))
        };
        fill(&mut merged.schema_type, &branch.schema_type);
        fill(&mut merged.format, &branch.format);
        fill(&mut merged.minimum, &branch.minimum);
        fill(&mut merged.maximum, &branch.maximum);
        fill(&mut merged.exclusive_minimum, &branch.exclusive_minimum);
        fill(&mut merged.exclusive_maximum, &branch.exclusive_maximum);
        fill(&mut merged.multiple_of, &branch.multiple_of);
        fill(&mut merged.min_length, &branch.min_length);
        fill(&mut merged.max_length, &branch.max_length);
        fill(&mut merged.pattern, &branch.pattern);
        fill(&mut merged.enum_values, &branch.enum_values);
        fill(&mut merged.min_items, &branch.min_items);
        fill(&mut merged.max_items, &branch.max_items);
        fill(&mut merged.items, &branch.items);
        fill(&mut merged.additional_properties, &branch.additional_properties);
        for (name, prop) in &branch.properties {
            merged
                .properties
                .entry(name.clone())
                .or_insert_with(|| prop.clone());
        }
        for name in &branch.required {
            if !merged.required.contains(name) {
                merged.required.push(name.clone());
            }
        }
        merged.unique_items |= branch.unique_items;
    }
    merged
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

fn filler(len: u64) -> String {
    "x".repeat(to_usize(len))
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn fit_length(text: String, min: usize, max: usize) -> String {
    let len = text.chars().count();
    let mut text = if len > max {
        text.chars().take(max).collect::<String>().trim_end().to_string()
    } else {
        text
    };
    let len = text.chars().count();
    if len < min {
        text.push_str(&"x".repeat(min - len));
    }
    text
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

    fn run(schema: &SchemaNode, mode: SynthesisMode, seed: u64) -> Value {
        let mut rng = StdRng::seed_from_u64(seed);
        SchemaSynthesizer::default().synthesize(schema, mode, None, &mut rng)
    }

    #[test]
    fn test_valid_string_lengths() {
        let schema = node(json!({"type": "string", "minLength": 5, "maxLength": 8}));
        for seed in 0..50 {
            let value = run(&schema, SynthesisMode::Valid, seed);
            let len = value.as_str().unwrap().chars().count();
            assert!((5..=8).contains(&len), "{value}");
        }
    }

    #[test]
    fn test_valid_integer_range_and_multiple() {
        let schema = node(json!({"type": "integer", "minimum": 10, "maximum": 100, "multipleOf": 7}));
        for seed in 0..50 {
            let n = run(&schema, SynthesisMode::Valid, seed).as_i64().unwrap();
            assert!((10..=100).contains(&n));
            assert_eq!(n % 7, 0);
        }
    }

    #[test]
    fn test_valid_number_exclusive() {
        let schema = node(json!({"type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1}));
        for seed in 0..50 {
            let n = run(&schema, SynthesisMode::Valid, seed).as_f64().unwrap();
            assert!(n > 0.0 && n < 1.0, "{n}");
        }
    }

    #[test]
    fn test_enum_short_circuit() {
        let schema = node(json!({"type": "string", "enum": ["a", "b"]}));
        for seed in 0..20 {
            let v = run(&schema, SynthesisMode::Valid, seed);
            assert!(v == json!("a") || v == json!("b"));
            let v = run(&schema, SynthesisMode::Boundary, seed);
            assert!(v == json!("a") || v == json!("b"));
        }
    }

    #[test]
    fn test_negative_enum_is_outside() {
        let schema = node(json!({"type": "string", "enum": ["a", "b"]}));
        for seed in 0..20 {
            let v = run(&schema, SynthesisMode::Negative, seed);
            assert!(v != json!("a") && v != json!("b"));
        }
    }

    #[test]
    fn test_object_required_always_present() {
        let schema = node(json!({
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "integer"}, "note": {"type": "string"}},
            "additionalProperties": false
        }));
        for seed in 0..30 {
            let v = run(&schema, SynthesisMode::Valid, seed);
            let obj = v.as_object().unwrap();
            assert!(obj.contains_key("id"));
            assert!(obj.keys().all(|k| k == "id" || k == "note"));
        }
    }

    #[test]
    fn test_array_unique_items() {
        let schema = node(json!({
            "type": "array", "minItems": 2, "maxItems": 5, "uniqueItems": true,
            "items": {"type": "integer", "minimum": 0, "maximum": 1000}
        }));
        let v = run(&schema, SynthesisMode::Valid, 5);
        let items = v.as_array().unwrap();
        let mut sorted: Vec<_> = items.iter().map(|i| i.as_i64().unwrap()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), items.len());
    }

    #[test]
    fn test_boundary_string_choices() {
        let schema = node(json!({"type": "string", "minLength": 2, "maxLength": 4}));
        for seed in 0..30 {
            let len = run(&schema, SynthesisMode::Boundary, seed)
                .as_str()
                .unwrap()
                .len();
            assert!([0, 2, 4].contains(&len));
        }
    }

    #[test]
    fn test_boundary_without_bounds_is_valid() {
        let schema = node(json!({"type": "integer", "minimum": 3}));
        assert_eq!(run(&schema, SynthesisMode::Boundary, 1), json!(3));
        let schema = node(json!({"type": "boolean"}));
        assert!(run(&schema, SynthesisMode::Boundary, 1).is_boolean());
    }

    #[test]
    fn test_negative_number_violations() {
        let schema = node(json!({"type": "integer", "minimum": 5, "maximum": 9}));
        for seed in 0..30 {
            let v = run(&schema, SynthesisMode::Negative, seed);
            match v.as_i64() {
                Some(n) => assert!(!(5..=9).contains(&n)),
                None => assert_eq!(v, json!(3.5)),
            }
        }
    }

    #[test]
    fn test_negative_int64_extremes_do_not_overflow() {
        let floor = node(json!({"type": "integer", "format": "int64", "minimum": i64::MIN}));
        let ceiling = node(json!({"type": "integer", "format": "int64", "maximum": i64::MAX}));
        let full = node(json!({"type": "integer", "format": "int64", "minimum": i64::MIN, "maximum": i64::MAX}));
        for seed in 0..20 {
            for schema in [&floor, &ceiling, &full] {
                let v = run(schema, SynthesisMode::Negative, seed);
                assert_eq!(v, json!(3.5), "seed {seed}");
            }
        }

        let bounded = node(json!({"type": "integer", "minimum": i64::MIN, "maximum": 10}));
        for seed in 0..20 {
            let v = run(&bounded, SynthesisMode::Negative, seed);
            match v.as_i64() {
                Some(n) => assert_eq!(n, 11),
                None => assert_eq!(v, json!(3.5)),
            }
        }
    }

    #[test]
    fn test_negative_multiple_of_is_off_grid() {
        let schema = node(json!({"type": "number", "multipleOf": 0.5}));
        for seed in 0..20 {
            let v = run(&schema, SynthesisMode::Negative, seed);
            match v.as_f64() {
                Some(n) => assert!((n - 0.75).abs() < f64::EPSILON, "{n}"),
                None => assert_eq!(v, json!("not_a_number")),
            }
        }
    }

    #[test]
    fn test_negative_pattern_breaks_pattern() {
        let schema = node(json!({"type": "string", "pattern": "^[a-z_]+$"}));
        let re = regex::Regex::new("^[a-z_]+$").unwrap();
        for seed in 0..30 {
            let v = run(&schema, SynthesisMode::Negative, seed);
            if let Some(s) = v.as_str() {
                assert!(!re.is_match(s), "{s}");
            }
        }
    }

    #[test]
    fn test_all_of_union() {
        let schema = node(json!({
            "allOf": [
                {"type": "object", "required": ["a"], "properties": {"a": {"type": "integer"}}},
                {"required": ["b"], "properties": {"b": {"type": "boolean"}}}
            ]
        }));
        let merged = merge_all_of(&schema);
        assert_eq!(merged.required, vec!["a", "b"]);
        let v = run(&schema, SynthesisMode::Valid, 2);
        assert!(v["a"].is_i64());
        assert!(v["b"].is_boolean());
    }

    #[test]
    fn test_format_and_field_names() {
        let schema = node(json!({
            "type": "object",
            "required": ["email", "created"],
            "properties": {
                "email": {"type": "string"},
                "created": {"type": "string", "format": "date-time"}
            }
        }));
        let v = run(&schema, SynthesisMode::Valid, 11);
        assert!(v["email"].as_str().unwrap().contains('@'));
        assert!(chrono::DateTime::parse_from_rfc3339(v["created"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_type_mismatch_table() {
        assert_eq!(type_mismatch(SchemaType::String), Some(json!(123)));
        assert_eq!(type_mismatch(SchemaType::Integer), Some(json!(3.5)));
        assert_eq!(type_mismatch(SchemaType::Unknown), None);
    }

    #[test]
    fn test_fit_length() {
        assert_eq!(fit_length("ab".into(), 4, 10), "abxx");
        assert_eq!(fit_length("abcdef".into(), 0, 3), "abc");
        assert_eq!(fit_length("ab cd".into(), 0, 3), "ab");
    }
}
