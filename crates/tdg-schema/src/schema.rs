//! Typed schema nodes
//!
//! [`SchemaNode`] models the JSON-Schema subset the synthesizer understands:
//! types, numeric bounds, string length and pattern, enums, array item rules,
//! object properties and the `allOf`/`anyOf`/`oneOf` combinators. Unknown
//! keywords are ignored on deserialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive JSON-Schema types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `array`
    Array,
    /// `object`
    Object,
    /// `null`
    Null,
    /// Anything this model does not know
    #[serde(other)]
    Unknown,
}

impl SchemaType {
    /// Type name as written in a schema
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }

    /// Type of an existing JSON value
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// The `type` keyword: a single type or a union (`["string", "null"]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    /// One type
    Single(SchemaType),
    /// Type union
    Union(Vec<SchemaType>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a flag (OpenAPI 3.0) or a bound (3.1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exclusive {
    /// Modifies the matching `minimum`/`maximum`
    Flag(bool),
    /// Standalone exclusive bound
    Bound(f64),
}

/// `additionalProperties`: permission flag or schema for extra keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` or `false`
    Allowed(bool),
    /// Extra keys must match this schema
    Schema(Box<SchemaNode>),
}

/// A numeric bound with its exclusivity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    /// Bound value
    pub value: f64,
    /// Whether the bound itself is excluded
    pub exclusive: bool,
}

/// A schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Declared type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeDecl>,
    /// Format hint (`date-time`, `email`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Exclusive lower bound or flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Exclusive>,
    /// Exclusive upper bound or flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Exclusive>,
    /// Values must be a multiple of this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    /// Minimum string length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum string length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Regular expression strings must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Closed set of allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Example values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,

    /// Minimum array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    /// Maximum array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    /// Array elements must be distinct
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    /// Element schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    /// Object properties in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    /// Required property names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Policy for undeclared properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// All branches apply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    /// At least one branch applies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    /// Exactly one branch applies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,

    /// Unresolved reference, kept only when a cycle stopped resolution
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// OpenAPI 3.0 nullability
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl SchemaNode {
    /// Node with a single declared type
    #[inline]
    #[must_use]
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(TypeDecl::Single(schema_type)),
            ..Self::default()
        }
    }

    /// Object node with the given properties
    #[must_use]
    pub fn object(properties: impl IntoIterator<Item = (String, SchemaNode)>) -> Self {
        Self {
            properties: properties.into_iter().collect(),
            ..Self::of_type(SchemaType::Object)
        }
    }

    /// Array node with the given element schema
    #[must_use]
    pub fn array_of(items: SchemaNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type(SchemaType::Array)
        }
    }

    /// Set required property names
    #[inline]
    #[must_use]
    pub fn with_required(mut self, required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required = required.into_iter().map(Into::into).collect();
        self
    }

    /// Set inclusive numeric bounds
    #[inline]
    #[must_use]
    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Set string length bounds
    #[inline]
    #[must_use]
    pub fn with_length(mut self, min_length: Option<u64>, max_length: Option<u64>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Set the enum values
    #[inline]
    #[must_use]
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Set the format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the pattern
    #[inline]
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// The type synthesis should produce.
    ///
    /// Unions pick their first non-null member. Untyped nodes are inferred
    /// from `properties`, `items` or the first enum value.
    #[must_use]
    pub fn primary_type(&self) -> Option<SchemaType> {
        match &self.schema_type {
            Some(TypeDecl::Single(t)) => return Some(*t),
            Some(TypeDecl::Union(types)) => {
                if let Some(t) = types.iter().find(|t| **t != SchemaType::Null) {
                    return Some(*t);
                }
                if types.contains(&SchemaType::Null) {
                    return Some(SchemaType::Null);
                }
            }
            None => {}
        }
        if !self.properties.is_empty() || self.additional_properties.is_some() {
            Some(SchemaType::Object)
        } else if self.items.is_some() {
            Some(SchemaType::Array)
        } else {
            self.choices()
                .and_then(|values| values.first())
                .map(SchemaType::of_value)
        }
    }

    /// Whether `null` is an accepted value
    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.nullable
            || matches!(&self.schema_type, Some(TypeDecl::Union(types)) if types.contains(&SchemaType::Null))
            || matches!(&self.schema_type, Some(TypeDecl::Single(SchemaType::Null)))
    }

    /// Enum values, or examples when no enum is declared
    #[must_use]
    pub fn choices(&self) -> Option<&[Value]> {
        self.enum_values
            .as_deref()
            .or(self.examples.as_deref())
            .filter(|values| !values.is_empty())
    }

    /// Effective lower bound, merging `minimum` with `exclusiveMinimum`
    #[must_use]
    pub fn lower_bound(&self) -> Option<Bound> {
        effective_bound(self.minimum, self.exclusive_minimum, f64::max)
    }

    /// Effective upper bound, merging `maximum` with `exclusiveMaximum`
    #[must_use]
    pub fn upper_bound(&self) -> Option<Bound> {
        effective_bound(self.maximum, self.exclusive_maximum, f64::min)
    }

    /// Whether `name` is listed in `required`
    #[inline]
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether undeclared properties are permitted
    #[must_use]
    pub fn permits_additional(&self) -> bool {
        match &self.additional_properties {
            None | Some(AdditionalProperties::Allowed(true) | AdditionalProperties::Schema(_)) => {
                true
            }
            Some(AdditionalProperties::Allowed(false)) => false,
        }
    }

    /// Whether any value-constraining keyword is present
    #[must_use]
    pub fn has_constraints(&self) -> bool {
        self.enum_values.is_some()
            || self.pattern.is_some()
            || self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
            || self.min_length.is_some()
            || self.max_length.is_some()
            || self.min_items.is_some()
            || self.max_items.is_some()
            || !self.required.is_empty()
    }
}

fn effective_bound(
    inclusive: Option<f64>,
    exclusive: Option<Exclusive>,
    tighter: fn(f64, f64) -> f64,
) -> Option<Bound> {
    match (inclusive, exclusive) {
        (Some(value), Some(Exclusive::Flag(true))) => Some(Bound {
            value,
            exclusive: true,
        }),
        (Some(value), None | Some(Exclusive::Flag(false))) => Some(Bound {
            value,
            exclusive: false,
        }),
        (None, Some(Exclusive::Bound(value))) => Some(Bound {
            value,
            exclusive: true,
        }),
        (Some(inc), Some(Exclusive::Bound(exc))) => {
            let value = tighter(inc, exc);
            Some(Bound {
                value,
                exclusive: (value - exc).abs() < f64::EPSILON,
            })
        }
        (None, _) => None,
    }
}
