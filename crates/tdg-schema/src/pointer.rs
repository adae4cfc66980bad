//! JSON pointers for document-local references
//!
//! Provides [`JsonPointer`] for `$ref` values such as `#/components/schemas/Pet`.

use crate::error::SchemaResolutionError;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A parsed document-local JSON pointer
///
/// Segments are stored unescaped: `~1` becomes `/` and `~0` becomes `~`.
///
/// # Examples
/// - `#/components/schemas/Pet` → `["components", "schemas", "Pet"]`
/// - `#/paths/~1pets~1{id}` → `["paths", "/pets/{id}"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// Pointer to the document root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get unescaped segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Append a segment, returning a new pointer
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Locate the pointed-to value in `document`
    #[must_use]
    pub fn locate<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(document, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl FromStr for JsonPointer {
    type Err = SchemaResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(fragment) = s.strip_prefix('#') else {
            return Err(SchemaResolutionError::UnsupportedRef {
                reference: s.to_string(),
            });
        };
        if fragment.is_empty() {
            return Ok(Self::root());
        }
        let Some(body) = fragment.strip_prefix('/') else {
            return Err(SchemaResolutionError::UnsupportedRef {
                reference: s.to_string(),
            });
        };
        Ok(Self(body.split('/').map(unescape).collect()))
    }
}

impl Display for JsonPointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for segment in &self.0 {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}
