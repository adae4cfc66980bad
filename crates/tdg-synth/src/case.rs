//! Test case model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tdg_schema::HttpMethod;

/// Category of a test case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// Request satisfies the schema
    #[default]
    Valid,
    /// Request sits on a declared edge
    Boundary,
    /// Request must be rejected
    Negative,
}

impl TestType {
    /// All types in rank order
    pub const ALL: [Self; 3] = [Self::Valid, Self::Boundary, Self::Negative];

    /// Sort rank within one method: valid, boundary, negative
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::Boundary => 1,
            Self::Negative => 2,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Boundary => "boundary",
            Self::Negative => "negative",
        }
    }

    /// Lenient parse of model-produced labels
    ///
    /// Accepts common synonyms (`positive`, `edge`, `invalid`, `error`).
    #[must_use]
    pub fn parse_lenient(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "valid" | "positive" | "happy" | "happy_path" => Some(Self::Valid),
            "boundary" | "edge" | "edge_case" | "limit" => Some(Self::Boundary),
            "negative" | "invalid" | "error" | "failure" => Some(Self::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executable API test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique-ish case name
    pub name: String,
    /// What the case checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP method
    pub method: HttpMethod,
    /// Path template
    pub path: String,
    /// Request headers
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Query parameters
    #[serde(default)]
    pub query_params: IndexMap<String, Value>,
    /// Path parameters
    #[serde(default)]
    pub path_params: IndexMap<String, Value>,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Expected HTTP status
    pub expected_status: u16,
    /// Expected response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<Value>,
    /// Case category
    #[serde(default)]
    pub test_type: TestType,
}

impl TestCase {
    /// Empty case for `method path`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        test_type: TestType,
        expected_status: u16,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            method,
            path: path.into(),
            headers: IndexMap::new(),
            query_params: IndexMap::new(),
            path_params: IndexMap::new(),
            body: None,
            expected_status,
            expected_response: None,
            test_type,
        }
    }

    /// Set the description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the body
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether the expected status is a client error
    #[inline]
    #[must_use]
    pub fn expects_client_error(&self) -> bool {
        (400..500).contains(&self.expected_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let case = TestCase::new("Valid_getPet_0", HttpMethod::Get, "/pets/{id}", TestType::Valid, 200);
        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Valid_getPet_0",
                "method": "GET",
                "path": "/pets/{id}",
                "headers": {},
                "query_params": {},
                "path_params": {},
                "expected_status": 200,
                "test_type": "valid"
            })
        );
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let case: TestCase = serde_json::from_value(json!({
            "name": "x", "method": "POST", "path": "/a", "expected_status": 400
        }))
        .unwrap();
        assert_eq!(case.test_type, TestType::Valid);
        assert!(case.headers.is_empty());
        assert!(case.expects_client_error());
    }

    #[test]
    fn test_lenient_labels() {
        assert_eq!(TestType::parse_lenient(" Edge "), Some(TestType::Boundary));
        assert_eq!(TestType::parse_lenient("invalid"), Some(TestType::Negative));
        assert_eq!(TestType::parse_lenient("smoke"), None);
    }
}
