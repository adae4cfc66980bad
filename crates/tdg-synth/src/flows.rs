//! Multi-step CRUD flows
//!
//! [`FlowComposer`] groups endpoints by resource (the first path segment)
//! and chains them into create, read, update and delete steps. The create
//! step extracts the new resource's id and name into variables; later
//! steps address the resource as `${created_id}` and assert against the
//! captured values.
//!
//! A flow only exists when a resource has a collection `POST` and at least
//! one item operation to follow it.

use crate::seeded_rng;
use crate::synthesizer::{SchemaSynthesizer, SynthesisMode};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tdg_schema::{Endpoint, HttpMethod};

/// Variable holding the created resource's id
pub const CREATED_ID: &str = "created_id";
/// Variable holding the created resource's name
pub const CREATED_NAME: &str = "created_name";

/// Check run against a step's response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowAssertion {
    /// Response status
    Status {
        /// Expected status code
        #[serde(rename = "statusCode")]
        status_code: u16,
    },
    /// Response field, addressed by a `$.a.b[0]` path
    Field {
        /// Path into the response body
        field: String,
        /// Expected value; strings may reference variables
        equals: Value,
    },
}

/// One request in a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    /// Step name
    pub name: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Path with `${variable}` references
    pub path: String,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Request headers
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    /// Variables captured from the response: name to `$.path`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extract: IndexMap<String, String>,
    /// Checks on the response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<FlowAssertion>,
}

impl FlowStep {
    /// Step without body, extraction or assertions
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            body: None,
            headers: IndexMap::new(),
            extract: IndexMap::new(),
            assertions: Vec::new(),
        }
    }

    /// Set the body
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Capture `$.path` of the response into `variable`
    #[inline]
    #[must_use]
    pub fn with_extract(mut self, variable: impl Into<String>, path: impl Into<String>) -> Self {
        self.extract.insert(variable.into(), path.into());
        self
    }

    /// Add a response check
    #[inline]
    #[must_use]
    pub fn with_assertion(mut self, assertion: FlowAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Path with every known variable substituted
    #[must_use]
    pub fn resolved_path(&self, variables: &IndexMap<String, Value>) -> String {
        resolve_variables(&self.path, variables)
    }

    /// Store the values this step extracts from `response`.
    ///
    /// Paths missing from the response leave their variable untouched.
    pub fn capture(&self, response: &Value, variables: &mut IndexMap<String, Value>) {
        for (variable, path) in &self.extract {
            if let Some(value) = extract_value(response, path) {
                variables.insert(variable.clone(), value.clone());
            }
        }
    }
}

/// An ordered chain of steps sharing variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFlow {
    /// Flow name
    pub name: String,
    /// What the flow exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps in execution order
    pub steps: Vec<FlowStep>,
    /// Initial variable values
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
}

/// Builds CRUD flows from a resolved endpoint list
#[derive(Debug, Clone, Default)]
pub struct FlowComposer {
    synthesizer: Arc<SchemaSynthesizer>,
}

impl FlowComposer {
    /// Composer drawing request bodies from `synthesizer`
    #[must_use]
    pub fn new(synthesizer: Arc<SchemaSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// One flow per resource with more than one step, in first-seen order
    #[must_use]
    pub fn compose(&self, endpoints: &[Endpoint], domain_hint: Option<&str>, seed: Option<u64>) -> Vec<TestFlow> {
        let mut groups: IndexMap<&str, Vec<&Endpoint>> = IndexMap::new();
        for endpoint in endpoints {
            if let Some(resource) = resource_of(&endpoint.path) {
                groups.entry(resource).or_default().push(endpoint);
            }
        }

        let mut rng = seeded_rng(seed);
        let flows: Vec<TestFlow> = groups
            .into_iter()
            .filter_map(|(resource, group)| self.crud_flow(resource, &group, domain_hint, &mut rng))
            .collect();
        tracing::debug!(resources = flows.len(), "composed flows");
        flows
    }

    /// Create, read, update and delete steps for one resource
    #[must_use]
    pub fn crud_flow<R: Rng + ?Sized>(
        &self,
        resource: &str,
        endpoints: &[&Endpoint],
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Option<TestFlow> {
        let create = endpoints
            .iter()
            .find(|e| e.method == HttpMethod::Post && !e.path.contains('{'))?;
        let collection = create.path.trim_end_matches('/');

        let body = self.body_for(create, domain_hint, rng).unwrap_or_else(|| {
            json!({"name": format!("Test {resource}"), "description": "Created by test flow"})
        });
        let mut steps = vec![FlowStep::new(format!("Create {resource}"), HttpMethod::Post, create.path.clone())
            .with_body(body)
            .with_extract(CREATED_ID, "$.id")
            .with_extract(CREATED_NAME, "$.name")];

        if let Some(read) = item_endpoint(endpoints, &[HttpMethod::Get], collection) {
            steps.push(
                FlowStep::new(format!("Get {resource} by ID"), HttpMethod::Get, item_path(&read.path))
                    .with_assertion(FlowAssertion::Field {
                        field: "$.id".into(),
                        equals: json!(format!("${{{CREATED_ID}}}")),
                    })
                    .with_assertion(FlowAssertion::Field {
                        field: "$.name".into(),
                        equals: json!(format!("${{{CREATED_NAME}}}")),
                    }),
            );
        }

        if let Some(update) = item_endpoint(endpoints, &[HttpMethod::Put, HttpMethod::Patch], collection) {
            let body = self.body_for(update, domain_hint, rng).unwrap_or_else(|| {
                json!({"name": format!("Updated {resource}"), "description": "Updated by test flow"})
            });
            steps.push(
                FlowStep::new(format!("Update {resource}"), update.method, item_path(&update.path)).with_body(body),
            );
        }

        if let Some(delete) = item_endpoint(endpoints, &[HttpMethod::Delete], collection) {
            steps.push(
                FlowStep::new(format!("Delete {resource}"), HttpMethod::Delete, item_path(&delete.path))
                    .with_assertion(FlowAssertion::Status {
                        status_code: delete.success_status().unwrap_or(204),
                    }),
            );
        }

        (steps.len() > 1).then(|| TestFlow {
            name: format!("{} CRUD Flow", title_case(resource)),
            description: Some(format!("Create, Read, Update, Delete flow for {resource}")),
            steps,
            variables: IndexMap::new(),
        })
    }

    fn body_for<R: Rng + ?Sized>(&self, endpoint: &Endpoint, domain_hint: Option<&str>, rng: &mut R) -> Option<Value> {
        let schema = endpoint.request_body_schema.as_ref()?;
        Some(self.synthesizer.synthesize(schema, SynthesisMode::Valid, domain_hint, rng))
    }
}

fn resource_of(path: &str) -> Option<&str> {
    path.trim_matches('/').split('/').next().filter(|s| !s.is_empty())
}

/// Item operation of `methods`, preferring `{collection}/{param}` exactly
fn item_endpoint<'a>(endpoints: &[&'a Endpoint], methods: &[HttpMethod], collection: &str) -> Option<&'a Endpoint> {
    let candidates = || {
        endpoints
            .iter()
            .copied()
            .filter(|e| methods.contains(&e.method) && e.path.contains('{'))
    };
    candidates()
        .find(|e| {
            e.path
                .strip_prefix(collection)
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|segment| segment.starts_with('{') && segment.ends_with('}') && !segment.contains('/'))
        })
        .or_else(|| candidates().next())
}

/// `path` with its last `{param}` replaced by the created id
fn item_path(path: &str) -> String {
    match (path.rfind('{'), path.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            format!("{}${{{CREATED_ID}}}{}", &path[..open], &path[close + 1..])
        }
        _ => path.to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replace `${name}` with the value of `name`; unknown names stay as written
#[must_use]
pub fn resolve_variables(text: &str, variables: &IndexMap<String, Value>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + 2 + len];
        out.push_str(&rest[..start]);
        match variables.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + 3 + len]),
        }
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    out
}

/// Value at a `$.a.b[0]` path, or `None` when any segment is missing
#[must_use]
pub fn extract_value<'a>(response: &'a Value, path: &str) -> Option<&'a Value> {
    let rest = path.strip_prefix('$')?;
    let mut current = response;
    for segment in rest.split('.').filter(|s| !s.is_empty()) {
        let (field, indices) = match segment.find('[') {
            Some(at) => (&segment[..at], &segment[at..]),
            None => (segment, ""),
        };
        if !field.is_empty() {
            current = current.get(field)?;
        }
        for index in indices.split('[').filter(|s| !s.is_empty()) {
            let index: usize = index.strip_suffix(']')?.parse().ok()?;
            current = current.get(index)?;
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_item_path_substitutes_last_param() {
        assert_eq!(item_path("/pets/{petId}"), "/pets/${created_id}");
        assert_eq!(item_path("/users/{userId}/posts/{id}"), "/users/{userId}/posts/${created_id}");
        assert_eq!(item_path("/pets"), "/pets");
    }

    #[test]
    fn test_resolve_variables() {
        let variables = vars(&[("created_id", json!(42)), ("created_name", json!("Rex"))]);
        assert_eq!(resolve_variables("/pets/${created_id}", &variables), "/pets/42");
        assert_eq!(resolve_variables("${created_name}!", &variables), "Rex!");
        assert_eq!(resolve_variables("/x/${unknown}/y", &variables), "/x/${unknown}/y");
        assert_eq!(resolve_variables("open ${created_id", &variables), "open ${created_id");
    }

    #[test]
    fn test_extract_value() {
        let response = json!({"data": {"id": "p-1", "tags": [{"name": "a"}, {"name": "b"}]}, "list": [[1, 2]]});
        assert_eq!(extract_value(&response, "$.data.id"), Some(&json!("p-1")));
        assert_eq!(extract_value(&response, "$.data.tags[1].name"), Some(&json!("b")));
        assert_eq!(extract_value(&response, "$.list[0][1]"), Some(&json!(2)));
        assert_eq!(extract_value(&response, "$"), Some(&response));
        assert_eq!(extract_value(&response, "$.data.missing"), None);
        assert_eq!(extract_value(&response, "$.data.tags[9]"), None);
        assert_eq!(extract_value(&response, "data.id"), None);
    }

    #[test]
    fn test_capture_then_resolve() {
        let step = FlowStep::new("Create pets", HttpMethod::Post, "/pets")
            .with_extract(CREATED_ID, "$.id")
            .with_extract(CREATED_NAME, "$.name");
        let mut variables = IndexMap::new();
        step.capture(&json!({"id": 7}), &mut variables);
        assert_eq!(variables, vars(&[("created_id", json!(7))]));

        let read = FlowStep::new("Get pets by ID", HttpMethod::Get, item_path("/pets/{petId}"));
        assert_eq!(read.resolved_path(&variables), "/pets/7");
    }

    #[test]
    fn test_assertion_wire_shape() {
        let status = FlowAssertion::Status { status_code: 204 };
        assert_eq!(serde_json::to_value(&status).unwrap(), json!({"statusCode": 204}));
        let field: FlowAssertion = serde_json::from_value(json!({"field": "$.id", "equals": "${created_id}"})).unwrap();
        assert!(matches!(field, FlowAssertion::Field { .. }));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("pets"), "Pets");
        assert_eq!(title_case(""), "");
    }
}
