//! `$ref` resolution and endpoint normalization
//!
//! [`SchemaResolver`] walks a raw OpenAPI document and produces
//! [`Endpoint`] records with every document-local reference inlined.
//!
//! # Cycles
//!
//! Pointers currently being resolved are tracked on a stack. When a pointer
//! is reached again while still on that stack, resolution stops there and a
//! shallow copy of the target is used: its scalar keywords survive but its
//! nested sub-schemas are dropped. Fully resolved pointers are memoized for
//! the lifetime of the resolver.

use crate::endpoint::{
    AuthType, Endpoint, HttpMethod, NormalizedApi, Parameter, ParameterLocation, ResponseSpec,
};
use crate::error::SchemaResolutionError;
use crate::pointer::JsonPointer;
use crate::schema::{SchemaNode, SchemaType};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Keywords holding a single sub-schema
const SCHEMA_KEYS: [&str; 3] = ["items", "additionalProperties", "not"];

/// Keywords holding a list of sub-schemas
const SCHEMA_LIST_KEYS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// Guard against `$ref` chains on non-schema objects (parameters, bodies)
const MAX_DEREF_CHAIN: usize = 32;

/// Resolves references against one document
#[derive(Debug)]
pub struct SchemaResolver<'doc> {
    document: &'doc Value,
    resolved: HashMap<String, Value>,
    in_progress: Vec<String>,
}

impl<'doc> SchemaResolver<'doc> {
    /// Create a resolver for `document`
    #[must_use]
    pub fn new(document: &'doc Value) -> Self {
        Self {
            document,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Number of pointers resolved so far
    #[inline]
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Resolve every `$ref` in a schema value.
    ///
    /// Sibling keywords next to a `$ref` are overlaid on the target.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaResolutionError`] for dangling or external references.
    pub fn resolve_value(&mut self, schema: &Value) -> Result<Value, SchemaResolutionError> {
        let Value::Object(map) = schema else {
            return Ok(schema.clone());
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            let mut target = self.resolve_pointer(reference)?;
            if map.len() > 1 {
                if let Value::Object(target_map) = &mut target {
                    for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "$ref") {
                        target_map.insert(key.clone(), self.resolve_keyword(key, value)?);
                    }
                }
            }
            return Ok(target);
        }

        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            out.insert(key.clone(), self.resolve_keyword(key, value)?);
        }
        Ok(Value::Object(out))
    }

    /// Resolve a schema value and convert it into a [`SchemaNode`]
    ///
    /// # Errors
    ///
    /// Propagates reference errors; returns
    /// [`SchemaResolutionError::MalformedSchema`] if the resolved value does
    /// not fit the schema model.
    pub fn resolve_schema(
        &mut self,
        schema: &Value,
        location: &str,
    ) -> Result<SchemaNode, SchemaResolutionError> {
        let resolved = self.resolve_value(schema)?;
        serde_json::from_value(resolved).map_err(|source| SchemaResolutionError::MalformedSchema {
            location: location.to_string(),
            source,
        })
    }

    /// Normalize the whole document into endpoints
    ///
    /// # Errors
    ///
    /// Returns [`SchemaResolutionError`] if the document is malformed or a
    /// reference cannot be resolved.
    pub fn normalize(&mut self) -> Result<NormalizedApi, SchemaResolutionError> {
        let document = self.document;
        let Value::Object(root) = document else {
            return Err(SchemaResolutionError::malformed("#", "document must be an object"));
        };

        let info = root.get("info");
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .map(String::from);
        let version = info
            .and_then(|i| i.get("version"))
            .and_then(Value::as_str)
            .map(String::from);

        let mut endpoints = Vec::new();
        match root.get("paths") {
            None | Some(Value::Null) => {}
            Some(Value::Object(paths)) => {
                for (path, item) in paths {
                    let location = JsonPointer::root().child("paths").child(path.as_str());
                    let item = self.deref_object(item, &location.to_string())?;
                    endpoints.extend(self.path_endpoints(path, &item, &location)?);
                }
            }
            Some(_) => {
                return Err(SchemaResolutionError::malformed(
                    "#/paths",
                    "expected an object",
                ))
            }
        }

        tracing::debug!(
            endpoints = endpoints.len(),
            refs = self.resolved.len(),
            "normalized document"
        );

        Ok(NormalizedApi {
            title,
            version,
            endpoints,
        })
    }

    fn resolve_keyword(&mut self, key: &str, value: &Value) -> Result<Value, SchemaResolutionError> {
        if key == "properties" {
            if let Value::Object(props) = value {
                let mut out = Map::with_capacity(props.len());
                for (name, prop) in props {
                    out.insert(name.clone(), self.resolve_value(prop)?);
                }
                return Ok(Value::Object(out));
            }
        } else if SCHEMA_KEYS.contains(&key) {
            return self.resolve_value(value);
        } else if SCHEMA_LIST_KEYS.contains(&key) {
            if let Value::Array(branches) = value {
                return branches
                    .iter()
                    .map(|b| self.resolve_value(b))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array);
            }
        }
        Ok(value.clone())
    }

    fn resolve_pointer(&mut self, reference: &str) -> Result<Value, SchemaResolutionError> {
        if let Some(done) = self.resolved.get(reference) {
            return Ok(done.clone());
        }

        let pointer: JsonPointer = reference.parse()?;
        let target = pointer
            .locate(self.document)
            .ok_or_else(|| SchemaResolutionError::UnresolvedRef {
                pointer: reference.to_string(),
            })?;

        if self.in_progress.iter().any(|p| p == reference) {
            tracing::debug!(pointer = reference, "reference cycle, using shallow shape");
            return Ok(shallow_shape(target));
        }

        self.in_progress.push(reference.to_string());
        let result = self.resolve_value(target);
        self.in_progress.pop();

        let value = result?;
        self.resolved.insert(reference.to_string(), value.clone());
        Ok(value)
    }

    /// Follow `$ref` on a non-schema object (path item, parameter, body, response)
    fn deref_object(&self, value: &Value, location: &str) -> Result<Value, SchemaResolutionError> {
        let mut current = value;
        for _ in 0..MAX_DEREF_CHAIN {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Ok(current.clone());
            };
            let pointer: JsonPointer = reference.parse()?;
            current =
                pointer
                    .locate(self.document)
                    .ok_or_else(|| SchemaResolutionError::UnresolvedRef {
                        pointer: reference.to_string(),
                    })?;
        }
        Err(SchemaResolutionError::malformed(
            location,
            "reference chain does not terminate",
        ))
    }

    fn path_endpoints(
        &mut self,
        path: &str,
        item: &Value,
        location: &JsonPointer,
    ) -> Result<Vec<Endpoint>, SchemaResolutionError> {
        let Value::Object(item_map) = item else {
            return Err(SchemaResolutionError::malformed(
                location.to_string(),
                "path item must be an object",
            ));
        };

        let shared = self.parameters(item_map.get("parameters"), &location.child("parameters"))?;

        let mut endpoints = Vec::new();
        for method in HttpMethod::DOCUMENT_ORDER {
            let Some(operation) = item_map.get(method.path_item_key()) else {
                continue;
            };
            let op_location = location.child(method.path_item_key());
            let Value::Object(op) = operation else {
                return Err(SchemaResolutionError::malformed(
                    op_location.to_string(),
                    "operation must be an object",
                ));
            };
            endpoints.push(self.endpoint(path, method, op, &shared, &op_location)?);
        }
        Ok(endpoints)
    }

    fn endpoint(
        &mut self,
        path: &str,
        method: HttpMethod,
        op: &Map<String, Value>,
        shared: &[Parameter],
        location: &JsonPointer,
    ) -> Result<Endpoint, SchemaResolutionError> {
        let own = self.parameters(op.get("parameters"), &location.child("parameters"))?;
        let parameters = merge_parameters(shared, own);

        let request_body_schema = match op.get("requestBody") {
            Some(body) => {
                let body_location = location.child("requestBody");
                let body = self.deref_object(body, &body_location.to_string())?;
                self.media_schema(&body, &body_location)?
            }
            None => None,
        };

        let mut responses = IndexMap::new();
        if let Some(Value::Object(declared)) = op.get("responses") {
            for (status, response) in declared {
                let resp_location = location.child("responses").child(status.as_str());
                let response = self.deref_object(response, &resp_location.to_string())?;
                let schema = self.media_schema(&response, &resp_location)?;
                responses.insert(
                    status.clone(),
                    ResponseSpec {
                        description: string_field(&response, "description"),
                        schema,
                    },
                );
            }
        }

        let tags = op
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Endpoint {
            method,
            path: path.to_string(),
            operation_id: op.get("operationId").and_then(Value::as_str).map(String::from),
            summary: op.get("summary").and_then(Value::as_str).map(String::from),
            description: op.get("description").and_then(Value::as_str).map(String::from),
            parameters,
            request_body_schema,
            responses,
            auth_type: self.detect_auth(op.get("security")),
            tags,
        })
    }

    fn parameters(
        &mut self,
        declared: Option<&Value>,
        location: &JsonPointer,
    ) -> Result<Vec<Parameter>, SchemaResolutionError> {
        let Some(declared) = declared else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = declared else {
            return Err(SchemaResolutionError::malformed(
                location.to_string(),
                "parameters must be an array",
            ));
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, raw) in items.iter().enumerate() {
            let param_location = location.child(index.to_string());
            let param = self.deref_object(raw, &param_location.to_string())?;
            out.push(self.parameter(&param, &param_location)?);
        }
        Ok(out)
    }

    fn parameter(
        &mut self,
        param: &Value,
        location: &JsonPointer,
    ) -> Result<Parameter, SchemaResolutionError> {
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaResolutionError::malformed(location.to_string(), "missing name"))?;
        let location_name = param.get("in").and_then(Value::as_str).unwrap_or_default();
        let param_in = ParameterLocation::parse(location_name).ok_or_else(|| {
            SchemaResolutionError::malformed(
                location.to_string(),
                format!("invalid parameter location '{location_name}'"),
            )
        })?;

        let schema = if let Some(schema) = param.get("schema") {
            self.resolve_schema(schema, &location.child("schema").to_string())?
        } else {
            self.media_schema(param, location)?
                .unwrap_or_else(|| SchemaNode::of_type(SchemaType::String))
        };

        let required = param_in == ParameterLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);

        Ok(Parameter {
            name: name.to_string(),
            location: param_in,
            required,
            schema,
            description: string_field(param, "description"),
        })
    }

    /// Schema of the JSON media type in an object's `content`
    fn media_schema(
        &mut self,
        holder: &Value,
        location: &JsonPointer,
    ) -> Result<Option<SchemaNode>, SchemaResolutionError> {
        let Some(Value::Object(content)) = holder.get("content") else {
            return Ok(None);
        };
        let chosen = content
            .get_key_value("application/json")
            .or_else(|| content.iter().find(|(media, _)| is_json_media_type(media)));
        let Some((media, media_obj)) = chosen else {
            return Ok(None);
        };
        match media_obj.get("schema") {
            Some(schema) => {
                let schema_location = location
                    .child("content")
                    .child(media.as_str())
                    .child("schema");
                self.resolve_schema(schema, &schema_location.to_string())
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn detect_auth(&self, operation_security: Option<&Value>) -> AuthType {
        let security = operation_security.or_else(|| self.document.get("security"));
        let Some(Value::Array(requirements)) = security else {
            return AuthType::None;
        };
        let Some(scheme_name) = requirements
            .first()
            .and_then(Value::as_object)
            .and_then(|req| req.keys().next())
        else {
            return AuthType::None;
        };

        let scheme = self
            .document
            .pointer("/components/securitySchemes")
            .and_then(|schemes| schemes.get(scheme_name));
        let Some(scheme) = scheme else {
            tracing::debug!(scheme = scheme_name.as_str(), "unknown security scheme");
            return AuthType::None;
        };
        let Ok(scheme) = self.deref_object(scheme, "#/components/securitySchemes") else {
            return AuthType::None;
        };

        match scheme.get("type").and_then(Value::as_str) {
            Some("http") => match scheme
                .get("scheme")
                .and_then(Value::as_str)
                .map(str::to_ascii_lowercase)
                .as_deref()
            {
                Some("bearer") => AuthType::Bearer,
                Some("basic") => AuthType::Basic,
                _ => AuthType::None,
            },
            Some("apiKey") => AuthType::ApiKey,
            Some("oauth2" | "openIdConnect") => AuthType::OAuth2,
            _ => AuthType::None,
        }
    }
}

/// Normalize `document` with a fresh resolver
///
/// # Errors
///
/// See [`SchemaResolver::normalize`].
pub fn normalize_document(document: &Value) -> Result<NormalizedApi, SchemaResolutionError> {
    SchemaResolver::new(document).normalize()
}

/// Whether a media type carries JSON
#[must_use]
pub fn is_json_media_type(media: &str) -> bool {
    let essence = media.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
}

/// Operation parameters replace path parameters with the same name and location
fn merge_parameters(shared: &[Parameter], own: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = shared
        .iter()
        .filter(|s| {
            !own.iter()
                .any(|o| o.name == s.name && o.location == s.location)
        })
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

fn shallow_shape(target: &Value) -> Value {
    let Value::Object(map) = target else {
        return target.clone();
    };
    let shape: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            key != "properties"
                && key != "required"
                && key != "$ref"
                && !SCHEMA_KEYS.contains(&key)
                && !SCHEMA_LIST_KEYS.contains(&key)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(shape)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}
