//! Normalized endpoint records
//!
//! Everything downstream of the resolver works on these types. They are
//! created once per document and never mutated afterwards.

use crate::schema::SchemaNode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// HTTP methods an OpenAPI path item can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Methods in the order endpoints are emitted for a path item
    pub const DOCUMENT_ORDER: [HttpMethod; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Head,
        Self::Options,
    ];

    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Key used for this method inside an OpenAPI path item
    #[must_use]
    pub fn path_item_key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }

    /// Parse a method name, case-insensitively
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::DOCUMENT_ORDER
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    /// Create-read-update-delete rank used to order generated cases.
    ///
    /// POST < GET < PUT/PATCH < DELETE < everything else.
    #[must_use]
    pub fn crud_rank(self) -> u8 {
        match self {
            Self::Post => 0,
            Self::Get => 1,
            Self::Put | Self::Patch => 2,
            Self::Delete => 3,
            Self::Head | Self::Options => 4,
        }
    }

    /// Whether requests with this method conventionally carry a body
    #[must_use]
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Templated into the path
    Path,
    /// Query string
    Query,
    /// Request header
    Header,
    /// Cookie
    Cookie,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// An operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Location
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter must be sent
    #[serde(default)]
    pub required: bool,
    /// Value schema
    #[serde(default)]
    pub schema: SchemaNode,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Create a parameter. Path parameters are always required.
    #[must_use]
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParameterLocation::Path,
            schema,
            description: None,
        }
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Authentication an endpoint expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthType {
    /// No authentication
    #[default]
    #[serde(rename = "none")]
    None,
    /// HTTP bearer token
    #[serde(rename = "bearer")]
    Bearer,
    /// HTTP basic credentials
    #[serde(rename = "basic")]
    Basic,
    /// API key
    #[serde(rename = "apiKey")]
    ApiKey,
    /// OAuth2 or OpenID Connect
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl AuthType {
    /// Whether requests need credentials
    #[inline]
    #[must_use]
    pub fn is_required(self) -> bool {
        self != Self::None
    }
}

/// A declared response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Response description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON body schema, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// One (path, method) operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// HTTP method
    pub method: HttpMethod,
    /// Path template, e.g. `/pets/{petId}`
    pub path: String,
    /// `operationId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Merged path-level and operation-level parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// JSON request body schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_schema: Option<SchemaNode>,
    /// Responses keyed by status code string
    #[serde(default)]
    pub responses: IndexMap<String, ResponseSpec>,
    /// Detected authentication
    #[serde(default)]
    pub auth_type: AuthType,
    /// Operation tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Endpoint {
    /// Minimal endpoint with no parameters, body or responses
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: None,
            summary: None,
            description: None,
            parameters: Vec::new(),
            request_body_schema: None,
            responses: IndexMap::new(),
            auth_type: AuthType::None,
            tags: Vec::new(),
        }
    }

    /// Set the operation id
    #[inline]
    #[must_use]
    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Add a parameter
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the request body schema
    #[inline]
    #[must_use]
    pub fn with_body(mut self, schema: SchemaNode) -> Self {
        self.request_body_schema = Some(schema);
        self
    }

    /// Declare a response
    #[inline]
    #[must_use]
    pub fn with_response(mut self, status: impl Into<String>, schema: Option<SchemaNode>) -> Self {
        self.responses.insert(
            status.into(),
            ResponseSpec {
                description: None,
                schema,
            },
        );
        self
    }

    /// Set the authentication type
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// `METHOD /path`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Parameters declared at `location`
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    /// Lowest declared 2xx status code
    #[must_use]
    pub fn success_status(&self) -> Option<u16> {
        self.responses
            .keys()
            .filter_map(|code| code.parse::<u16>().ok())
            .filter(|code| (200..300).contains(code))
            .min()
    }

    /// Schema of the response for `status`
    #[must_use]
    pub fn response_schema(&self, status: u16) -> Option<&SchemaNode> {
        self.responses
            .get(status.to_string().as_str())
            .and_then(|r| r.schema.as_ref())
    }
}

/// A whole document after normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedApi {
    /// `info.title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `info.version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Endpoints in document order
    pub endpoints: Vec<Endpoint>,
}
