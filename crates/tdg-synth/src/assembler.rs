//! Deterministic test case assembly
//!
//! [`CaseAssembler`] turns one endpoint into valid, boundary and negative
//! cases. Counts per type depend on the method, every value comes from the
//! [`SchemaSynthesizer`], and all randomness flows from one RNG so a seed
//! reproduces the whole set.

use crate::case::{TestCase, TestType};
use crate::synthesizer::{SchemaSynthesizer, SynthesisMode};
use crate::{seeded_rng, vocab};
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tdg_schema::{AuthType, Endpoint, HttpMethod, Parameter, ParameterLocation, SchemaType};

/// Number of cases of each type for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseCounts {
    /// Valid cases
    pub valid: usize,
    /// Boundary cases
    pub boundary: usize,
    /// Negative cases
    pub negative: usize,
}

impl CaseCounts {
    /// Split `count` across types.
    ///
    /// POST favours valid cases; every type gets at least one case (bar
    /// valid POST cases for `count < 2`), so small counts may overshoot.
    #[must_use]
    pub fn for_method(method: HttpMethod, count: usize) -> Self {
        if method == HttpMethod::Post {
            let valid = (2 * count / 3).max(count / 2);
            let boundary = (count / 4).max(1);
            let negative = count.saturating_sub(valid + boundary).max(1);
            Self {
                valid,
                boundary,
                negative,
            }
        } else {
            let valid = (count / 2).max(1);
            let boundary = (count / 3).max(1);
            let negative = count.saturating_sub(valid + boundary).max(1);
            Self {
                valid,
                boundary,
                negative,
            }
        }
    }

    /// Total number of cases
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.valid + self.boundary + self.negative
    }
}

/// Ways a negative case breaks a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeScenario {
    /// First required body field removed
    MissingRequired,
    /// Body replaced with a schema violation
    InvalidType,
    /// A parameter dropped or given a bad value
    InvalidParameter,
    /// Credentials removed
    AuthFailure,
}

impl NegativeScenario {
    /// Scenarios picked from uniformly
    pub const PRIMARY: [Self; 3] = [Self::MissingRequired, Self::InvalidType, Self::AuthFailure];

    /// Status the API should answer with
    #[inline]
    #[must_use]
    pub fn expected_status(self) -> u16 {
        match self {
            Self::AuthFailure => 401,
            Self::MissingRequired | Self::InvalidType | Self::InvalidParameter => 400,
        }
    }
}

/// Builds test cases for endpoints
#[derive(Debug, Clone, Default)]
pub struct CaseAssembler {
    synthesizer: Arc<SchemaSynthesizer>,
}

impl CaseAssembler {
    /// Assembler drawing values from `synthesizer`
    #[must_use]
    pub fn new(synthesizer: Arc<SchemaSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Shared synthesizer
    #[inline]
    #[must_use]
    pub fn synthesizer(&self) -> &Arc<SchemaSynthesizer> {
        &self.synthesizer
    }

    /// Assemble cases for `endpoint`; `seed` makes the result reproducible
    #[must_use]
    pub fn assemble(
        &self,
        endpoint: &Endpoint,
        count: usize,
        domain_hint: Option<&str>,
        seed: Option<u64>,
    ) -> Vec<TestCase> {
        let mut rng = seeded_rng(seed);
        self.assemble_with_rng(endpoint, count, domain_hint, &mut rng)
    }

    /// Assemble cases drawing from a caller-owned RNG
    pub fn assemble_with_rng<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        count: usize,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Vec<TestCase> {
        let counts = CaseCounts::for_method(endpoint.method, count);
        let stem = endpoint
            .operation_id
            .clone()
            .unwrap_or_else(|| endpoint.method.as_str().to_string());
        let label = endpoint.label();
        let mut cases = Vec::with_capacity(counts.total());

        for i in 0..counts.valid {
            let case = self
                .base_case(endpoint, format!("Valid_{stem}_{i}"), TestType::Valid, domain_hint, rng)
                .with_description(format!("Valid request for {label}"));
            cases.push(case);
        }

        for i in 0..counts.boundary {
            let mut case = self.base_case(
                endpoint,
                format!("Boundary_{stem}_{i}"),
                TestType::Boundary,
                domain_hint,
                rng,
            );
            if let Some(schema) = &endpoint.request_body_schema {
                case.body = Some(self.synthesizer.synthesize(
                    schema,
                    SynthesisMode::Boundary,
                    domain_hint,
                    rng,
                ));
            }
            cases.push(case.with_description(format!("Boundary values for {label}")));
        }

        for i in 0..counts.negative {
            let case = self.negative_case(endpoint, format!("Negative_{stem}_{i}"), domain_hint, rng);
            cases.push(case);
        }

        tracing::debug!(
            endpoint = %label,
            valid = counts.valid,
            boundary = counts.boundary,
            negative = counts.negative,
            "assembled cases"
        );
        cases
    }

    /// A valid request: credentials, parameters, body and expected response
    fn base_case<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        name: String,
        test_type: TestType,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> TestCase {
        let status = endpoint.success_status().unwrap_or(match endpoint.method {
            HttpMethod::Post => 201,
            _ => 200,
        });
        let mut case = TestCase::new(name, endpoint.method, endpoint.path.clone(), test_type, status);

        if endpoint.request_body_schema.is_some() {
            case.headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
        if let Some((header, value)) = credential(endpoint.auth_type, rng) {
            case.headers.insert(header.to_string(), value);
        }

        let mut cookies = Vec::new();
        for parameter in &endpoint.parameters {
            let include = parameter.location == ParameterLocation::Path
                || parameter.required
                || rng.gen_bool(0.5);
            if !include {
                continue;
            }
            let value = self.parameter_value(parameter, domain_hint, rng);
            match parameter.location {
                ParameterLocation::Path => {
                    case.path_params.insert(parameter.name.clone(), value);
                }
                ParameterLocation::Query => {
                    case.query_params.insert(parameter.name.clone(), value);
                }
                ParameterLocation::Header => {
                    case.headers.insert(parameter.name.clone(), text_of(&value));
                }
                ParameterLocation::Cookie => {
                    cookies.push(format!("{}={}", parameter.name, text_of(&value)));
                }
            }
        }
        if !cookies.is_empty() {
            case.headers.insert("Cookie".to_string(), cookies.join("; "));
        }

        if let Some(schema) = &endpoint.request_body_schema {
            case.body = Some(self.synthesizer.synthesize(
                schema,
                SynthesisMode::Valid,
                domain_hint,
                rng,
            ));
        }
        if let Some(schema) = endpoint.response_schema(status) {
            case.expected_response = Some(self.synthesizer.synthesize(
                schema,
                SynthesisMode::Valid,
                domain_hint,
                rng,
            ));
        }
        case
    }

    fn parameter_value<R: Rng + ?Sized>(
        &self,
        parameter: &Parameter,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Value {
        let schema = &parameter.schema;
        let plain = schema.choices().is_none()
            && schema.format.is_none()
            && !schema.has_constraints()
            && matches!(schema.primary_type(), None | Some(SchemaType::String));
        if !plain {
            return self.synthesizer.synthesize_field(
                schema,
                SynthesisMode::Valid,
                &parameter.name,
                domain_hint,
                rng,
            );
        }

        let name = parameter.name.to_ascii_lowercase();
        if name == "id" || name.ends_with("id") || name.ends_with("_id") {
            Value::String(rng.gen_range(1..=1000).to_string())
        } else if matches!(name.as_str(), "page" | "limit" | "size" | "per_page" | "offset") {
            Value::String(rng.gen_range(1..=100).to_string())
        } else if matches!(name.as_str(), "sort" | "order") {
            json!(["asc", "desc"].choose(rng).copied().unwrap_or("asc"))
        } else {
            Value::String(format!("test_{}", parameter.name))
        }
    }

    fn negative_case<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        name: String,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> TestCase {
        let mut case = self.base_case(endpoint, name, TestType::Negative, domain_hint, rng);
        case.expected_response = None;

        let scenario = NegativeScenario::PRIMARY
            .choose(rng)
            .copied()
            .unwrap_or(NegativeScenario::InvalidType);
        let (applied, detail) = self.break_request(endpoint, &mut case, scenario, domain_hint, rng);
        case.expected_status = applied.expected_status();
        case.description = Some(format!("{detail} for {}", endpoint.label()));
        case
    }

    /// Apply `scenario`, degrading to the next applicable one
    fn break_request<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        case: &mut TestCase,
        scenario: NegativeScenario,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> (NegativeScenario, String) {
        let body_schema = endpoint.request_body_schema.as_ref();

        if scenario == NegativeScenario::MissingRequired {
            if let Some(field) = body_schema.and_then(|s| s.required.first()) {
                if let Some(Value::Object(body)) = &mut case.body {
                    body.remove(field);
                }
                return (
                    NegativeScenario::MissingRequired,
                    format!("Missing required field '{field}'"),
                );
            }
        }

        let wants_auth = scenario == NegativeScenario::AuthFailure;
        if wants_auth && endpoint.auth_type.is_required() {
            strip_credentials(case);
            return (NegativeScenario::AuthFailure, "Missing credentials".to_string());
        }

        if let Some(schema) = body_schema {
            case.body = Some(self.synthesizer.synthesize(
                schema,
                SynthesisMode::Negative,
                domain_hint,
                rng,
            ));
            return (NegativeScenario::InvalidType, "Invalid request body".to_string());
        }

        if let Some(detail) = self.break_parameter(endpoint, case, domain_hint, rng) {
            return (NegativeScenario::InvalidParameter, detail);
        }

        strip_credentials(case);
        (NegativeScenario::AuthFailure, "Missing credentials".to_string())
    }

    /// Drop a required query/header parameter, else give one a bad value
    fn break_parameter<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        case: &mut TestCase,
        domain_hint: Option<&str>,
        rng: &mut R,
    ) -> Option<String> {
        let dropped = endpoint.parameters.iter().find(|p| {
            p.required && matches!(p.location, ParameterLocation::Query | ParameterLocation::Header)
        });
        if let Some(parameter) = dropped {
            match parameter.location {
                ParameterLocation::Query => {
                    case.query_params.shift_remove(&parameter.name);
                }
                _ => {
                    case.headers.shift_remove(&parameter.name);
                }
            }
            return Some(format!("Missing required parameter '{}'", parameter.name));
        }

        let parameter = endpoint.parameters.iter().find(|p| {
            p.location != ParameterLocation::Cookie
                && (p.schema.has_constraints()
                    || p.schema.format.is_some()
                    || p.schema
                        .primary_type()
                        .is_some_and(|t| t != SchemaType::String))
        })?;
        let value = self.synthesizer.synthesize_field(
            &parameter.schema,
            SynthesisMode::Negative,
            &parameter.name,
            domain_hint,
            rng,
        );
        let key = parameter.name.clone();
        match parameter.location {
            ParameterLocation::Path => {
                case.path_params.insert(key, value);
            }
            ParameterLocation::Query => {
                case.query_params.insert(key, value);
            }
            _ => {
                case.headers.insert(key, text_of(&value));
            }
        }
        Some(format!("Invalid value for parameter '{}'", parameter.name))
    }
}

/// Stable sort by method rank, then test type rank
pub fn order_cases(cases: &mut [TestCase]) {
    cases.sort_by_key(|case| (case.method.crud_rank(), case.test_type.rank()));
}

fn credential<R: Rng + ?Sized>(auth: AuthType, rng: &mut R) -> Option<(&'static str, String)> {
    match auth {
        AuthType::None => None,
        AuthType::Bearer | AuthType::OAuth2 => {
            Some(("Authorization", format!("Bearer {}", token(rng, 32))))
        }
        AuthType::Basic => {
            let pair = format!("{}:{}", vocab::word(rng), token(rng, 12));
            let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
            Some(("Authorization", format!("Basic {encoded}")))
        }
        AuthType::ApiKey => Some(("X-API-Key", token(rng, 32))),
    }
}

fn strip_credentials(case: &mut TestCase) {
    case.headers.shift_remove("Authorization");
    case.headers.shift_remove("X-API-Key");
}

fn token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tdg_schema::SchemaNode;

    fn pet_schema() -> SchemaNode {
        serde_json::from_value(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1, "maxLength": 50},
                "age": {"type": "integer", "minimum": 0, "maximum": 30}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_counts() {
        assert_eq!(
            CaseCounts::for_method(HttpMethod::Post, 10),
            CaseCounts { valid: 6, boundary: 2, negative: 2 }
        );
        assert_eq!(
            CaseCounts::for_method(HttpMethod::Get, 10),
            CaseCounts { valid: 5, boundary: 3, negative: 2 }
        );
        assert_eq!(CaseCounts::for_method(HttpMethod::Get, 1).total(), 3);
    }

    #[test]
    fn test_credentials_match_auth() {
        let endpoint = Endpoint::new(HttpMethod::Get, "/me").with_auth(AuthType::Basic);
        let cases = CaseAssembler::default().assemble(&endpoint, 4, None, Some(1));
        let valid = cases.iter().find(|c| c.test_type == TestType::Valid).unwrap();
        assert!(valid.headers["Authorization"].starts_with("Basic "));
    }

    #[test]
    fn test_declared_success_status() {
        let endpoint = Endpoint::new(HttpMethod::Post, "/pets")
            .with_body(pet_schema())
            .with_response("202", Some(pet_schema()));
        let cases = CaseAssembler::default().assemble(&endpoint, 6, None, Some(3));
        for case in cases.iter().filter(|c| c.test_type == TestType::Valid) {
            assert_eq!(case.expected_status, 202);
            assert!(case.expected_response.as_ref().unwrap()["name"].is_string());
        }
    }

    #[test]
    fn test_negative_without_body_or_auth_breaks_parameter() {
        let endpoint = Endpoint::new(HttpMethod::Get, "/pets").with_parameter(
            Parameter::new(
                "limit",
                ParameterLocation::Query,
                SchemaNode::of_type(SchemaType::Integer).with_range(Some(1.0), Some(50.0)),
            )
            .required(),
        );
        let cases = CaseAssembler::default().assemble(&endpoint, 10, None, Some(8));
        for case in cases.iter().filter(|c| c.test_type == TestType::Negative) {
            assert_eq!(case.expected_status, 400);
            assert!(!case.query_params.contains_key("limit"));
        }
    }

    #[test]
    fn test_order_cases_is_stable() {
        let mut cases = vec![
            TestCase::new("d", HttpMethod::Delete, "/a", TestType::Valid, 200),
            TestCase::new("g-neg", HttpMethod::Get, "/a", TestType::Negative, 400),
            TestCase::new("g1", HttpMethod::Get, "/a", TestType::Valid, 200),
            TestCase::new("p", HttpMethod::Post, "/a", TestType::Boundary, 201),
            TestCase::new("g2", HttpMethod::Get, "/a", TestType::Valid, 200),
        ];
        order_cases(&mut cases);
        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["p", "g1", "g2", "g-neg", "d"]);
    }
}
