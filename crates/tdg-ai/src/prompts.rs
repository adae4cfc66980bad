//! Prompt construction

use crate::options::GenerationOptions;
use serde_json::{json, Value};
use tdg_schema::Endpoint;
use tdg_synth::{Domain, TestCase};

/// System instruction sent with every request
pub const SYSTEM_PROMPT: &str =
    "You are a test data generation expert. Generate test cases as valid JSON.";

/// Guidance paragraph for the detected domain
#[must_use]
pub fn domain_guidance(domain_hint: Option<&str>) -> &'static str {
    match domain_hint.and_then(Domain::detect) {
        Some(Domain::Pet) => {
            "Pet Store Domain Guidance:\n\
             - Use realistic pet names: Buddy, Luna, Max, Bella, Charlie, Daisy\n\
             - Use realistic categories (Dogs, Cats, Birds) and statuses (available, pending, sold)\n\
             - Test invalid pet data: negative ages, invalid statuses, malformed photo URLs"
        }
        Some(Domain::Ecommerce) => {
            "E-commerce Domain Guidance:\n\
             - Use realistic product names, prices, categories and SKUs\n\
             - Test price boundaries: 0.01, 999999.99, negative prices\n\
             - Test inventory scenarios: in stock, out of stock, low stock"
        }
        Some(Domain::User) => {
            "User Management Domain Guidance:\n\
             - Use realistic names, emails, phone numbers and usernames\n\
             - Test password complexity and email format rules\n\
             - Test authentication scenarios: valid and invalid credentials"
        }
        Some(Domain::Finance) => {
            "Financial Domain Guidance:\n\
             - Use realistic amounts, currencies (USD, EUR, GBP, JPY) and account numbers\n\
             - Test monetary boundaries: 0.01, 999999.99, negative amounts\n\
             - Test payment method validation"
        }
        Some(Domain::Healthcare) => {
            "Healthcare Domain Guidance:\n\
             - Use realistic patient names, medical terms and record numbers\n\
             - Use realistic birth and appointment dates\n\
             - Test appointment scheduling edge cases"
        }
        Some(Domain::Social) => {
            "Social Media Domain Guidance:\n\
             - Use realistic usernames, post content and hashtags\n\
             - Test username format rules and post length limits\n\
             - Test content moderation scenarios"
        }
        None => {
            "General API Domain Guidance:\n\
             - Use realistic, contextually appropriate data\n\
             - Keep data consistent across related test cases\n\
             - Cover both happy paths and error scenarios"
        }
    }
}

fn describe_endpoint(endpoint: &Endpoint) -> Value {
    json!({
        "method": endpoint.method,
        "path": endpoint.path,
        "operation_id": endpoint.operation_id,
        "description": endpoint.description.as_ref().or(endpoint.summary.as_ref()),
        "parameters": endpoint.parameters,
        "request_body": endpoint.request_body_schema,
        "responses": endpoint.responses,
        "auth": endpoint.auth_type,
    })
}

/// Prompt asking for a full case set for `endpoint`
#[must_use]
pub fn generation_prompt(endpoint: &Endpoint, options: &GenerationOptions) -> String {
    let count = options.case_count();
    let details = serde_json::to_string_pretty(&describe_endpoint(endpoint)).unwrap_or_default();
    let domain = options.domain().unwrap_or("General API");
    let guidance = domain_guidance(options.domain());
    let valid = (count / 2).max(1);
    let boundary = (count / 3).max(1);

    format!(
        r#"Generate {count} comprehensive test cases for the following API endpoint.

Endpoint Details:
{details}

Domain Context: {domain}

{guidance}

Requirements:
1. Mix test types:
   - Valid cases (at least {valid}): realistic, expected inputs
   - Boundary cases ({boundary}): limits and edge values
   - Negative cases (remaining): missing required fields, type mismatches, invalid formats, invalid enum values, authentication failures
2. Each case has: name, description, headers, query_params, path_params, body (if applicable), expected_status, test_type ("valid", "boundary" or "negative").
3. Use realistic values for the domain.

Return a JSON object with a "cases" array, for example:
{{
  "cases": [
    {{
      "name": "create_valid_resource",
      "description": "Creates a resource with all required fields",
      "headers": {{"Content-Type": "application/json"}},
      "query_params": {{}},
      "path_params": {{}},
      "body": {{"name": "Sarah Johnson"}},
      "expected_status": 201,
      "test_type": "valid"
    }}
  ]
}}"#
    )
}

/// Prompt asking for 2-3 cases that extend `foundation`
#[must_use]
pub fn enhancement_prompt(endpoint: &Endpoint, foundation: &[TestCase], domain_hint: Option<&str>) -> String {
    let cases: Vec<Value> = foundation
        .iter()
        .map(|case| {
            json!({
                "name": case.name,
                "test_type": case.test_type,
                "expected_status": case.expected_status,
                "body": case.body,
                "query_params": case.query_params,
                "path_params": case.path_params,
            })
        })
        .collect();
    let foundation_json = serde_json::to_string_pretty(&cases).unwrap_or_default();
    let summary = endpoint
        .summary
        .as_deref()
        .or(endpoint.description.as_deref())
        .unwrap_or("N/A");

    format!(
        r#"I have foundation test cases for an API endpoint. Add 2-3 new cases with domain-specific values and edge cases they miss.

ENDPOINT:
- Method: {method}
- Path: {path}
- Domain: {domain}
- Description: {summary}

{guidance}

FOUNDATION TEST CASES:
{foundation_json}

Return ONLY a JSON array of new cases. Each case has name, method, path, test_type ("valid", "boundary" or "negative"), expected_status, and where applicable body, query_params, path_params and headers."#,
        method = endpoint.method,
        path = endpoint.path,
        domain = domain_hint.unwrap_or("General"),
        guidance = domain_guidance(domain_hint),
    )
}
