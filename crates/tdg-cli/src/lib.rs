//! Helpers behind the `tdg` binary: document and config loading, endpoint
//! listing.

#![warn(unreachable_pub)]

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use tdg_core::GeneratorConfig;
use tdg_schema::{AuthType, Endpoint};

/// Read an OpenAPI document from a `.json`, `.yaml` or `.yml` file.
///
/// Files with another extension are tried as JSON, then YAML.
///
/// # Errors
///
/// Unreadable files, unparsable content, or a document that is not an
/// object.
pub fn load_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let document: Value = match extension.as_deref() {
        Some("json") => serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?,
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
        }
        _ => match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(&text)
                .with_context(|| format!("{} is neither JSON nor YAML", path.display()))?,
        },
    };

    if !document.is_object() {
        bail!("{} does not contain an OpenAPI object", path.display());
    }
    Ok(document)
}

/// Configuration from `path` (or defaults), overlaid with the environment
///
/// # Errors
///
/// Unreadable or invalid configuration.
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let config = match path {
        Some(path) => GeneratorConfig::from_toml_file(path)?,
        None => GeneratorConfig::default(),
    };
    let config = config.apply_env()?;
    config.validate()?;
    Ok(config)
}

/// One line per endpoint: label, operation id and auth scheme
#[must_use]
pub fn endpoint_lines(endpoints: &[Endpoint]) -> Vec<String> {
    let width = endpoints.iter().map(|e| e.label().len()).max().unwrap_or(0);
    endpoints
        .iter()
        .map(|endpoint| {
            format!(
                "{:<width$}  {:<20}  {}",
                endpoint.label(),
                endpoint.operation_id.as_deref().unwrap_or("-"),
                auth_label(endpoint.auth_type),
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

fn auth_label(auth: AuthType) -> &'static str {
    match auth {
        AuthType::None => "none",
        AuthType::Bearer => "bearer",
        AuthType::Basic => "basic",
        AuthType::ApiKey => "apiKey",
        AuthType::OAuth2 => "oauth2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tdg_schema::HttpMethod;

    #[test]
    fn test_endpoint_lines_align() {
        let endpoints = vec![
            Endpoint::new(HttpMethod::Get, "/pets").with_operation_id("listPets"),
            Endpoint::new(HttpMethod::Delete, "/pets/{id}").with_auth(AuthType::Bearer),
        ];
        assert_eq!(
            endpoint_lines(&endpoints),
            vec![
                "GET /pets          listPets              none",
                "DELETE /pets/{id}  -                     bearer",
            ]
        );
    }
}
