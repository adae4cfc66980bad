//! Document and configuration loading for the `tdg` binary

use pretty_assertions::assert_eq;
use std::io::Write;
use tdg_cli::{endpoint_lines, load_config, load_document};
use tdg_schema::normalize_document;
use tdg_test_utils::petstore_document;

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Tenet: JSON and YAML renderings of a document load identically
#[test]
fn test_json_and_yaml_agree() {
    let document = petstore_document();
    let json = write_temp(".json", &serde_json::to_string(&document).unwrap());
    let yaml = write_temp(".yaml", &serde_yaml::to_string(&document).unwrap());
    let sniffed = write_temp(".spec", &serde_yaml::to_string(&document).unwrap());

    assert_eq!(load_document(json.path()).unwrap(), document);
    assert_eq!(load_document(yaml.path()).unwrap(), document);
    assert_eq!(load_document(sniffed.path()).unwrap(), document);
}

/// Tenet: unreadable or non-object documents are rejected with context
#[test]
fn test_bad_documents_rejected() {
    let broken = write_temp(".json", "{\"openapi\": ");
    let err = load_document(broken.path()).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"), "{err}");

    let scalar = write_temp(".yml", "just a string");
    assert!(load_document(scalar.path()).is_err());

    assert!(load_document(std::path::Path::new("/nonexistent/api.json")).is_err());
}

/// Tenet: listed endpoints follow document order
#[test]
fn test_endpoint_listing() {
    let api = normalize_document(&petstore_document()).unwrap();
    let lines = endpoint_lines(&api.endpoints);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("GET /pets "));
    assert!(lines[1].contains("createPet") && lines[1].ends_with("apiKey"));
    assert!(lines[3].ends_with("bearer"));
}

/// Tenet: a config file is read and validated
#[test]
fn test_config_file() {
    let file = write_temp(".toml", "default_cases_per_endpoint = 4\nworkers = 3\n");
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.default_cases_per_endpoint, 4);

    let invalid = write_temp(".toml", "queue_capacity = 0\n");
    assert!(load_config(Some(invalid.path())).is_err());
}
