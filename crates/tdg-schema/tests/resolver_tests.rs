//! End-to-end normalization of a small OpenAPI document

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tdg_schema::{
    normalize_document, AuthType, HttpMethod, ParameterLocation, SchemaResolutionError, SchemaType,
};

fn store_document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "Store", "version": "2.1.0"},
        "security": [{"bearerAuth": []}],
        "paths": {
            "/orders/{orderId}": {
                "parameters": [
                    {"name": "orderId", "in": "path", "schema": {"type": "string"}},
                    {"$ref": "#/components/parameters/TraceId"}
                ],
                "delete": {"operationId": "deleteOrder", "responses": {"204": {"description": "gone"}}},
                "get": {
                    "operationId": "getOrder",
                    "parameters": [
                        {"name": "orderId", "in": "path", "required": true, "schema": {"type": "integer", "minimum": 1}}
                    ],
                    "responses": {"200": {"$ref": "#/components/responses/OrderResponse"}}
                }
            },
            "/orders": {
                "post": {
                    "operationId": "createOrder",
                    "tags": ["orders"],
                    "security": [{"apiKey": []}],
                    "requestBody": {"$ref": "#/components/requestBodies/NewOrder"},
                    "responses": {
                        "201": {"$ref": "#/components/responses/OrderResponse"},
                        "400": {"description": "bad"}
                    }
                },
                "get": {
                    "security": [],
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "maximum": 50}}
                    ],
                    "responses": {"200": {"description": "list", "content": {
                        "application/vnd.store+json": {"schema": {"type": "array", "items": {"$ref": "#/components/schemas/Order"}}}
                    }}}
                }
            }
        },
        "components": {
            "schemas": {
                "Order": {
                    "type": "object",
                    "required": ["item", "quantity"],
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "item": {"type": "string", "minLength": 1},
                        "quantity": {"type": "integer", "minimum": 1, "maximum": 99},
                        "status": {"type": "string", "enum": ["placed", "shipped"]}
                    }
                }
            },
            "parameters": {
                "TraceId": {"name": "X-Trace-Id", "in": "header", "schema": {"type": "string"}}
            },
            "requestBodies": {
                "NewOrder": {"required": true, "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}}
            },
            "responses": {
                "OrderResponse": {"description": "an order", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}}
            },
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"},
                "apiKey": {"type": "apiKey", "in": "header", "name": "X-API-Key"}
            }
        }
    })
}

/// Tenet: endpoints come out in document order, methods in canonical order
#[test]
fn test_endpoint_order() {
    let api = normalize_document(&store_document()).unwrap();
    let labels: Vec<_> = api.endpoints.iter().map(|e| e.label()).collect();
    assert_eq!(
        labels,
        vec![
            "GET /orders/{orderId}",
            "DELETE /orders/{orderId}",
            "GET /orders",
            "POST /orders",
        ]
    );
    assert_eq!(api.title.as_deref(), Some("Store"));
    assert_eq!(api.version.as_deref(), Some("2.1.0"));
}

/// Tenet: operation parameters override path parameters with the same name and location
#[test]
fn test_parameter_override_and_ref() {
    let api = normalize_document(&store_document()).unwrap();
    let get = &api.endpoints[0];
    assert_eq!(get.parameters.len(), 2);
    let order_id = get
        .parameters_in(ParameterLocation::Path)
        .next()
        .unwrap();
    assert_eq!(order_id.schema.primary_type(), Some(SchemaType::Integer));
    assert!(order_id.required);
    let trace = get.parameters_in(ParameterLocation::Header).next().unwrap();
    assert_eq!(trace.name, "X-Trace-Id");

    let delete = &api.endpoints[1];
    let order_id = delete
        .parameters_in(ParameterLocation::Path)
        .next()
        .unwrap();
    assert_eq!(order_id.schema.primary_type(), Some(SchemaType::String));
}

/// Tenet: request bodies and responses are dereferenced and their schemas inlined
#[test]
fn test_bodies_and_responses_inlined() {
    let api = normalize_document(&store_document()).unwrap();
    let post = &api.endpoints[3];
    assert_eq!(post.method, HttpMethod::Post);
    let body = post.request_body_schema.as_ref().unwrap();
    assert_eq!(body.required, vec!["item", "quantity"]);
    assert_eq!(body.properties["quantity"].maximum, Some(99.0));
    assert_eq!(post.success_status(), Some(201));
    assert!(post.response_schema(201).is_some());
    assert_eq!(post.tags, vec!["orders"]);

    let list = &api.endpoints[2];
    assert_eq!(list.method, HttpMethod::Get);
    let schema = list.response_schema(200).unwrap();
    assert_eq!(schema.primary_type(), Some(SchemaType::Array));
    assert_eq!(
        schema.items.as_ref().unwrap().properties["status"]
            .enum_values
            .as_ref()
            .unwrap()
            .len(),
        2
    );
}

/// Tenet: operation security overrides document security; an empty list opts out
#[test]
fn test_auth_detection() {
    let api = normalize_document(&store_document()).unwrap();
    assert_eq!(api.endpoints[0].auth_type, AuthType::Bearer);
    assert_eq!(api.endpoints[2].auth_type, AuthType::None);
    assert_eq!(api.endpoints[3].auth_type, AuthType::ApiKey);
}

/// Tenet: a dangling reference aborts normalization
#[test]
fn test_unresolved_reference_fails() {
    let mut doc = store_document();
    doc["components"]["schemas"]
        .as_object_mut()
        .unwrap()
        .remove("Order");
    let err = normalize_document(&doc).unwrap_err();
    assert!(err.is_reference_error());
    assert!(matches!(err, SchemaResolutionError::UnresolvedRef { .. }));
}

/// Tenet: external references are rejected, not fetched
#[test]
fn test_external_reference_rejected() {
    let doc = json!({"paths": {"/x": {"get": {"responses": {"200": {"$ref": "common.yaml#/Ok"}}}}}});
    let err = normalize_document(&doc).unwrap_err();
    assert!(matches!(err, SchemaResolutionError::UnsupportedRef { .. }));
}

/// Tenet: a document without paths normalizes to no endpoints
#[test]
fn test_empty_document() {
    let api = normalize_document(&json!({"openapi": "3.1.0"})).unwrap();
    assert!(api.endpoints.is_empty());
}
