//! Testing utilities for TDG workspace
//!
//! Shared fixtures, a scripted completion backend and a recording
//! progress sink.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tdg_ai::{BackendKind, BackendProfile, CompletionBackend, CompletionRequest, GenerationProviderError, Speed};
use tdg_scheduler::{ProgressEvent, ProgressSink, ProgressStage};
use tdg_schema::{normalize_document, Endpoint, HttpMethod};

/// Small pet store with a body, path parameters, an API key and a bearer scheme
pub fn petstore_document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "Pet Store", "version": "1.0.0"},
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 100}}
                    ],
                    "responses": {"200": {"description": "pets", "content": {"application/json": {
                        "schema": {"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}
                    }}}}
                },
                "post": {
                    "operationId": "createPet",
                    "security": [{"apiKey": []}],
                    "requestBody": {"required": true, "content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/NewPet"}
                    }}},
                    "responses": {
                        "201": {"description": "created", "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Pet"}
                        }}},
                        "400": {"description": "invalid"}
                    }
                }
            },
            "/pets/{petId}": {
                "parameters": [
                    {"name": "petId", "in": "path", "required": true, "schema": {"type": "integer", "minimum": 1}}
                ],
                "get": {
                    "operationId": "getPet",
                    "responses": {"200": {"description": "a pet", "content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/Pet"}
                    }}}}
                },
                "delete": {
                    "operationId": "deletePet",
                    "security": [{"bearerAuth": []}],
                    "responses": {"204": {"description": "deleted"}}
                }
            }
        },
        "components": {
            "schemas": {
                "NewPet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string", "minLength": 1, "maxLength": 50},
                        "tag": {"type": "string", "enum": ["dog", "cat", "bird"]},
                        "age": {"type": "integer", "minimum": 0, "maximum": 30}
                    }
                },
                "Pet": {
                    "allOf": [
                        {"$ref": "#/components/schemas/NewPet"},
                        {"type": "object", "required": ["id"], "properties": {"id": {"type": "integer", "format": "int64"}}}
                    ]
                }
            },
            "securitySchemes": {
                "apiKey": {"type": "apiKey", "in": "header", "name": "X-API-Key"},
                "bearerAuth": {"type": "http", "scheme": "bearer"}
            }
        }
    })
}

/// Endpoints of [`petstore_document`]
pub fn petstore_endpoints() -> Vec<Endpoint> {
    normalize_document(&petstore_document())
        .expect("fixture resolves")
        .endpoints
}

/// `POST /pets` from [`petstore_document`]
pub fn create_pet_endpoint() -> Endpoint {
    petstore_endpoints()
        .into_iter()
        .find(|e| e.method == HttpMethod::Post)
        .expect("fixture has POST /pets")
}

/// Model output for `POST /pets` in the requested wrapper
pub fn create_pet_reply() -> String {
    json!({
        "cases": [
            {
                "name": "create_dog",
                "description": "Create a dog",
                "headers": {"Content-Type": "application/json"},
                "body": {"name": "Buddy", "tag": "dog", "age": 3},
                "expected_status": 201,
                "test_type": "valid"
            },
            {
                "name": "create_without_name",
                "body": {"tag": "cat"},
                "expected_status": 400,
                "test_type": "negative"
            }
        ]
    })
    .to_string()
}

/// One scripted backend answer
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this text
    Reply(String),
    /// Fail with this HTTP status
    Status(u16),
    /// Fail with a timeout
    Timeout,
}

/// Completion backend answering from a script.
///
/// Answers are consumed in order; the last one repeats once the script
/// runs out.
pub struct ScriptedBackend {
    kind: BackendKind,
    profile: BackendProfile,
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(kind: BackendKind, script: impl IntoIterator<Item = Scripted>) -> Self {
        let profile = match kind {
            BackendKind::OpenAi => BackendProfile { latency: 1, fidelity: 2 },
            BackendKind::Anthropic => BackendProfile { latency: 2, fidelity: 1 },
        };
        Self {
            kind,
            profile,
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `text`
    pub fn replying(kind: BackendKind, text: impl Into<String>) -> Self {
        Self::new(kind, [Scripted::Reply(text.into())])
    }

    /// Always fail with `status`
    pub fn failing(kind: BackendKind, status: u16) -> Self {
        Self::new(kind, [Scripted::Status(status)])
    }

    pub fn with_profile(mut self, latency: u8, fidelity: u8) -> Self {
        self.profile = BackendProfile { latency, fidelity };
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn profile(&self) -> BackendProfile {
        self.profile
    }

    fn model_for(&self, speed: Speed) -> String {
        format!("scripted-{}", speed.as_str())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationProviderError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock() = Some(answer.clone());
                Some(answer)
            }
            None => self.last.lock().clone(),
        };
        let backend = self.kind.as_str().to_string();
        match answer {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Status(status)) => Err(GenerationProviderError::BadStatus {
                backend,
                status,
                body: "scripted failure".into(),
            }),
            Some(Scripted::Timeout) => Err(GenerationProviderError::Timeout { backend, secs: 1 }),
            None => Err(GenerationProviderError::Unavailable { backend }),
        }
    }
}

/// Progress sink that keeps every event
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn stages(&self) -> Vec<ProgressStage> {
        self.events.lock().iter().map(|e| e.stage).collect()
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().last().cloned()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}
