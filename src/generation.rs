//! Generation port: the text-generation capability each pipeline stage calls
//!
//! Defines the client trait and the single return contract the orchestrator
//! relies on. Two implementations:
//! - `HttpClient`: posts to an OpenAI-compatible chat-completions endpoint (production)
//! - `MockClient`: returns scripted responses per role (testing)
//!
//! Whatever shape a backend produces is normalised here, at the port
//! boundary, into a `GenerationOutput`. The result extractor never has to
//! look for alternative shapes.

use crate::roles::RoleConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// What a generation call returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GenerationOutput {
    /// Free-form text, possibly fenced or wrapped in commentary.
    Text(String),
    /// A backend that already produced a structured record.
    Structured(Map<String, Value>),
}

impl GenerationOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Errors from generation port calls.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation backend not available: {0}")]
    Unavailable(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation request failed: {0}")]
    RequestFailed(String),
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Client trait for the text-generation capability.
///
/// Abstracts over transport (HTTP, mock) so the orchestrator doesn't
/// depend on how text is produced.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate output for `role` given the stage's prompt body.
    async fn generate(
        &self,
        role: &RoleConfig,
        context: &str,
    ) -> Result<GenerationOutput, GenerationError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct HttpClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for HttpClient {
    async fn generate(
        &self,
        role: &RoleConfig,
        context: &str,
    ) -> Result<GenerationOutput, GenerationError> {
        let system = role.system_prompt();
        let request = ChatRequest {
            model: &self.model,
            temperature: role.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                GenerationError::Unavailable(e.to_string())
            } else {
                GenerationError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::RequestFailed(format!(
                "endpoint returned {}",
                status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(GenerationOutput::Text)
            .ok_or_else(|| GenerationError::InvalidResponse("no message content".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Mock client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Output(GenerationOutput),
    Failure,
    Panic,
}

/// A recorded call made against a `MockClient`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: String,
    pub context: String,
}

/// Mock client for tests. Returns scripted responses keyed by role name.
///
/// Roles without a scripted response fail with `Unavailable`, so a bare
/// `MockClient::new()` drives every stage down its fallback path.
pub struct MockClient {
    responses: HashMap<String, Scripted>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a text response for a role.
    pub fn with_response(mut self, role: impl Into<String>, text: impl Into<String>) -> Self {
        self.responses.insert(
            role.into(),
            Scripted::Output(GenerationOutput::Text(text.into())),
        );
        self
    }

    /// Register an already-structured response for a role.
    pub fn with_structured(mut self, role: impl Into<String>, record: Value) -> Self {
        let output = match record {
            Value::Object(map) => GenerationOutput::Structured(map),
            other => GenerationOutput::Text(other.to_string()),
        };
        self.responses.insert(role.into(), Scripted::Output(output));
        self
    }

    /// Register a failure for a role.
    pub fn with_failure(mut self, role: impl Into<String>) -> Self {
        self.responses.insert(role.into(), Scripted::Failure);
        self
    }

    /// Make calls for a role panic, simulating a defect in a backend.
    pub fn with_panic(mut self, role: impl Into<String>) -> Self {
        self.responses.insert(role.into(), Scripted::Panic);
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn generate(
        &self,
        role: &RoleConfig,
        context: &str,
    ) -> Result<GenerationOutput, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                role: role.name.clone(),
                context: context.to_string(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(&role.name) {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::Failure) => Err(GenerationError::RequestFailed(format!(
                "mock failure for role '{}'",
                role.name
            ))),
            Some(Scripted::Panic) => panic!("mock panic for role '{}'", role.name),
            None => Err(GenerationError::Unavailable(format!(
                "no mock response for role '{}'",
                role.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleSet;

    #[tokio::test]
    async fn mock_returns_scripted_text() {
        let roles = RoleSet::builtin().unwrap();
        let client = MockClient::new().with_response("gather", "{\"service_name\":\"x\"}");

        let out = client.generate(&roles.gather, "ctx").await.unwrap();
        assert_eq!(out, GenerationOutput::text("{\"service_name\":\"x\"}"));
    }

    #[tokio::test]
    async fn mock_unscripted_role_is_unavailable() {
        let roles = RoleSet::builtin().unwrap();
        let client = MockClient::new();

        let err = client.generate(&roles.copy, "ctx").await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn mock_records_calls_in_order() {
        let roles = RoleSet::builtin().unwrap();
        let client = MockClient::new().with_failure("design");

        let _ = client.generate(&roles.gather, "first").await;
        let _ = client.generate(&roles.design, "second").await;

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].role, "gather");
        assert_eq!(calls[1].context, "second");
    }

    #[test]
    fn structured_mock_keeps_object() {
        let client = MockClient::new().with_structured("audit", serde_json::json!({"a": 1}));
        match client.responses.get("audit") {
            Some(Scripted::Output(GenerationOutput::Structured(map))) => {
                assert_eq!(map.get("a"), Some(&serde_json::json!(1)));
            }
            other => panic!("unexpected script: {:?}", other),
        }
    }

    #[test]
    fn http_client_trims_endpoint() {
        let client = HttpClient::new("http://localhost:8080/v1/", "m", None).unwrap();
        assert_eq!(client.url(), "http://localhost:8080/v1/chat/completions");
    }
}
