//! Provider seam: the `ModelClient` trait plus the HTTP implementation
//! against a generateContent-style REST endpoint.

use crate::config::Config;
use crate::tools::ToolCall;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One outbound model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model_id: String,
    pub system: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Declared tool schema, absent for turns where a tool call would be
    /// unwelcome (e.g. the caption follow-up).
    pub tools: Option<Value>,
}

/// What a model attempt produced: free text, a structured function call,
/// or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub call: Option<ToolCall>,
}

impl ModelReply {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.call.is_none()
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("provider rejected credentials: {detail}")]
    Unauthorized { detail: String },

    #[error("reply blocked by safety filters: {detail}")]
    SafetyFiltered { detail: String },

    #[error("rate limit or quota exhausted: {detail}")]
    RateLimited { detail: String },

    #[error("network failure: {detail}")]
    Network { detail: String },

    #[error("malformed provider reply: {detail}")]
    Protocol { detail: String },

    #[error("provider error ({status}): {detail}")]
    Provider { status: u16, detail: String },
}

/// Seam to the remote model service. Production uses [`HttpModelClient`];
/// tests script replies per attempt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}

/// HTTP client for a `models/<id>:generateContent` REST surface.
pub struct HttpModelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpModelClient {
    pub fn new(config: &Config) -> Result<Self, ModelError> {
        let base_url = config
            .endpoint_base()
            .map_err(|e| ModelError::Protocol {
                detail: format!("invalid API base URL: {e}"),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ModelError::Network {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model_id,
            self.api_key
        )
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let body = GenerateContentRequest::build(request);

        debug!(model = %request.model_id, "issuing generateContent request");
        let response = self
            .client
            .post(self.endpoint(&request.model_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Network {
                        detail: "request timed out".to_string(),
                    }
                } else if e.is_connect() {
                    ModelError::Network {
                        detail: "connection failed".to_string(),
                    }
                } else {
                    ModelError::Network {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| ModelError::Protocol {
                detail: format!("failed to parse provider response: {e}"),
            })?;

        extract_reply(parsed)
    }
}

fn map_http_error(status: StatusCode, body: String) -> ModelError {
    let detail = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|w| w.error.message.unwrap_or_else(|| body.clone()))
        .unwrap_or(body);

    match status.as_u16() {
        401 | 403 => ModelError::Unauthorized { detail },
        400 if detail.to_lowercase().contains("api key") => ModelError::Unauthorized { detail },
        429 => ModelError::RateLimited { detail },
        status => ModelError::Provider { status, detail },
    }
}

fn extract_reply(response: GenerateContentResponse) -> Result<ModelReply, ModelError> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(ModelError::SafetyFiltered {
                detail: format!("prompt blocked: {reason}"),
            });
        }
    }

    let candidate = response
        .candidates
        .and_then(|mut candidates| {
            if candidates.is_empty() {
                None
            } else {
                Some(candidates.remove(0))
            }
        })
        .ok_or_else(|| ModelError::Protocol {
            detail: "provider returned no candidates".to_string(),
        })?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ModelError::SafetyFiltered {
            detail: "candidate stopped by safety filters".to_string(),
        });
    }

    let mut reply = ModelReply::default();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if reply.text.is_none() {
            if let Some(text) = part.text {
                if !text.trim().is_empty() {
                    reply.text = Some(text);
                }
            }
        }
        if reply.call.is_none() {
            if let Some(call) = part.function_call {
                reply.call = Some(ToolCall {
                    name: call.name,
                    args: call.args,
                });
            }
        }
    }

    if reply.is_empty() {
        return Err(ModelError::Protocol {
            detail: "provider returned neither text nor a tool call".to_string(),
        });
    }

    Ok(reply)
}

// --- wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn build(request: &ModelRequest) -> Self {
        Self {
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: request.system.clone(),
                }],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: request.prompt.clone(),
                }],
            }],
            tools: request.tools.clone(),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyPart {
    text: Option<String>,
    function_call: Option<FunctionCallPayload>,
}

#[derive(Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
