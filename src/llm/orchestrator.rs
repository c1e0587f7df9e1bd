//! Ordered-fallback conversation driver.
//!
//! Tries each configured model id in turn; the first one that yields plain
//! text or a valid tool call wins. There is no same-model retry; the
//! fallback list is the retry policy, which keeps cost bounded and failure
//! classification deterministic.

use super::client::{ModelClient, ModelError, ModelRequest};
use super::{prompt, FailureKind, ModelOutcome};
use crate::catalog::Catalog;
use crate::chart::ChartSpec;
use crate::config::Config;
use crate::session::Message;
use crate::tools::{ToolError, ToolRegistry, ToolReply};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const NO_DATA_MESSAGE: &str =
    "I couldn't find any data for that request in our inventory.";
const DEFAULT_CAPTION: &str = "Here's the chart based on our inventory data.";

pub struct Orchestrator<C: ModelClient> {
    client: C,
    tools: ToolRegistry,
    catalog: Arc<Catalog>,
    config: Config,
}

impl<C: ModelClient> Orchestrator<C> {
    pub fn new(client: C, catalog: Arc<Catalog>, config: Config) -> Self {
        Self {
            client,
            tools: ToolRegistry::new(Arc::clone(&catalog)),
            catalog,
            config,
        }
    }

    /// Drives one conversational turn. Never fails outright: every error
    /// path folds into `ModelOutcome::Failed` with a classification.
    #[instrument(skip(self, history))]
    pub async fn converse(&self, user_message: &str, history: &[Message]) -> ModelOutcome {
        let system = prompt::system_context(&self.catalog);
        let prompt_body = prompt::render_prompt(history, user_message);
        let tools = prompt::chart_tool_schema();

        let mut last_error: Option<ModelError> = None;

        for model_id in &self.config.model_ids {
            let request = ModelRequest {
                model_id: model_id.clone(),
                system: system.clone(),
                prompt: prompt_body.clone(),
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
                tools: Some(tools.clone()),
            };

            let reply = match self.client.generate(&request).await {
                Ok(reply) => reply,
                Err(error) => {
                    warn!(model = %model_id, %error, "model attempt failed, trying next");
                    last_error = Some(error);
                    continue;
                }
            };

            if let Some(call) = reply.call {
                match self.tools.dispatch(&call) {
                    Ok(ToolReply::Chart(spec)) => {
                        info!(model = %model_id, "tool produced chart data");
                        return self
                            .caption_chart(model_id, &system, user_message, spec)
                            .await;
                    }
                    // A rejection is already a complete user-facing message;
                    // no caption turn.
                    Ok(ToolReply::Rejected { reason }) => {
                        return ModelOutcome::Text { text: reason };
                    }
                    Ok(ToolReply::NoData) => {
                        let text = reply
                            .text
                            .filter(|t| !t.trim().is_empty())
                            .unwrap_or_else(|| NO_DATA_MESSAGE.to_string());
                        return ModelOutcome::Text { text };
                    }
                    Err(error @ ToolError::UnknownTool { .. }) => {
                        warn!(model = %model_id, %error, "protocol error, trying next model");
                        last_error = Some(ModelError::Protocol {
                            detail: error.to_string(),
                        });
                        continue;
                    }
                }
            }

            if let Some(text) = reply.text {
                if !text.trim().is_empty() {
                    info!(model = %model_id, "model produced a text reply");
                    return ModelOutcome::Text { text };
                }
            }

            last_error = Some(ModelError::Protocol {
                detail: "model returned neither text nor a tool call".to_string(),
            });
        }

        let classification = last_error
            .as_ref()
            .map(FailureKind::classify)
            .unwrap_or(FailureKind::Unknown);
        warn!(?classification, "all model candidates failed");
        ModelOutcome::Failed { classification }
    }

    /// Second turn: the chart is already ground truth, the model only adds a
    /// natural-language caption. A failed caption turn degrades to a fixed
    /// sentence rather than re-entering fallback.
    async fn caption_chart(
        &self,
        model_id: &str,
        system: &str,
        user_message: &str,
        spec: ChartSpec,
    ) -> ModelOutcome {
        let request = ModelRequest {
            model_id: model_id.to_string(),
            system: system.to_string(),
            prompt: prompt::render_caption_prompt(user_message, &spec),
            max_output_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
            tools: None,
        };

        let text = match self.client.generate(&request).await {
            Ok(reply) => reply
                .text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
            Err(error) => {
                warn!(model = %model_id, %error, "caption turn failed, using default");
                DEFAULT_CAPTION.to_string()
            }
        };

        ModelOutcome::Chart { data: spec, text }
    }
}
