//! Public façade for the assistant engine.
//!
//! Wires the catalog, the model orchestrator, and the session store into
//! one conversational surface. Owns the active transcript and the
//! in-flight guard; callers (UI shells) only ever see messages in and
//! messages out.

use crate::llm::{ModelClient, ModelOutcome, Orchestrator};
use crate::session::{ChatStore, KeyValueStore, Message, SessionRecord, Transcript};
use thiserror::Error;
use tracing::{debug, instrument};

/// Shown in the placeholder bubble while a reply is pending.
const TYPING_PLACEHOLDER: &str = "...";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("a reply to the previous message is still being generated")]
    Busy,

    #[error("message text is empty")]
    EmptyMessage,
}

pub struct Assistant<C: ModelClient, S: KeyValueStore> {
    orchestrator: Orchestrator<C>,
    store: ChatStore<S>,
    transcript: Transcript,
    in_flight: bool,
}

impl<C: ModelClient, S: KeyValueStore> Assistant<C, S> {
    pub fn new(orchestrator: Orchestrator<C>, store: ChatStore<S>) -> Self {
        Self {
            orchestrator,
            store,
            transcript: Transcript::new(),
            in_flight: false,
        }
    }

    /// Restores the persisted active transcript, if any. Returns whether
    /// anything was restored.
    pub fn resume(&mut self) -> bool {
        match self.store.load_active() {
            Some(messages) => {
                debug!(count = messages.len(), "resumed active transcript");
                self.transcript = Transcript::from_messages(messages);
                true
            }
            None => false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Drives one turn: appends the user message and a placeholder, runs the
    /// model conversation, then swaps the placeholder for the real reply by
    /// id. Persistence happens around the network call and never gates it.
    #[instrument(skip(self))]
    pub async fn send(&mut self, text: &str) -> Result<Message, EngineError> {
        if self.in_flight {
            return Err(EngineError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }

        self.in_flight = true;

        let history: Vec<Message> = self.transcript.messages().to_vec();
        self.transcript.push(Message::user(text));
        let placeholder_id = self.transcript.push(Message::assistant(TYPING_PLACEHOLDER));
        self.store.save_active(self.transcript.messages());

        let outcome = self.orchestrator.converse(text, &history).await;
        let reply = match outcome {
            ModelOutcome::Text { text } => Message::assistant(text),
            ModelOutcome::Chart { data, text } => Message::chart(text, data),
            ModelOutcome::Failed { classification } => {
                Message::assistant(classification.user_message())
            }
        };

        // Keyed swap: if the placeholder left the transcript meanwhile, this
        // resolution is abandoned and must not touch newer state.
        let delivered = self.transcript.replace(&placeholder_id, reply.clone());
        if delivered {
            self.store.save_active(self.transcript.messages());
        }

        self.in_flight = false;

        match self.transcript.get(&placeholder_id) {
            Some(message) => Ok(message.clone()),
            None => Ok(reply),
        }
    }

    /// Archives the current conversation (a no-op when it has no user turn)
    /// and starts a fresh one, clearing the persisted active transcript.
    pub fn new_conversation(&mut self) -> Vec<SessionRecord> {
        let history = self.store.archive_current(self.transcript.messages());
        self.transcript.clear();
        self.store.save_active(&[]);
        history
    }

    pub fn history(&self) -> Vec<SessionRecord> {
        self.store.list_history()
    }

    pub fn delete_history_entry(&self, id: &str) -> Vec<SessionRecord> {
        self.store.delete_history_entry(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Product};
    use crate::config::Config;
    use crate::llm::{ModelError, ModelReply, ModelRequest};
    use crate::session::{Kind, MemoryStore, Sender};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct ScriptedClient {
        script: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<ModelReply, ModelError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }

        fn text(reply: &str) -> Result<ModelReply, ModelError> {
            Ok(ModelReply {
                text: Some(reply.to_string()),
                call: None,
            })
        }
    }

    #[async_trait]
    impl crate::llm::ModelClient for ScriptedClient {
        async fn generate(&self, _request: &ModelRequest) -> Result<ModelReply, ModelError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ModelError::Protocol {
                        detail: "script exhausted".to_string(),
                    })
                })
        }
    }

    fn assistant(
        script: Vec<Result<ModelReply, ModelError>>,
    ) -> Assistant<ScriptedClient, MemoryStore> {
        let catalog = Arc::new(Catalog::new(vec![Product {
            id: "p-1".to_string(),
            name: "Widget X".to_string(),
            category: "General".to_string(),
            current_stock: 25,
            stock_in: 40,
            stock_out: 15,
            last_price: 10.0,
            transactions: Vec::new(),
        }]));
        let orchestrator = Orchestrator::new(ScriptedClient::new(script), catalog, Config::default());
        Assistant::new(orchestrator, ChatStore::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn send_swaps_the_placeholder_for_the_reply() {
        let mut assistant = assistant(vec![ScriptedClient::text("hello there")]);

        let reply = assistant.send("hi").await.unwrap();
        assert_eq!(reply.text, "hello there");
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.kind, Kind::Text);

        let messages = assistant.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::Me);
        assert_eq!(messages[1].text, "hello there");
        assert!(!assistant.is_busy());
    }

    #[tokio::test]
    async fn send_rejects_empty_input() {
        let mut assistant = assistant(vec![]);
        assert_eq!(assistant.send("   ").await, Err(EngineError::EmptyMessage));
        assert!(assistant.messages().is_empty());
    }

    #[tokio::test]
    async fn exhausted_fallback_renders_the_classified_sentence() {
        let mut assistant = assistant(vec![
            Err(ModelError::Network {
                detail: "down".to_string(),
            }),
            Err(ModelError::Network {
                detail: "still down".to_string(),
            }),
            Err(ModelError::Network {
                detail: "very down".to_string(),
            }),
        ]);

        let reply = assistant.send("hi").await.unwrap();
        assert!(reply.text.contains("couldn't reach the assistant service"));
    }

    #[tokio::test]
    async fn new_conversation_archives_and_clears() {
        let mut assistant = assistant(vec![ScriptedClient::text("sure")]);
        assistant.send("archive this").await.unwrap();

        let history = assistant.new_conversation();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "Archive this");
        assert!(assistant.messages().is_empty());

        // a second new conversation with nothing said archives nothing
        let history = assistant.new_conversation();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn transcript_survives_restart_through_the_store() {
        let mut assistant = assistant(vec![ScriptedClient::text("persisted")]);
        assistant.send("remember me").await.unwrap();

        // a fresh transcript over the same backing storage
        assert!(assistant.resume());
        assert_eq!(assistant.messages().len(), 2);
    }
}
