//! Conversation transcript types and bounded session persistence.

pub mod store;


pub use store::{ChatStore, FileStore, KeyValueStore, MemoryStore, SessionRecord};

use crate::chart::ChartSpec;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    #[serde(rename = "me")]
    Me,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Text,
    Chart,
}

/// One rendered chat bubble. Immutable once rendered, except the
/// placeholder, which is replaced in place when the asynchronous reply
/// resolves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub time: String,
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartSpec>,
}

impl Message {
    fn build(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            time: Local::now().format("%H:%M").to_string(),
            kind: Kind::Text,
            chart_data: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::build(Sender::Me, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::build(Sender::Assistant, text)
    }

    pub fn chart(text: impl Into<String>, spec: ChartSpec) -> Self {
        let mut message = Self::build(Sender::Assistant, text);
        message.kind = Kind::Chart;
        message.chart_data = Some(spec);
        message
    }
}

/// The active conversation: ordered messages plus an id index, so the
/// placeholder swap is an explicit keyed update instead of a positional
/// scan.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    index: HashMap<String, usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let index = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self { messages, index }
    }

    /// Appends a message and returns its id.
    pub fn push(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.index.insert(id.clone(), self.messages.len());
        self.messages.push(message);
        id
    }

    /// Replaces the message with the given id in place, keeping its id and
    /// position. Returns false when the id is no longer present (the turn
    /// that produced the replacement was abandoned).
    pub fn replace(&mut self, id: &str, mut message: Message) -> bool {
        match self.index.get(id) {
            Some(&position) => {
                message.id = id.to_string();
                self.messages[position] = message;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.index.get(id).map(|&i| &self.messages[i])
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.index.clear();
    }

    pub fn has_user_turn(&self) -> bool {
        self.messages.iter().any(|m| m.sender == Sender::Me)
    }
}
