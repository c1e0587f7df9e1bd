//! # Model invocation layer
//!
//! Talks to the remote language-model service and drives one conversational
//! turn end to end. The module splits three ways:
//! - `client`: the provider seam (request/reply types, the `ModelClient`
//!   trait, and the HTTP implementation)
//! - `prompt`: system context, bounded history rendering, tool schema
//! - `orchestrator`: ordered model fallback, tool dispatch, and the
//!   follow-up caption turn
//!
//! ```text
//! user turn → prompt assembly → [model A, model B, …] → text | tool call
//!                                        │                      │
//!                                        └── classify on exhaustion
//!                                                               │
//!                                   chart synthesis → caption turn → reply
//! ```
//!
//! Per-model failures are swallowed and the next candidate is tried; only
//! exhaustion of the whole list surfaces to the caller, classified into a
//! small taxonomy with one fixed user-facing sentence each.

pub mod client;
pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
mod tests;

pub use client::{HttpModelClient, ModelClient, ModelError, ModelReply, ModelRequest};
pub use orchestrator::Orchestrator;

use crate::chart::ChartSpec;

/// Final result of one conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Text { text: String },
    Chart { data: ChartSpec, text: String },
    Failed { classification: FailureKind },
}

/// Fixed taxonomy for an exhausted fallback chain. Raw provider error text
/// never reaches the user; each class maps to one canned sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Safety,
    Quota,
    Network,
    Unknown,
}

impl FailureKind {
    pub fn classify(error: &ModelError) -> Self {
        match error {
            ModelError::Unauthorized { .. } => FailureKind::Auth,
            ModelError::SafetyFiltered { .. } => FailureKind::Safety,
            ModelError::RateLimited { .. } => FailureKind::Quota,
            ModelError::Network { .. } => FailureKind::Network,
            ModelError::Protocol { .. } | ModelError::Provider { .. } => FailureKind::Unknown,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::Auth => {
                "The assistant isn't configured correctly. Please contact support so we can check the service credentials."
            }
            FailureKind::Safety => {
                "I can't help with that request. Please try rephrasing your question."
            }
            FailureKind::Quota => {
                "The assistant is handling too many requests right now. Please try again in a moment."
            }
            FailureKind::Network => {
                "I couldn't reach the assistant service. Please check your connection and try again."
            }
            FailureKind::Unknown => "Something went wrong while answering. Please try again.",
        }
    }
}
