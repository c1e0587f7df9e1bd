//! # Ulap Assistant
//!
//! Support-chat engine for a business inventory application. A user question
//! travels through the following pipeline:
//!
//! ```text
//! User Input → engine (transcript + guard) → llm (fallback orchestration)
//!            → tools (dispatch) → chart (validate + synthesize from catalog)
//!            → folded back into a caption turn → final reply → session store
//! ```
//!
//! The crate never draws anything: chart output is a renderer-ready
//! [`chart::ChartSpec`] handed to an external drawing component, and every
//! failure path folds into a displayable sentence rather than an error the
//! UI must interpret.

pub mod catalog;
pub mod chart;
pub mod config;
pub mod engine;
pub mod llm;
pub mod session;
pub mod tools;

pub use catalog::{Catalog, CatalogCache, Product, ProductStats};
pub use chart::{ChartSpec, ChartType, Synthesis};
pub use config::Config;
pub use engine::{Assistant, EngineError};
pub use llm::{FailureKind, HttpModelClient, ModelClient, ModelOutcome, Orchestrator};
pub use session::{ChatStore, FileStore, KeyValueStore, MemoryStore, Message, SessionRecord};
