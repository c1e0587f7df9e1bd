//! Closed registry of local functions the remote model may invoke.
//!
//! One tool is declared today: chart synthesis over the inventory catalog.
//! Dispatch is by name; a name outside the registry is a protocol error the
//! orchestrator treats like any other failed model attempt.

use crate::catalog::Catalog;
use crate::chart::{synthesize, ChartSpec, Synthesis};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Name of the chart-synthesis tool as declared to the model.
pub const CHART_TOOL: &str = "generate_chart";

/// A structured function-call request extracted from a model reply.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// What a dispatched tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReply {
    /// Chart-ready data; the orchestrator asks the model to caption it.
    Chart(ChartSpec),
    /// A complete user-facing refusal; shown verbatim, no second model turn.
    Rejected { reason: String },
    /// The tool had nothing to say for this request.
    NoData,
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("model requested unknown tool `{name}`")]
    UnknownTool { name: String },
}

/// Maps tool names to their local implementations.
pub struct ToolRegistry {
    catalog: Arc<Catalog>,
}

impl ToolRegistry {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn dispatch(&self, call: &ToolCall) -> Result<ToolReply, ToolError> {
        debug!(tool = %call.name, "dispatching tool call");
        match call.name.as_str() {
            CHART_TOOL => Ok(self.generate_chart(&call.args)),
            _ => Err(ToolError::UnknownTool {
                name: call.name.clone(),
            }),
        }
    }

    fn generate_chart(&self, args: &Value) -> ToolReply {
        match synthesize(args, &self.catalog) {
            Some(Synthesis::Chart(spec)) => ToolReply::Chart(spec),
            Some(Synthesis::Rejected { reason }) => ToolReply::Rejected { reason },
            None => ToolReply::NoData,
        }
    }
}
