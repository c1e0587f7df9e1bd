//! Prompt assembly: system context over the catalog, bounded history
//! rendering, and the declared tool schema.

use crate::catalog::Catalog;
use crate::chart::ChartSpec;
use crate::session::{Message, Sender};
use serde_json::{json, Value};

/// Only this many most-recent turns are replayed to the model.
pub const HISTORY_WINDOW: usize = 10;

/// Builds the system context: a catalog summary plus the exact-match-only
/// instruction set. Near-synonymous product names must never resolve to a
/// product the user did not name.
pub fn system_context(catalog: &Catalog) -> String {
    let stats = catalog.stats();
    let mut lines = Vec::new();

    lines.push(
        "You are Ulap, the support assistant for a business inventory application. \
         Answer questions about the catalog below and general usage questions."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(format!(
        "Inventory summary: {} products across {} categories ({}). \
         Total units on hand: {}. Total stock in: {}. Total stock out: {}. \
         Inventory value: {:.2}.",
        stats.product_count,
        stats.categories.len(),
        stats.categories.join(", "),
        stats.total_units,
        stats.total_in,
        stats.total_out,
        stats.total_value,
    ));
    lines.push(String::new());
    lines.push("Products (name | category | stock | in | out):".to_string());
    for product in catalog.products() {
        lines.push(format!(
            "- {} | {} | {} | {} | {}",
            product.name, product.category, product.current_stock, product.stock_in, product.stock_out,
        ));
    }
    lines.push(String::new());
    lines.push(
        "Rules:\n\
         1. When the user asks for a chart or visual report, call the generate_chart tool.\n\
         2. Use product names EXACTLY as listed above. Never substitute a similar or \
         abbreviated name for one the user typed; if the user's name is not an exact \
         match, pass it through unchanged and let the tool respond.\n\
         3. Never invent stock figures. Numbers you supply to the tool are placeholders; \
         real values come from the inventory.\n\
         4. Keep answers short and friendly."
            .to_string(),
    );

    lines.join("\n")
}

/// Renders the bounded recent history plus the current turn as the prompt
/// body.
pub fn render_prompt(history: &[Message], user_message: &str) -> String {
    let mut lines = Vec::new();

    let tail_start = history.len().saturating_sub(HISTORY_WINDOW);
    for message in &history[tail_start..] {
        let speaker = match message.sender {
            Sender::Me => "User",
            Sender::Assistant => "Assistant",
        };
        lines.push(format!("{}: {}", speaker, message.text));
    }

    lines.push(format!("User: {user_message}"));
    lines.join("\n")
}

/// Follow-up turn asking the model to caption an already-synthesized chart.
pub fn render_caption_prompt(user_message: &str, spec: &ChartSpec) -> String {
    let summary = serde_json::to_string(spec).unwrap_or_else(|_| "{}".to_string());
    format!(
        "The user asked: {user_message}\n\
         The generate_chart tool returned this chart data: {summary}\n\
         Reply with one or two friendly sentences introducing the chart. \
         Do not repeat the raw numbers exhaustively and do not call any tool."
    )
}

/// Declared tool schema: one function, chart synthesis. `chartType`,
/// `labels` and `datasets` are required.
pub fn chart_tool_schema() -> Value {
    json!([
        {
            "functionDeclarations": [
                {
                    "name": crate::tools::CHART_TOOL,
                    "description": "Builds chart-ready data from the inventory catalog. \
                                    Labels must be exact product names, or aggregate labels \
                                    such as \"Stock In\" and \"Stock Out\".",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "chartType": {
                                "type": "string",
                                "enum": ["line", "bar", "pie"]
                            },
                            "title": { "type": "string" },
                            "labels": {
                                "type": "array",
                                "items": { "type": "string" }
                            },
                            "datasets": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "label": { "type": "string" },
                                        "data": {
                                            "type": "array",
                                            "items": { "type": "number" }
                                        }
                                    }
                                }
                            }
                        },
                        "required": ["chartType", "labels", "datasets"]
                    }
                }
            ]
        }
    ])
}
