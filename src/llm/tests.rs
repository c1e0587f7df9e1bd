use super::client::{ModelClient, ModelError, ModelReply, ModelRequest};
use super::{FailureKind, ModelOutcome, Orchestrator};
use crate::catalog::{Catalog, Product};
use crate::config::Config;
use crate::tools::{ToolCall, CHART_TOOL};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted provider: hands out canned results in order and records which
/// model ids were asked, so tests can assert on fallback behavior.
struct ScriptedClient {
    script: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<ModelReply, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for Arc<ScriptedClient> {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.calls.lock().unwrap().push(request.model_id.clone());
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ModelError::Protocol {
                detail: "script exhausted".to_string(),
            })
        })
    }
}

fn text_reply(text: &str) -> Result<ModelReply, ModelError> {
    Ok(ModelReply {
        text: Some(text.to_string()),
        call: None,
    })
}

fn tool_reply(name: &str, args: serde_json::Value) -> Result<ModelReply, ModelError> {
    Ok(ModelReply {
        text: None,
        call: Some(ToolCall {
            name: name.to_string(),
            args,
        }),
    })
}

fn network_error() -> Result<ModelReply, ModelError> {
    Err(ModelError::Network {
        detail: "unreachable".to_string(),
    })
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::new(vec![
        Product {
            id: "p-1".to_string(),
            name: "Widget X".to_string(),
            category: "General".to_string(),
            current_stock: 25,
            stock_in: 40,
            stock_out: 15,
            last_price: 10.0,
            transactions: Vec::new(),
        },
        Product {
            id: "p-2".to_string(),
            name: "Widget Y".to_string(),
            category: "General".to_string(),
            current_stock: 60,
            stock_in: 90,
            stock_out: 30,
            last_price: 4.5,
            transactions: Vec::new(),
        },
    ]))
}

fn config(models: &[&str]) -> Config {
    Config {
        model_ids: models.iter().map(|m| m.to_string()).collect(),
        ..Config::default()
    }
}

fn orchestrator(
    models: &[&str],
    script: Vec<Result<ModelReply, ModelError>>,
) -> (Orchestrator<Arc<ScriptedClient>>, Arc<ScriptedClient>) {
    let client = Arc::new(ScriptedClient::new(script));
    let orchestrator = Orchestrator::new(Arc::clone(&client), catalog(), config(models));
    (orchestrator, client)
}

#[tokio::test]
async fn first_succeeding_model_wins_and_no_call_goes_beyond_it() {
    let (orchestrator, client) = orchestrator(
        &["model-a", "model-b", "model-c", "model-d"],
        vec![network_error(), network_error(), text_reply("from c")],
    );

    let outcome = orchestrator.converse("hello", &[]).await;

    assert_eq!(
        outcome,
        ModelOutcome::Text {
            text: "from c".to_string()
        }
    );
    assert_eq!(client.calls(), vec!["model-a", "model-b", "model-c"]);
}

#[tokio::test]
async fn exhaustion_classifies_the_last_error() {
    let (orchestrator, client) = orchestrator(
        &["model-a", "model-b"],
        vec![
            Err(ModelError::Unauthorized {
                detail: "bad key".to_string(),
            }),
            Err(ModelError::RateLimited {
                detail: "slow down".to_string(),
            }),
        ],
    );

    let outcome = orchestrator.converse("hello", &[]).await;

    assert_eq!(
        outcome,
        ModelOutcome::Failed {
            classification: FailureKind::Quota
        }
    );
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn unknown_tool_escalates_to_the_next_model() {
    let (orchestrator, client) = orchestrator(
        &["model-a", "model-b"],
        vec![
            tool_reply("summon_dragon", json!({})),
            text_reply("plain answer instead"),
        ],
    );

    let outcome = orchestrator.converse("hello", &[]).await;

    assert_eq!(
        outcome,
        ModelOutcome::Text {
            text: "plain answer instead".to_string()
        }
    );
    assert_eq!(client.calls(), vec!["model-a", "model-b"]);
}

#[tokio::test]
async fn unknown_tool_on_every_model_classifies_as_unknown() {
    let (orchestrator, _client) = orchestrator(
        &["model-a"],
        vec![tool_reply("summon_dragon", json!({}))],
    );

    let outcome = orchestrator.converse("hello", &[]).await;
    assert_eq!(
        outcome,
        ModelOutcome::Failed {
            classification: FailureKind::Unknown
        }
    );
}

#[tokio::test]
async fn chart_tool_call_runs_a_caption_turn_on_the_same_model() {
    let (orchestrator, client) = orchestrator(
        &["model-a", "model-b"],
        vec![
            tool_reply(
                CHART_TOOL,
                json!({
                    "chartType": "pie",
                    "labels": ["Widget X", "Widget Y"],
                    "datasets": [{"label": "Value", "data": [1.0, 1.0]}],
                }),
            ),
            text_reply("Here's how your stock splits."),
        ],
    );

    let outcome = orchestrator.converse("chart please", &[]).await;

    match outcome {
        ModelOutcome::Chart { data, text } => {
            assert_eq!(text, "Here's how your stock splits.");
            // values come from the catalog, in label order
            assert_eq!(data.datasets[0].data, vec![25.0, 60.0]);
        }
        other => panic!("expected chart outcome, got {other:?}"),
    }
    // the caption turn reuses the model that produced the tool call
    assert_eq!(client.calls(), vec!["model-a", "model-a"]);
}

#[tokio::test]
async fn failed_caption_turn_degrades_to_the_fixed_caption() {
    let (orchestrator, client) = orchestrator(
        &["model-a"],
        vec![
            tool_reply(
                CHART_TOOL,
                json!({
                    "chartType": "bar",
                    "labels": ["Widget X"],
                    "datasets": [{"label": "Stock", "data": []}],
                }),
            ),
            network_error(),
        ],
    );

    let outcome = orchestrator.converse("chart please", &[]).await;

    match outcome {
        ModelOutcome::Chart { text, .. } => {
            assert_eq!(text, "Here's the chart based on our inventory data.");
        }
        other => panic!("expected chart outcome, got {other:?}"),
    }
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn rejection_bypasses_the_caption_turn() {
    let (orchestrator, client) = orchestrator(
        &["model-a"],
        vec![tool_reply(
            CHART_TOOL,
            json!({
                "chartType": "bar",
                "labels": ["Unicorn 9000"],
                "datasets": [{"label": "Stock", "data": [1.0]}],
            }),
        )],
    );

    let outcome = orchestrator.converse("chart please", &[]).await;

    match outcome {
        ModelOutcome::Text { text } => {
            assert!(text.starts_with("Product \"Unicorn 9000\" was not found in our inventory"));
        }
        other => panic!("expected text outcome, got {other:?}"),
    }
    // no second call: the rejection is already a complete reply
    assert_eq!(client.calls().len(), 1);
}

#[test]
fn no_data_falls_back_to_the_models_own_text() {
    let undecodable = json!({"chartType": "bar", "labels": [], "datasets": []});

    let (orchestrator_a, _client) = orchestrator(
        &["model-a"],
        vec![Ok(ModelReply {
            text: Some("I tried to chart that but found nothing.".to_string()),
            call: Some(ToolCall {
                name: CHART_TOOL.to_string(),
                args: undecodable.clone(),
            }),
        })],
    );

    let outcome = tokio_test::block_on(orchestrator_a.converse("chart please", &[]));
    assert_eq!(
        outcome,
        ModelOutcome::Text {
            text: "I tried to chart that but found nothing.".to_string()
        }
    );

    // without accompanying text the fixed no-data sentence is used
    let (orchestrator_b, _client) =
        orchestrator(&["model-a"], vec![tool_reply(CHART_TOOL, undecodable)]);
    let outcome = tokio_test::block_on(orchestrator_b.converse("chart please", &[]));
    assert_eq!(
        outcome,
        ModelOutcome::Text {
            text: "I couldn't find any data for that request in our inventory.".to_string()
        }
    );
}

#[tokio::test]
async fn empty_reply_counts_as_a_failed_attempt() {
    let (orchestrator, client) = orchestrator(
        &["model-a", "model-b"],
        vec![
            Ok(ModelReply {
                text: Some("   ".to_string()),
                call: None,
            }),
            text_reply("real answer"),
        ],
    );

    let outcome = orchestrator.converse("hello", &[]).await;
    assert_eq!(
        outcome,
        ModelOutcome::Text {
            text: "real answer".to_string()
        }
    );
    assert_eq!(client.calls(), vec!["model-a", "model-b"]);
}

#[test]
fn classification_covers_the_whole_taxonomy() {
    let cases = [
        (
            ModelError::Unauthorized {
                detail: String::new(),
            },
            FailureKind::Auth,
        ),
        (
            ModelError::SafetyFiltered {
                detail: String::new(),
            },
            FailureKind::Safety,
        ),
        (
            ModelError::RateLimited {
                detail: String::new(),
            },
            FailureKind::Quota,
        ),
        (
            ModelError::Network {
                detail: String::new(),
            },
            FailureKind::Network,
        ),
        (
            ModelError::Protocol {
                detail: String::new(),
            },
            FailureKind::Unknown,
        ),
        (
            ModelError::Provider {
                status: 500,
                detail: String::new(),
            },
            FailureKind::Unknown,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(FailureKind::classify(&error), expected);
        // every class renders a non-empty fixed sentence
        assert!(!expected.user_message().is_empty());
    }
}

#[test]
fn prompt_renders_only_the_bounded_history_tail() {
    use crate::session::Message;

    let history: Vec<Message> = (0..15)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("question {i}"))
            } else {
                Message::assistant(format!("answer {i}"))
            }
        })
        .collect();

    let prompt = super::prompt::render_prompt(&history, "latest question");

    assert!(!prompt.contains("question 4"), "turn outside the window leaked in");
    assert!(prompt.contains("User: question 6"));
    assert!(prompt.contains("Assistant: answer 13"));
    assert!(prompt.ends_with("User: latest question"));
}

#[test]
fn system_context_spells_out_exact_matching() {
    let context = super::prompt::system_context(&catalog());

    assert!(context.contains("Widget X"));
    assert!(context.contains("EXACTLY"));
    assert!(context.contains("2 products"));
}

#[test]
fn tool_schema_declares_the_required_fields() {
    let schema = super::prompt::chart_tool_schema();
    let declaration = &schema[0]["functionDeclarations"][0];

    assert_eq!(declaration["name"], CHART_TOOL);
    let required = declaration["parameters"]["required"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(required, vec!["chartType", "labels", "datasets"]);
}
