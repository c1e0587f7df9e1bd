//! Minimal interactive driver for the assistant engine.
//!
//! Reads questions from stdin and prints replies; `/new`, `/history` and
//! `/quit` cover the session operations. The real product embeds the
//! library behind a chat UI; this binary only exists to exercise the full
//! pipeline against a live endpoint.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use ulap_assistant::{
    Assistant, Catalog, ChatStore, Config, FileStore, HttpModelClient, Orchestrator,
};

const SAMPLE_CATALOG: &str = include_str!("../data/catalog.json");

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load();
    let catalog = load_catalog()?;

    let client = HttpModelClient::new(&config)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to build model client")?;
    let orchestrator = Orchestrator::new(client, std::sync::Arc::new(catalog), config);

    let store_dir = env::var("ULAP_STORE_DIR").unwrap_or_else(|_| ".ulap".to_string());
    let store = ChatStore::new(FileStore::new(&store_dir).context("failed to open store")?);

    let mut assistant = Assistant::new(orchestrator, store);
    if assistant.resume() {
        println!("(resumed {} messages)", assistant.messages().len());
    }

    println!("Ulap assistant ready. /new starts over, /history lists sessions, /quit exits.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" => break,
            "/new" => {
                let history = assistant.new_conversation();
                println!("(started a new conversation, {} archived)", history.len());
            }
            "/history" => {
                for record in assistant.history() {
                    println!("- {} ({} messages)", record.title, record.messages.len());
                }
            }
            text => match assistant.send(text).await {
                Ok(reply) => {
                    println!("{}", reply.text);
                    if let Some(chart) = &reply.chart_data {
                        println!(
                            "[chart: {:?} \"{}\" over {} labels]",
                            chart.chart_type,
                            chart.title,
                            chart.labels.len()
                        );
                    }
                }
                Err(error) => println!("({error})"),
            },
        }
    }

    Ok(())
}

fn load_catalog() -> Result<Catalog> {
    let raw = match env::var("ULAP_CATALOG") {
        Ok(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read catalog file {path}"))?,
        Err(_) => SAMPLE_CATALOG.to_string(),
    };
    Catalog::from_json(&raw).context("failed to parse catalog JSON")
}
