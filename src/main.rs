//! moneta CLI: interactive finance-assistant chat

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use moneta_cli::agent::ChatAgent;
use moneta_cli::config::Config;
use moneta_cli::llm::{ChatCompletionsClient, StreamEvent};
use moneta_cli::remote::FuzzySearchClient;
use moneta_cli::store::TransactionStore;
use moneta_cli::tools::ToolRegistry;

#[derive(Parser, Debug)]
#[command(name = "moneta", about = "Finance tracker chat assistant", version)]
struct Args {
    /// Path to config.toml (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the transactions JSON feed
    #[arg(long)]
    data: Option<PathBuf>,

    /// Year to analyze (default: current year)
    #[arg(long)]
    year: Option<i32>,

    /// Model override
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if config.llm.api_key.is_empty() {
        anyhow::bail!("no API key configured; set MONETA_API_KEY or [llm].api_key in config.toml");
    }

    let data_path = args
        .data
        .or_else(|| config.data.transactions_path.clone())
        .context("no transaction feed; pass --data or set [data].transactions_path")?;
    let year = args
        .year
        .or(config.data.year)
        .unwrap_or_else(|| chrono::Local::now().year());

    let store = Arc::new(TransactionStore::load_json(&data_path, year)?);

    let model = args.model.unwrap_or_else(|| config.llm.model.clone());
    let client = ChatCompletionsClient::new(&config.llm.base_url, &config.llm.api_key, model)
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);

    let mut registry = ToolRegistry::new(store);
    if config.remote.enabled {
        let remote = FuzzySearchClient::new(&config.remote.base_url, &config.remote.api_key);
        registry = registry.with_remote(Arc::new(remote));
    }

    let mut agent = ChatAgent::new(Arc::new(client), registry);

    println!("moneta ({} data loaded); ask about your finances, :quit to exit", year);

    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" || line == "exit" {
            break;
        }

        let on_event = |event: StreamEvent| match event {
            StreamEvent::TextDelta(delta) => {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            StreamEvent::ToolCallStart { name, .. } => {
                tracing::info!(tool = %name, "model requested tool");
            }
            _ => {}
        };

        match agent.send(line, &on_event).await {
            Ok(_) => println!(),
            Err(e) => eprintln!("\nerror: {}", e),
        }
    }

    Ok(())
}
