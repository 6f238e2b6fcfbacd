//! Summarize a local text file with the configured provider chain.
//!
//! Run with:
//!
//! ```bash
//! export GROQ_API_KEY_PRIMARY=gsk_...
//! cargo run --example summarize_file -- chapter.txt detailed
//! ```
//!
//! Set `RUST_LOG=webnovel_summarizer=debug` to follow provider and chunk decisions.

use std::sync::Arc;

use webnovel_summarizer::{
    HttpCompletionClient, MemorySink, SourceDocument, SummarizerConfig, SummaryOrchestrator,
    SummaryService, SummaryType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("webnovel_summarizer=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: summarize_file <chapter.txt> [short|detailed|very_detailed]");
        std::process::exit(2);
    };
    let summary_type = match args.next() {
        Some(kind) => kind.parse::<SummaryType>()?,
        None => SummaryType::default(),
    };

    let config = SummarizerConfig::load()?;
    let orchestrator =
        SummaryOrchestrator::from_config(&config, Arc::new(HttpCompletionClient::new()));
    println!(
        "Providers: {}",
        orchestrator.catalog().names().join(" -> ")
    );

    let content = std::fs::read_to_string(&path)?;
    let document = SourceDocument::new(content, format!("file://{}", path), path.clone());

    let sink = MemorySink::new();
    let service = SummaryService::from_config(&config, orchestrator, Arc::new(sink.clone()));

    match service.summarize(&document, summary_type).await {
        Ok(record) => {
            println!(
                "== {} via {} ({}) ==\n",
                record.summary_type.description(),
                record.provider,
                record.model
            );
            println!("{}", record.text);
        }
        Err(error) => {
            eprintln!("{}", error.user_description());
            return Err(error.into());
        }
    }

    Ok(())
}
