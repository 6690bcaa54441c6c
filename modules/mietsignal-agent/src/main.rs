use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maps_client::MapsClient;
use mietsignal_agent::engine::{build_pipeline, PipelineDeps, RunStats};
use mietsignal_agent::llm::{ClaudeAssessor, ClaudeExtractor, ClaudeNarrator};
use mietsignal_agent::store::SqliteStore;
use mietsignal_common::Config;
use telegram_client::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mietsignal=info".parse()?))
        .init();

    info!("Mietsignal agent starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store = SqliteStore::new(&config.db_path);
    store.init()?;

    let telegram = TelegramClient::new(&config.telegram_bot_token, &config.telegram_chat_id);
    telegram.check().await?;

    let maps = Arc::new(MapsClient::new(&config.google_maps_api_key));

    let pipeline = build_pipeline(PipelineDeps {
        extractor: Arc::new(ClaudeExtractor::new(&config.anthropic_api_key)),
        assessor: Arc::new(ClaudeAssessor::new(&config.anthropic_api_key)),
        narrator: Arc::new(ClaudeNarrator::new(&config.anthropic_api_key)),
        travel: maps.clone(),
        places: maps,
        store: Arc::new(store.clone()),
        notifier: Arc::new(telegram),
    });

    let pending = store.pending_pages(None)?;
    info!(count = pending.len(), "Pending listing pages loaded");

    // One listing at a time. Throughput is bounded by API quotas, not
    // by this loop.
    let mut stats = RunStats::default();
    for page in &pending {
        let record = pipeline.run_listing(page).await;
        stats.observe(&record);
    }

    info!(%stats, "Run complete");
    Ok(())
}
