mod batch;
mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedmatch_core::{
    load_config, load_config_from_env, validate_config, AssessmentEngine, Config,
    DecisionDocument, DecisionStore, DirTorrentFileCache, HttpMetafileFetcher,
    SqliteDecisionStore,
};

use batch::{run_batch, BatchInput};
use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.json);

    let config = load(&cli.config)?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Decision database: {:?}", config.storage.decision_db);

    let decisions = Arc::new(
        SqliteDecisionStore::open(&config.storage.decision_db)
            .context("Failed to open decision store")?,
    );

    match cli.command {
        Command::Assess { input, no_delay } => {
            assess(&config, Arc::clone(&decisions), &input, no_delay).await?
        }
        Command::Stats => {
            let stats = decisions.stats().context("Failed to read statistics")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export => {
            let document = decisions.export().context("Failed to export decisions")?;
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &document)?;
            writeln!(stdout)?;
        }
        Command::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let document: DecisionDocument = serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {:?}", file))?;
            let added = decisions
                .import(&document)
                .context("Failed to import decisions")?;
            info!("Imported {} new decision(s) from {:?}", added, file);
        }
    }

    match Arc::try_unwrap(decisions) {
        Ok(store) => store.close().context("Failed to close decision store")?,
        Err(_) => error!("Decision store still in use at shutdown"),
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        info!("Loading configuration from {:?}", path);
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
    } else {
        info!("No configuration at {:?}, using defaults", path);
        load_config_from_env().context("Failed to load config from environment")
    }
}

async fn assess(
    config: &Config,
    decisions: Arc<SqliteDecisionStore>,
    input: &Path,
    no_delay: bool,
) -> Result<()> {
    let data =
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?;
    let batch: BatchInput =
        serde_json::from_str(&data).with_context(|| format!("Failed to parse {:?}", input))?;

    let torrents = Arc::new(
        DirTorrentFileCache::open(&config.storage.torrent_cache_dir)
            .context("Failed to open torrent cache")?,
    );
    let fetcher = Arc::new(
        HttpMetafileFetcher::new(config.matching.fetch_timeout(), &config.fetcher.user_agent)
            .context("Failed to create torrent fetcher")?,
    );
    let engine = AssessmentEngine::new(decisions, torrents, fetcher, config.matching.clone());

    let delay = if no_delay {
        Duration::ZERO
    } else {
        config.search.delay()
    };

    let mut stdout = std::io::stdout().lock();
    let summary = run_batch(&engine, &batch, delay, &mut stdout).await?;
    stdout.flush()?;

    info!(
        "Assessed {} candidate(s) for {} searchee(s): {} match(es)",
        summary.candidates, summary.searchees, summary.matches
    );
    Ok(())
}
