use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use khata_classify::{BackgroundClassifier, HttpClassifier};
use khata_core::StatementDialect;
use khata_import::RowSource;
use khata_store::{CancelFlag, MemoryStore, PageCache, RestStore};
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;

use config::Config;
use pipeline::{run_import, ImportOptions, ImportReport};

#[derive(Parser)]
#[command(name = "khata", version, about = "Statement ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a statement file, deduplicate it, and upload the result.
    Import {
        /// Statement file (csv, tsv, xls/xlsx/xlsm, json, txt, pdf-as-text).
        file: PathBuf,
        /// Parse and deduplicate against an empty in-memory store instead
        /// of the persistence API.
        #[arg(long)]
        dry_run: bool,
        /// Skip dialect detection and force a specific statement layout.
        #[arg(long)]
        dialect: Option<StatementDialect>,
        /// Config file path (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("khata=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Import {
            file,
            dry_run,
            dialect,
            config,
        } => import(file, dry_run, dialect, config.as_deref()).await,
    }
}

async fn import(
    file: PathBuf,
    dry_run: bool,
    dialect: Option<StatementDialect>,
    config_path: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let source = RowSource::open(&file)
        .with_context(|| format!("opening statement {}", file.display()))?;

    let classifier = match &config.classifier.endpoint {
        Some(endpoint) => Some(BackgroundClassifier::new(
            HttpClassifier::new(endpoint.clone(), config.classifier.token.clone())
                .context("building classifier client")?,
            config.classifier_timeout(),
        )),
        None => None,
    };

    let cache = PageCache::new(Duration::from_secs(config.fetch.cache_ttl_secs));
    let progress: khata_core::ProgressFn = Box::new(|percent| {
        tracing::info!(percent, "import progress");
    });

    let report = if dry_run {
        let store = Arc::new(MemoryStore::new());
        run_import(
            source,
            ImportOptions {
                store,
                classifier: classifier.as_ref(),
                cache: &cache,
                owner: "dry-run".to_string(),
                forced_dialect: dialect,
                chunk_rows: config.import.chunk_rows,
                upload: config.upload_config(),
                fetch: config.fetch_limits(),
                cancel: CancelFlag::new(),
                progress: Some(progress),
            },
        )
        .await?
    } else {
        let store = Arc::new(RestStore::new(
            config.api.base_url.clone(),
            config.api.token.clone(),
            Duration::from_secs(config.api.timeout_secs),
        )?);
        run_import(
            source,
            ImportOptions {
                store,
                classifier: classifier.as_ref(),
                cache: &cache,
                // The API scopes records by token; one cache key per run.
                owner: "api".to_string(),
                forced_dialect: dialect,
                chunk_rows: config.import.chunk_rows,
                upload: config.upload_config(),
                fetch: config.fetch_limits(),
                cancel: CancelFlag::new(),
                progress: Some(progress),
            },
        )
        .await?
    };

    print_report(&report, dry_run);
    Ok(())
}

fn print_report(report: &ImportReport, dry_run: bool) {
    let c = &report.counters;
    println!("import {} ({})", report.batch_id, report.dialect);
    println!("  parsed:       {}", c.parsed);
    println!("  mapped:       {} ({} dropped)", c.mapped, c.dropped());
    println!("  duplicates:   {}", c.deduplicated);
    println!(
        "  inserted:     {}{}",
        c.inserted,
        if dry_run { " (dry run)" } else { "" }
    );
    if report.fetch_truncated {
        println!("  note: dedup seed was truncated by a fetch safety limit");
    }
}
