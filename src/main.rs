mod cli;

use scenecatalog::{
    config,
    scanner::ScanOrchestrator,
    state::{EventBus, ScanEvent},
};
use scenecatalog_common::MediaKind;
use scenecatalog_db::pool::{get_conn, init_pool, DbPool};
use scenecatalog_db::queries::{items, scan_runs};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "scenecatalog=trace,scenecatalog_db=debug,scenecatalog_parser=debug,scenecatalog_common=debug"
                .to_string()
        } else {
            "scenecatalog=info,scenecatalog_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_scan(cli.config.as_deref(), json))
        }
        Commands::Parse { name, json } => parse_name(&name, json),
        Commands::Items { kind, unresolved } => {
            list_items(cli.config.as_deref(), kind.map(MediaKind::from), unresolved)
        }
        Commands::Duplicates => list_duplicates(cli.config.as_deref()),
        Commands::History { limit } => show_history(cli.config.as_deref(), limit),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("scenecatalog {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_pool(config: &config::Config) -> Result<DbPool> {
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db_path = config.database.path.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path);
    Ok(init_pool(&db_path)?)
}

async fn run_scan(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_pool(&config)?;
    let events = Arc::new(EventBus::default());
    let orchestrator = ScanOrchestrator::from_config(&config, pool, Arc::clone(&events))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling scan");
            ctrl_c.cancel();
        }
    });

    let progress = tokio::spawn(log_progress(BroadcastStream::new(events.subscribe())));

    let report = orchestrator.scan(cancel).await;
    if let Some(sweep) = orchestrator.wait_for_identity_sweep().await {
        tracing::info!(
            fingerprinted = sweep.fingerprinted,
            adopted = sweep.adopted,
            submitted = sweep.submitted,
            duplicates = sweep.duplicates.len(),
            "Identity sweep done"
        );
    }
    progress.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Scan {}", report.status.phase);
        println!("  Files discovered: {}", report.files_discovered);
        println!("  Files skipped: {}", report.files_skipped);
        println!("  Items processed: {}", report.items_processed);
        println!("  Items scheduled: {}", report.items_scheduled);
        println!("  Resolved: {}", report.items_resolved);
        println!("  Failed: {}", report.items_failed);
        if !report.status.errors.is_empty() {
            println!("  Errors:");
            for error in &report.status.errors {
                println!("    - {}", error);
            }
        }
    }

    if !report.succeeded() {
        anyhow::bail!("scan ended in phase {}", report.status.phase);
    }
    Ok(())
}

async fn log_progress(mut stream: BroadcastStream<scenecatalog::state::Event>) {
    while let Some(event) = stream.next().await {
        let Ok(event) = event else { continue };
        match event.payload {
            ScanEvent::PhaseChanged { to, status, .. } => {
                tracing::info!(phase = %to, errors = status.errors.len(), "Phase changed");
            }
            ScanEvent::ItemCompleted {
                title,
                confidence,
                method,
                ..
            } => {
                tracing::info!(%title, confidence, %method, "Matched");
            }
            ScanEvent::ItemFailed {
                title,
                error,
                will_retry,
                ..
            } => {
                tracing::debug!(%title, %error, will_retry, "Match attempt failed");
            }
            ScanEvent::DuplicatesFound {
                fingerprint,
                item_ids,
            } => {
                tracing::info!(%fingerprint, items = item_ids.len(), "Duplicates found");
            }
            _ => {}
        }
    }
}

fn parse_name(name: &str, json: bool) -> Result<()> {
    let parsed = scenecatalog_parser::parse(name);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("Title: {}", parsed.title);
    if let Some(year) = parsed.year {
        println!("Year: {}", year);
    }
    if let Some(ref resolution) = parsed.resolution {
        println!("Resolution: {}", resolution);
    }
    if let Some(ref source) = parsed.source_tag {
        println!("Source: {}", source);
    }
    if let Some(season) = parsed.season {
        println!("Season: {}", season);
    }
    if let Some(episode) = parsed.episode {
        println!("Episode: {}", episode);
    }
    if let Some(ref group) = parsed.release_group {
        println!("Group: {}", group);
    }
    Ok(())
}

fn list_items(config_path: Option<&Path>, kind: Option<MediaKind>, unresolved: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_pool(&config)?;
    let conn = get_conn(&pool)?;

    let mut items = if unresolved {
        items::list_unenriched(&conn)?
    } else {
        items::list_items(&conn, kind)?
    };
    if let Some(kind) = kind {
        items.retain(|item| item.kind == kind);
    }
    for item in &items {
        let year = item.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        let method = item
            .match_method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}  {:<7} {}{}  [{}]", item.id, item.kind.to_string(), item.title, year, method);
    }
    println!("{} item(s)", items.len());
    Ok(())
}

fn list_duplicates(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_pool(&config)?;
    let conn = get_conn(&pool)?;

    let duplicates = items::find_duplicates(&conn)?;
    if duplicates.is_empty() {
        println!("No duplicates found");
        return Ok(());
    }
    for duplicate in &duplicates {
        println!("{}", duplicate.fingerprint);
        for item in &duplicate.items {
            println!("  {}  {}  {}", item.id, item.title, item.primary_path);
        }
    }
    Ok(())
}

fn show_history(config_path: Option<&Path>, limit: u32) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_pool(&config)?;
    let conn = get_conn(&pool)?;

    for run in scan_runs::list_recent(&conn, limit)? {
        println!(
            "#{} {} {} files={} items={} resolved={} failed={} errors={}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.phase,
            run.files_discovered,
            run.items_processed,
            run.items_resolved,
            run.items_failed,
            run.errors.len()
        );
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            config::validate_config(&config)?;
            config
        }
    };

    println!("✓ Configuration is valid");
    match config.storage.share_path {
        Some(ref share) => println!("  Share: {}", share.display()),
        None => println!("  Share: (not configured)"),
    }
    println!("  Root folders: {}", config.storage.root_folders.len());
    println!("  Database: {}", config.database.path.display());
    println!(
        "  Scheduler: {} concurrent, {} attempts",
        config.scheduler.max_concurrency, config.scheduler.max_retries
    );
    println!("  TMDB: {}", if config.tmdb.api_key.is_some() { "configured" } else { "no api key" });
    println!("  Recognizer enabled: {}", config.recognizer.enabled);
    println!("  Identity enabled: {}", config.identity.enabled);
    Ok(())
}
