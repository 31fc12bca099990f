mod api;
mod config;
mod db;
mod engine;
mod error;
mod fetcher;
mod orchestrator;
mod props;
mod report;
mod state;
mod types;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::db::writer::{finish_run, insert_propositions, start_run, DbWriter, EvaluationRecord};
use crate::engine::StatResolver;
use crate::error::Result;
use crate::fetcher::NbaStatsClient;
use crate::orchestrator::{BatchOrchestrator, BatchReport, SkipReason};
use crate::props::load_propositions;
use crate::report::{emit, LogSink};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Propositions ---
    let (props, stats) = load_propositions(&cfg).await?;
    info!(
        "Feed loaded: {} propositions from {} projections",
        stats.accepted, stats.projections_total,
    );
    info!(
        "[FEED] rejected: no_player={} combo_player={} malformed={}",
        stats.rejected_no_player, stats.rejected_combo_player, stats.rejected_malformed,
    );
    if props.is_empty() {
        warn!("No propositions to evaluate");
    }

    // HTTP API server: up before the batch so /health reflects progress.
    let health = Arc::new(HealthState::new());
    let server = if cfg.serve_api {
        Some(spawn_api(&cfg, pool.clone(), Arc::clone(&health)).await?)
    } else {
        None
    };

    let run_id = now_ns() as i64;
    start_run(&pool, run_id, run_id).await?;
    insert_propositions(&pool, run_id, &props).await?;
    health.run_started();

    // --- Evaluate ---
    let client = NbaStatsClient::new(&cfg)?;
    let orchestrator =
        BatchOrchestrator::new(Arc::new(client), StatResolver::new(), cfg.eval.clone())
            .with_concurrency(cfg.fetch_concurrency);
    let report = orchestrator.run(&props).await;

    emit(&report, &mut LogSink);
    log_skips(&report);

    // --- Persist ---
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = tokio::spawn(DbWriter::new(pool.clone(), rx).run());
    let evaluated_at_ns = now_ns() as i64;
    for classified in &report.evaluations {
        let record = EvaluationRecord {
            run_id,
            evaluated_at_ns,
            classified: classified.clone(),
        };
        if tx.send(record).await.is_err() {
            warn!("DB writer stopped early");
            break;
        }
    }
    drop(tx);
    match writer.await {
        Ok(written) => info!("Persisted {written} evaluations for run {run_id}"),
        Err(e) => error!("DB writer task failed: {e}"),
    }

    finish_run(&pool, run_id, now_ns() as i64, props.len(), &report).await?;
    health.run_finished(run_id);

    let Some(server) = server else {
        return Ok(());
    };
    info!("Batch complete, HTTP API still serving");
    match server.await {
        Ok(served) => served?,
        Err(e) => error!("HTTP API task failed: {e}"),
    }

    Ok(())
}

async fn spawn_api(
    cfg: &Config,
    pool: sqlx::SqlitePool,
    health: Arc<HealthState>,
) -> Result<JoinHandle<std::io::Result<()>>> {
    let app = router(ApiState { pool, health });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    Ok(tokio::spawn(async move { axum::serve(listener, app).await }))
}

fn log_skips(report: &BatchReport) {
    if report.skipped.is_empty() {
        return;
    }
    let unknown_stat = report
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::UnknownStat)
        .count();
    warn!(
        skipped = report.skipped.len(),
        unknown_stat,
        unavailable = report.skipped.len() - unknown_stat,
        players_skipped = report.players_skipped,
        "Skipped {} propositions",
        report.skipped.len(),
    );
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
