use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::Result;
use crate::orchestrator::BatchReport;
use crate::types::{ClassifiedEvaluation, Proposition};

/// One evaluation queued for persistence.
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub run_id: i64,
    /// Nanosecond UTC epoch timestamp.
    pub evaluated_at_ns: i64,
    pub classified: ClassifiedEvaluation,
}

/// Receives evaluation records and persists them to SQLite.
/// Runs as a dedicated background task so reporting never waits on storage.
pub struct DbWriter {
    pool: sqlx::SqlitePool,
    rx: mpsc::Receiver<EvaluationRecord>,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool, rx: mpsc::Receiver<EvaluationRecord>) -> Self {
        Self { pool, rx }
    }

    /// Drains the channel until every sender is dropped. Returns rows written.
    pub async fn run(mut self) -> u64 {
        let mut written = 0u64;
        while let Some(record) = self.rx.recv().await {
            match write_evaluation(&self.pool, &record).await {
                Ok(()) => written += 1,
                Err(e) => error!("DB write error: {e}"),
            }
        }
        written
    }
}

pub async fn write_evaluation(pool: &sqlx::SqlitePool, r: &EvaluationRecord) -> Result<()> {
    let e = &r.classified.evaluation;
    let rationale = serde_json::to_string(&e.rationale)?;

    sqlx::query(
        r#"
        INSERT INTO evaluations (
            run_id, player_name, stat, target, direction, tier,
            hits, misses, ties, games_active, games_missed, window_len,
            hit_rate, median, mode, mean, verbosity, rationale, evaluated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(r.run_id)
    .bind(&e.player_name)
    .bind(&e.stat)
    .bind(e.target)
    .bind(e.direction.to_string())
    .bind(e.tier.to_string())
    .bind(i64::from(e.hits))
    .bind(i64::from(e.misses))
    .bind(i64::from(e.ties))
    .bind(i64::from(e.games_active))
    .bind(i64::from(e.games_missed))
    .bind(i64::from(e.window_len))
    .bind(e.hit_rate)
    .bind(e.median)
    .bind(e.mode)
    .bind(e.mean)
    .bind(r.classified.verbosity.to_string())
    .bind(rationale)
    .bind(r.evaluated_at_ns)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn start_run(pool: &sqlx::SqlitePool, run_id: i64, started_at_ns: i64) -> Result<()> {
    sqlx::query("INSERT INTO runs (id, started_at) VALUES (?, ?)")
        .bind(run_id)
        .bind(started_at_ns)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store the normalized propositions of a run in one transaction.
pub async fn insert_propositions(
    pool: &sqlx::SqlitePool,
    run_id: i64,
    props: &[Proposition],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    for p in props {
        sqlx::query(
            r#"
            INSERT INTO propositions (run_id, player_name, stat, target, direction, tier)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run_id)
        .bind(&p.player_name)
        .bind(&p.stat)
        .bind(p.target)
        .bind(p.direction.to_string())
        .bind(p.tier.to_string())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    info!("Persisted {} propositions for run {run_id}", props.len());
    Ok(())
}

pub async fn finish_run(
    pool: &sqlx::SqlitePool,
    run_id: i64,
    finished_at_ns: i64,
    propositions: usize,
    report: &BatchReport,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE runs SET
            finished_at = ?, propositions = ?, evaluations = ?, skipped = ?,
            players_evaluated = ?, players_skipped = ?
        WHERE id = ?
        "#,
    )
    .bind(finished_at_ns)
    .bind(propositions as i64)
    .bind(report.evaluations.len() as i64)
    .bind(report.skipped.len() as i64)
    .bind(report.players_evaluated as i64)
    .bind(report.players_skipped as i64)
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}
