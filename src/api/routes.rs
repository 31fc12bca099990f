use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::db::models::{EvaluationRow, PropositionRow, RunRow};
use crate::error::AppError;
use crate::types::{Tier, Verbosity};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/propositions", get(get_propositions))
        .route("/evaluations", get(get_evaluations))
        .route("/players/:name/evaluations", get(get_player_evaluations))
        .route("/runs/latest", get(get_latest_run))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RunQuery {
    /// Defaults to the most recent run.
    pub run_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct EvaluationsQuery {
    pub run_id: Option<i64>,
    pub min_hit_rate: Option<f64>,
    pub tier: Option<String>,
    /// `true` keeps detailed evaluations only, `false` summary ones only.
    pub detailed: Option<bool>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub batch_running: bool,
    pub last_run_id: Option<i64>,
    pub runs_completed: u64,
}

#[derive(Serialize)]
pub struct PropositionResponse {
    pub id: i64,
    pub run_id: i64,
    pub player_name: String,
    pub stat: String,
    pub target: f64,
    pub direction: String,
    pub tier: String,
}

#[derive(Serialize)]
pub struct EvaluationResponse {
    pub id: i64,
    pub run_id: i64,
    pub player_name: String,
    pub stat: String,
    pub target: f64,
    pub direction: String,
    pub tier: String,
    pub hits: i64,
    pub misses: i64,
    pub ties: i64,
    pub games_active: i64,
    pub games_missed: i64,
    pub window_len: i64,
    pub hit_rate: f64,
    pub median: f64,
    pub mode: Option<f64>,
    pub mean: f64,
    pub verbosity: String,
    pub rationale: Vec<String>,
    pub evaluated_at: i64,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub propositions: i64,
    pub evaluations: i64,
    pub skipped: i64,
    pub players_evaluated: i64,
    pub players_skipped: i64,
}

impl From<PropositionRow> for PropositionResponse {
    fn from(r: PropositionRow) -> Self {
        Self {
            id: r.id,
            run_id: r.run_id,
            player_name: r.player_name,
            stat: r.stat,
            target: r.target,
            direction: r.direction,
            tier: r.tier,
        }
    }
}

impl From<EvaluationRow> for EvaluationResponse {
    fn from(r: EvaluationRow) -> Self {
        Self {
            id: r.id,
            run_id: r.run_id,
            player_name: r.player_name,
            stat: r.stat,
            target: r.target,
            direction: r.direction,
            tier: r.tier,
            hits: r.hits,
            misses: r.misses,
            ties: r.ties,
            games_active: r.games_active,
            games_missed: r.games_missed,
            window_len: r.window_len,
            hit_rate: r.hit_rate,
            median: r.median,
            mode: r.mode,
            mean: r.mean,
            verbosity: r.verbosity,
            rationale: serde_json::from_str(&r.rationale).unwrap_or_default(),
            evaluated_at: r.evaluated_at,
        }
    }
}

impl From<RunRow> for RunResponse {
    fn from(r: RunRow) -> Self {
        Self {
            id: r.id,
            started_at: r.started_at,
            finished_at: r.finished_at,
            propositions: r.propositions,
            evaluations: r.evaluations,
            skipped: r.skipped,
            players_evaluated: r.players_evaluated,
            players_skipped: r.players_skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        batch_running: state.health.batch_running(),
        last_run_id: state.health.last_run_id(),
        runs_completed: state.health.runs_completed(),
    })
}

async fn get_propositions(
    State(state): State<ApiState>,
    Query(params): Query<RunQuery>,
) -> Result<Json<Vec<PropositionResponse>>, AppError> {
    let limit = params.limit.unwrap_or(500);

    let rows: Vec<PropositionRow> = sqlx::query_as(
        r#"
        SELECT id, run_id, player_name, stat, target, direction, tier
        FROM propositions
        WHERE run_id = COALESCE(?, (SELECT MAX(id) FROM runs))
        ORDER BY id
        LIMIT ?
        "#,
    )
    .bind(params.run_id)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn get_evaluations(
    State(state): State<ApiState>,
    Query(params): Query<EvaluationsQuery>,
) -> Result<Json<Vec<EvaluationResponse>>, AppError> {
    let limit = params.limit.unwrap_or(200);
    let min_hit_rate = params.min_hit_rate.unwrap_or(0.0);
    let tier = match params.tier.as_deref() {
        Some(t) => Some(
            Tier::parse(t)
                .ok_or_else(|| AppError::BadRequest(format!("unknown tier: {t}")))?
                .to_string(),
        ),
        None => None,
    };
    let verbosity = params.detailed.map(|detailed| {
        let v = if detailed { Verbosity::Detailed } else { Verbosity::Summary };
        v.to_string()
    });

    let rows: Vec<EvaluationRow> = sqlx::query_as(
        r#"
        SELECT * FROM evaluations
        WHERE run_id = COALESCE(?, (SELECT MAX(id) FROM runs))
          AND hit_rate >= ?
          AND (? IS NULL OR tier = ?)
          AND (? IS NULL OR verbosity = ?)
        ORDER BY hit_rate DESC, id
        LIMIT ?
        "#,
    )
    .bind(params.run_id)
    .bind(min_hit_rate)
    .bind(&tier)
    .bind(&tier)
    .bind(&verbosity)
    .bind(&verbosity)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn get_player_evaluations(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<RunQuery>,
) -> Result<Json<Vec<EvaluationResponse>>, AppError> {
    let limit = params.limit.unwrap_or(100);

    let rows: Vec<EvaluationRow> = sqlx::query_as(
        r#"
        SELECT * FROM evaluations
        WHERE player_name = ? COLLATE NOCASE
          AND run_id = COALESCE(?, (SELECT MAX(id) FROM runs))
        ORDER BY id
        LIMIT ?
        "#,
    )
    .bind(&name)
    .bind(params.run_id)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    if rows.is_empty() {
        return Err(AppError::PlayerNotFound(name));
    }
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// `null` until the first run is recorded.
async fn get_latest_run(
    State(state): State<ApiState>,
) -> Result<Json<Option<RunResponse>>, AppError> {
    let row: Option<RunRow> = sqlx::query_as("SELECT * FROM runs ORDER BY id DESC LIMIT 1")
        .fetch_optional(&state.pool)
        .await?;
    Ok(Json(row.map(Into::into)))
}
