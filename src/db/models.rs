//! Row types for the tables in `migrations/`.
//! Used by sqlx for typed queries.

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub propositions: i64,
    pub evaluations: i64,
    pub skipped: i64,
    pub players_evaluated: i64,
    pub players_skipped: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropositionRow {
    pub id: i64,
    pub run_id: i64,
    pub player_name: String,
    pub stat: String,
    pub target: f64,
    pub direction: String,
    pub tier: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvaluationRow {
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
    /// JSON array of rationale lines.
    pub rationale: String,
    pub evaluated_at: i64,
}
