use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Statistic not recognized: {0}")]
    UnknownStat(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("No games available for player: {0}")]
    EmptyWindow(String),

    #[error("Upstream payload error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Player not found or no games: the player has nothing to evaluate.
    /// Other window failures are transport or payload errors.
    pub fn is_lookup(&self) -> bool {
        matches!(self, AppError::PlayerNotFound(_) | AppError::EmptyWindow(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::PlayerNotFound(_) | AppError::EmptyWindow(_) => StatusCode::NOT_FOUND,
            AppError::UnknownStat(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
