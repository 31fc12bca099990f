use crate::error::{AppError, Result};
use crate::types::Tier;

pub const NBA_STATS_URL: &str = "https://stats.nba.com/stats";
pub const PROPS_URL: &str =
    "https://api.prizepicks.com/projections?league_id=7&per_page=250&single_stat=true";
pub const NBA_SEASON: &str = "2024-25";

/// Most recent games considered per player.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Pause between provider requests (milliseconds).
pub const REQUEST_DELAY_MS: u64 = 400;

/// Channel capacity for the evaluation writer.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Upstream request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Hit-rate floors for a detailed report, per tier.
pub mod tier_thresholds {
    pub const GOBLIN: f64 = 0.90;
    pub const STANDARD: f64 = 0.80;
    pub const DEMON: f64 = 0.55;
}

/// Multipliers on the target above/below which a rationale line is emitted.
pub mod rationale_factors {
    pub const OVER: f64 = 1.3;
    pub const UNDER: f64 = 0.7;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub goblin: f64,
    pub standard: f64,
    pub demon: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            goblin: tier_thresholds::GOBLIN,
            standard: tier_thresholds::STANDARD,
            demon: tier_thresholds::DEMON,
        }
    }
}

impl TierThresholds {
    /// Hit-rate floor at or above which a prop of `tier` is reported in detail.
    pub fn floor(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Goblin => self.goblin,
            Tier::Standard => self.standard,
            Tier::Demon => self.demon,
        }
    }
}

/// Heuristics the engine runs with. Passed explicitly, never read from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSettings {
    pub window_size: usize,
    pub thresholds: TierThresholds,
    pub rationale_over_factor: f64,
    pub rationale_under_factor: f64,
    /// Standard-tier props have no fixed direction and are evaluated both ways.
    pub both_directions_for_standard: bool,
    /// Caller override: every evaluation is reported in detail.
    pub force_detailed: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            thresholds: TierThresholds::default(),
            rationale_over_factor: rationale_factors::OVER,
            rationale_under_factor: rationale_factors::UNDER,
            both_directions_for_standard: true,
            force_detailed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Keep serving the read API after the batch finishes (SERVE_API)
    pub serve_api: bool,
    /// Load the projection feed from this file instead of fetching it (PROPS_PATH)
    pub props_path: Option<String>,
    pub props_url: String,
    pub nba_stats_url: String,
    pub season: String,
    pub request_delay_ms: u64,
    /// Players fetched in parallel (FETCH_CONCURRENCY)
    pub fetch_concurrency: usize,
    pub eval: EvalSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = EvalSettings::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "props.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            serve_api: env_flag("SERVE_API", false),
            props_path: std::env::var("PROPS_PATH").ok().filter(|s| !s.trim().is_empty()),
            props_url: std::env::var("PROPS_URL").unwrap_or_else(|_| PROPS_URL.to_string()),
            nba_stats_url: std::env::var("NBA_STATS_URL")
                .unwrap_or_else(|_| NBA_STATS_URL.to_string()),
            season: std::env::var("NBA_SEASON").unwrap_or_else(|_| NBA_SEASON.to_string()),
            request_delay_ms: env_parse("REQUEST_DELAY_MS", REQUEST_DELAY_MS),
            fetch_concurrency: env_parse("FETCH_CONCURRENCY", 1usize).max(1),
            eval: EvalSettings {
                window_size: env_parse("WINDOW_SIZE", defaults.window_size).max(1),
                thresholds: TierThresholds {
                    goblin: env_parse("THRESHOLD_GOBLIN", defaults.thresholds.goblin),
                    standard: env_parse("THRESHOLD_STANDARD", defaults.thresholds.standard),
                    demon: env_parse("THRESHOLD_DEMON", defaults.thresholds.demon),
                },
                rationale_over_factor: env_parse(
                    "RATIONALE_OVER_FACTOR",
                    defaults.rationale_over_factor,
                ),
                rationale_under_factor: env_parse(
                    "RATIONALE_UNDER_FACTOR",
                    defaults.rationale_under_factor,
                ),
                both_directions_for_standard: env_flag(
                    "BOTH_DIRECTIONS_FOR_STANDARD",
                    defaults.both_directions_for_standard,
                ),
                force_detailed: env_flag("FORCE_DETAILED", defaults.force_detailed),
            },
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => parse_flag(&v).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
