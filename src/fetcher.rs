use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::{GameRecord, StatCode};

/// Supplies per-player game history, newest first.
#[async_trait]
pub trait GameLogSource: Send + Sync {
    /// `Ok(None)` when the player is unknown to the source.
    async fn fetch_recent_games(
        &self,
        player_name: &str,
        max_games: usize,
    ) -> Result<Option<Vec<GameRecord>>>;
}

// ---------------------------------------------------------------------------
// Result sets
// ---------------------------------------------------------------------------

/// One tabular block of a stats.nba.com response: column headers plus row arrays.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    /// First result set of a response. Some endpoints use `resultSet` instead of `resultSets`.
    pub fn first(v: &serde_json::Value) -> Result<Self> {
        let set = v
            .get("resultSets")
            .and_then(|s| s.as_array())
            .and_then(|a| a.first())
            .or_else(|| v.get("resultSet"))
            .ok_or_else(|| AppError::Upstream("response has no result set".to_string()))?;

        let headers = set
            .get("headers")
            .and_then(|h| h.as_array())
            .ok_or_else(|| AppError::Upstream("result set has no headers".to_string()))?
            .iter()
            .map(|h| h.as_str().unwrap_or_default().to_string())
            .collect();

        let rows = set
            .get("rowSet")
            .and_then(|r| r.as_array())
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.as_array().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn cell<'a>(&self, row: &'a [serde_json::Value], name: &str) -> Option<&'a serde_json::Value> {
        row.get(self.column(name)?)
    }

    fn text(&self, row: &[serde_json::Value], name: &str) -> Option<String> {
        match self.cell(row, name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn number(&self, row: &[serde_json::Value], name: &str) -> Option<f64> {
        match self.cell(row, name)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => parse_number(s),
            _ => None,
        }
    }
}

/// Plain numbers and "MM:SS" minute strings.
fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some((m, sec)) = s.split_once(':') {
        let m: f64 = m.parse().ok()?;
        let sec: f64 = sec.parse().ok()?;
        return Some(m + sec / 60.0);
    }
    s.parse().ok()
}

/// Provider dates look like "APR 13, 2025"; ISO dates are accepted too.
pub fn parse_game_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%b %d, %Y")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok())
}

fn stat_values(set: &ResultSet, row: &[serde_json::Value]) -> Vec<(StatCode, f64)> {
    StatCode::ALL
        .iter()
        .filter_map(|&code| set.number(row, code.code()).map(|v| (code, v)))
        .collect()
}

/// Join the team's finished games with the player's log so that games the
/// player sat out appear as non-participation. Without a schedule every logged
/// game counts as played. Output is newest first.
pub fn merge_game_logs(schedule: Option<&ResultSet>, player_log: &ResultSet) -> Vec<GameRecord> {
    let mut by_game: HashMap<String, &Vec<serde_json::Value>> = HashMap::new();
    for row in &player_log.rows {
        if let Some(game_id) = player_log.text(row, "Game_ID") {
            by_game.insert(game_id, row);
        }
    }

    let mut records = Vec::new();
    match schedule.filter(|s| !s.rows.is_empty()) {
        Some(schedule) => {
            for row in &schedule.rows {
                let finished = schedule
                    .text(row, "WL")
                    .is_some_and(|wl| !wl.trim().is_empty());
                if !finished {
                    continue;
                }
                let Some(date) = schedule.text(row, "GAME_DATE").and_then(|d| parse_game_date(&d))
                else {
                    continue;
                };
                let player_row = schedule
                    .text(row, "Game_ID")
                    .and_then(|id| by_game.get(&id).copied());

                let mut record = GameRecord::new(date, player_row.is_some());
                record.matchup = schedule.text(row, "MATCHUP");
                record.result = schedule.text(row, "WL");
                if let Some(prow) = player_row {
                    record.stats.extend(stat_values(player_log, prow));
                }
                records.push(record);
            }
        }
        None => {
            for row in &player_log.rows {
                let Some(date) = player_log.text(row, "GAME_DATE").and_then(|d| parse_game_date(&d))
                else {
                    continue;
                };
                let mut record = GameRecord::new(date, true);
                record.matchup = player_log.text(row, "MATCHUP");
                record.result = player_log.text(row, "WL");
                record.stats.extend(stat_values(player_log, row));
                records.push(record);
            }
        }
    }

    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
}

#[derive(Debug, Clone)]
struct PlayerEntry {
    id: i64,
    name: String,
}

/// Exact (case-insensitive) name match first, then substring match.
fn find_player(entries: &[PlayerEntry], name: &str) -> Option<i64> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    entries
        .iter()
        .find(|e| e.name.to_lowercase() == needle)
        .or_else(|| entries.iter().find(|e| e.name.to_lowercase().contains(&needle)))
        .map(|e| e.id)
}

// ---------------------------------------------------------------------------
// NbaStatsClient
// ---------------------------------------------------------------------------

/// Game log source backed by the stats.nba.com REST endpoints.
/// Requests are spaced by `request_delay` to stay under the provider's rate limit.
pub struct NbaStatsClient {
    client: reqwest::Client,
    base_url: String,
    season: String,
    request_delay: Duration,
    players: OnceCell<Vec<PlayerEntry>>,
}

impl NbaStatsClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.nba_stats_url.trim_end_matches('/').to_string(),
            season: cfg.season.clone(),
            request_delay: Duration::from_millis(cfg.request_delay_ms),
            players: OnceCell::new(),
        })
    }

    async fn result_set(&self, endpoint: &str, params: &[(&str, String)]) -> Result<ResultSet> {
        tokio::time::sleep(self.request_delay).await;
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "stats request");
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        ResultSet::first(&resp)
    }

    async fn player_index(&self) -> Result<&Vec<PlayerEntry>> {
        self.players
            .get_or_try_init(|| async {
                let set = self
                    .result_set(
                        "commonallplayers",
                        &[
                            ("LeagueID", "00".to_string()),
                            ("Season", self.season.clone()),
                            ("IsOnlyCurrentSeason", "0".to_string()),
                        ],
                    )
                    .await?;
                let entries: Vec<PlayerEntry> = set
                    .rows
                    .iter()
                    .filter_map(|row| {
                        let id = set.number(row, "PERSON_ID")? as i64;
                        let name = set.text(row, "DISPLAY_FIRST_LAST")?;
                        Some(PlayerEntry { id, name })
                    })
                    .collect();
                info!("Loaded player index: {} players", entries.len());
                Ok::<_, AppError>(entries)
            })
            .await
    }

    async fn team_id(&self, player_id: i64) -> Result<Option<i64>> {
        let set = self
            .result_set("commonplayerinfo", &[("PlayerID", player_id.to_string())])
            .await?;
        Ok(set
            .rows
            .first()
            .and_then(|row| set.number(row, "TEAM_ID"))
            .map(|id| id as i64)
            .filter(|&id| id > 0))
    }
}

#[async_trait]
impl GameLogSource for NbaStatsClient {
    async fn fetch_recent_games(
        &self,
        player_name: &str,
        max_games: usize,
    ) -> Result<Option<Vec<GameRecord>>> {
        let Some(player_id) = find_player(self.player_index().await?, player_name) else {
            return Ok(None);
        };

        let team_id = self.team_id(player_id).await?;
        let player_log = self
            .result_set(
                "playergamelog",
                &[
                    ("PlayerID", player_id.to_string()),
                    ("Season", self.season.clone()),
                    ("SeasonType", "Regular Season".to_string()),
                ],
            )
            .await?;

        let schedule = match team_id {
            Some(team_id) => Some(
                self.result_set(
                    "teamgamelog",
                    &[
                        ("TeamID", team_id.to_string()),
                        ("Season", self.season.clone()),
                        ("SeasonType", "Regular Season".to_string()),
                    ],
                )
                .await?,
            ),
            None => None,
        };

        let mut records = merge_game_logs(schedule.as_ref(), &player_log);
        records.truncate(max_games);
        debug!(player = player_name, player_id, games = records.len(), "game log fetched");
        Ok(Some(records))
    }
}
