use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::Result;
use crate::types::{Direction, Proposition, Tier};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedStats {
    pub projections_total: usize,
    pub rejected_no_player: usize,
    /// Multi-player combo lines ("A + B"), not evaluable against one game log.
    pub rejected_combo_player: usize,
    pub rejected_malformed: usize,
    pub accepted: usize,
}

/// Load propositions from `PROPS_PATH` when set, otherwise fetch the feed.
pub async fn load_propositions(cfg: &Config) -> Result<(Vec<Proposition>, FeedStats)> {
    let feed: serde_json::Value = match &cfg.props_path {
        Some(path) => {
            info!("Loading projection feed from {path}");
            let raw = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&raw)?
        }
        None => fetch_feed(&cfg.props_url).await?,
    };
    Ok(parse_projection_feed(&feed))
}

async fn fetch_feed(url: &str) -> Result<serde_json::Value> {
    info!("Fetching projection feed from {url}");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
        .build()?;
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

/// Normalize a projection feed: `data[]` projections whose
/// `relationships.new_player.data.id` points into the `included[]` player entries.
pub fn parse_projection_feed(feed: &serde_json::Value) -> (Vec<Proposition>, FeedStats) {
    let mut stats = FeedStats::default();

    let players: HashMap<String, String> = feed
        .get("included")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter(|i| i.get("type").and_then(|t| t.as_str()) == Some("new_player"))
                .filter_map(|i| {
                    let id = id_string(i.get("id")?)?;
                    let name = i.get("attributes")?.get("name")?.as_str()?.to_string();
                    Some((id, name))
                })
                .collect()
        })
        .unwrap_or_default();

    let projections = feed
        .get("data")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    stats.projections_total = projections.len();

    let mut props = Vec::with_capacity(projections.len());
    for item in &projections {
        match parse_projection(item, &players) {
            Ok(prop) => props.push(prop),
            Err(Rejection::NoPlayer) => stats.rejected_no_player += 1,
            Err(Rejection::ComboPlayer) => stats.rejected_combo_player += 1,
            Err(Rejection::Malformed(why)) => {
                stats.rejected_malformed += 1;
                warn!(reason = %why, "Skipping malformed projection");
            }
        }
    }

    stats.accepted = props.len();
    (props, stats)
}

enum Rejection {
    NoPlayer,
    ComboPlayer,
    Malformed(String),
}

fn parse_projection(
    item: &serde_json::Value,
    players: &HashMap<String, String>,
) -> std::result::Result<Proposition, Rejection> {
    let attrs = item
        .get("attributes")
        .ok_or_else(|| Rejection::Malformed("missing attributes".to_string()))?;

    let player_id = item
        .pointer("/relationships/new_player/data/id")
        .and_then(id_string)
        .ok_or(Rejection::NoPlayer)?;
    let player_name = players.get(&player_id).ok_or(Rejection::NoPlayer)?;
    if player_name.contains('+') {
        return Err(Rejection::ComboPlayer);
    }

    let stat = attrs
        .get("stat_type")
        .and_then(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Rejection::Malformed("missing stat_type".to_string()))?;

    let target = attrs
        .get("line_score")
        .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
        .ok_or_else(|| Rejection::Malformed(format!("bad line_score for {player_name}")))?;

    let tier = attrs
        .get("odds_type")
        .and_then(|s| s.as_str())
        .map(Tier::from_feed)
        .unwrap_or(Tier::Standard);

    // Lines carry no side; an explicit one wins, otherwise positive lines read as over.
    let direction = attrs
        .get("direction")
        .and_then(|s| s.as_str())
        .and_then(Direction::parse)
        .unwrap_or(if target > 0.0 { Direction::Over } else { Direction::Under });

    Ok(Proposition {
        player_name: player_name.clone(),
        stat: stat.trim().to_string(),
        target,
        direction,
        tier,
    })
}

fn id_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
