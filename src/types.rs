use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Base statistics
// ---------------------------------------------------------------------------

/// Base box-score columns reported per game by the stats provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatCode {
    Pts,
    Reb,
    Oreb,
    Dreb,
    Ast,
    Stl,
    Blk,
    Tov,
    Fgm,
    Fga,
    Fg3m,
    Fg3a,
    Ftm,
    Fta,
    Pf,
    Min,
}

impl StatCode {
    pub const ALL: [StatCode; 16] = [
        StatCode::Pts,
        StatCode::Reb,
        StatCode::Oreb,
        StatCode::Dreb,
        StatCode::Ast,
        StatCode::Stl,
        StatCode::Blk,
        StatCode::Tov,
        StatCode::Fgm,
        StatCode::Fga,
        StatCode::Fg3m,
        StatCode::Fg3a,
        StatCode::Ftm,
        StatCode::Fta,
        StatCode::Pf,
        StatCode::Min,
    ];

    /// Column header used by the provider.
    pub fn code(&self) -> &'static str {
        match self {
            StatCode::Pts => "PTS",
            StatCode::Reb => "REB",
            StatCode::Oreb => "OREB",
            StatCode::Dreb => "DREB",
            StatCode::Ast => "AST",
            StatCode::Stl => "STL",
            StatCode::Blk => "BLK",
            StatCode::Tov => "TOV",
            StatCode::Fgm => "FGM",
            StatCode::Fga => "FGA",
            StatCode::Fg3m => "FG3M",
            StatCode::Fg3a => "FG3A",
            StatCode::Ftm => "FTM",
            StatCode::Fta => "FTA",
            StatCode::Pf => "PF",
            StatCode::Min => "MIN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl std::fmt::Display for StatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// GameRecord
// ---------------------------------------------------------------------------

/// One game outcome for a player. Produced by the game log source, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    /// e.g. "NYK vs. BOS" or "NYK @ MIA"
    #[serde(default)]
    pub matchup: Option<String>,
    /// "W" or "L" for the player's team.
    #[serde(default)]
    pub result: Option<String>,
    pub participated: bool,
    pub stats: BTreeMap<StatCode, f64>,
}

impl GameRecord {
    pub fn new(date: NaiveDate, participated: bool) -> Self {
        Self {
            date,
            matchup: None,
            result: None,
            participated,
            stats: BTreeMap::new(),
        }
    }

    /// Absent fields read as zero.
    pub fn stat(&self, code: StatCode) -> f64 {
        self.stats.get(&code).copied().unwrap_or(0.0)
    }

    /// A zero-minute appearance counts the same as a DNP.
    pub fn is_active(&self) -> bool {
        if !self.participated {
            return false;
        }
        match self.stats.get(&StatCode::Min) {
            Some(&minutes) => minutes > 0.0,
            None => true,
        }
    }
}

#[cfg(test)]
impl GameRecord {
    pub fn with_stat(mut self, code: StatCode, value: f64) -> Self {
        self.stats.insert(code, value);
        self
    }
}

// ---------------------------------------------------------------------------
// Direction / Tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "over" | "more" => Some(Direction::Over),
            "under" | "less" => Some(Direction::Under),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Over => "Over",
            Direction::Under => "Under",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

/// Payout tier of a proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Demon,
    Goblin,
}

impl Tier {
    /// Unknown tier names fall back to standard.
    pub fn from_feed(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "demon" => Tier::Demon,
            "goblin" => Tier::Goblin,
            _ => Tier::Standard,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Tier::Standard),
            "demon" => Some(Tier::Demon),
            "goblin" => Some(Tier::Goblin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Standard => "standard",
            Tier::Demon => "demon",
            Tier::Goblin => "goblin",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Proposition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    pub player_name: String,
    /// Human-readable label, possibly composite ("Pts+Rebs+Asts").
    pub stat: String,
    pub target: f64,
    pub direction: Direction,
    pub tier: Tier,
}

// ---------------------------------------------------------------------------
// BetEvaluation
// ---------------------------------------------------------------------------

/// Result of evaluating one (player, stat, target, direction) over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetEvaluation {
    pub player_name: String,
    pub stat: String,
    pub target: f64,
    pub direction: Direction,
    pub tier: Tier,
    pub hits: u32,
    pub misses: u32,
    pub ties: u32,
    pub games_active: u32,
    pub games_missed: u32,
    /// Number of records in the window the evaluation ran over.
    pub window_len: u32,
    pub hit_rate: f64,
    pub median: f64,
    /// None when no games were observed.
    pub mode: Option<f64>,
    pub mean: f64,
    pub rationale: Vec<String>,
}

/// Output verbosity decided by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Summary,
    Detailed,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verbosity::Summary => write!(f, "summary"),
            Verbosity::Detailed => write!(f, "detailed"),
        }
    }
}

/// An evaluation paired with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvaluation {
    pub evaluation: BetEvaluation,
    pub verbosity: Verbosity,
}
