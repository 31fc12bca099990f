use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::types::{GameRecord, StatCode};

/// Join token for composite statistics.
pub const COMPOSITE_DELIMITER: char = '+';

/// A statistic label resolved to the base fields it sums.
/// A single-field stat is a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStat {
    fields: Vec<StatCode>,
}

impl ResolvedStat {
    /// Per-game value: sum of the resolved fields, absent fields counting as zero.
    pub fn value_for(&self, record: &GameRecord) -> f64 {
        self.fields.iter().map(|&code| record.stat(code)).sum()
    }
}

/// Provider labels with no `+` in them.
const SINGLE_ALIASES: &[(&str, StatCode)] = &[
    ("points", StatCode::Pts),
    ("pts", StatCode::Pts),
    ("rebounds", StatCode::Reb),
    ("rebs", StatCode::Reb),
    ("offensive rebounds", StatCode::Oreb),
    ("defensive rebounds", StatCode::Dreb),
    ("assists", StatCode::Ast),
    ("asts", StatCode::Ast),
    ("steals", StatCode::Stl),
    ("stls", StatCode::Stl),
    ("blocks", StatCode::Blk),
    ("blocked shots", StatCode::Blk),
    ("blks", StatCode::Blk),
    ("turnovers", StatCode::Tov),
    ("3-pt made", StatCode::Fg3m),
    ("3-point made", StatCode::Fg3m),
    ("3-pt attempted", StatCode::Fg3a),
    ("fg made", StatCode::Fgm),
    ("fg attempted", StatCode::Fga),
    ("free throws made", StatCode::Ftm),
    ("free throws attempted", StatCode::Fta),
    ("personal fouls", StatCode::Pf),
];

/// Maps human-readable statistic labels to base fields.
///
/// Lookup is case-insensitive. Raw provider codes ("PTS", "FG3M") always resolve.
/// Labels containing `+` are split and each token resolved on its own; one unknown
/// token fails the whole label.
#[derive(Debug, Clone)]
pub struct StatResolver {
    aliases: HashMap<String, StatCode>,
}

impl StatResolver {
    pub fn new() -> Self {
        let aliases = SINGLE_ALIASES
            .iter()
            .map(|&(label, code)| (label.to_string(), code))
            .collect();
        Self { aliases }
    }

    pub fn resolve(&self, label: &str) -> Result<ResolvedStat> {
        let fields = label
            .split(COMPOSITE_DELIMITER)
            .map(|token| self.resolve_token(token))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AppError::UnknownStat(label.to_string()))?;
        Ok(ResolvedStat { fields })
    }

    fn resolve_token(&self, token: &str) -> Option<StatCode> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }
        self.aliases
            .get(&key)
            .copied()
            .or_else(|| StatCode::from_code(&key))
    }
}

impl Default for StatResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}
