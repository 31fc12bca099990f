use crate::types::GameRecord;

/// The most recent N games for one player, newest first, as supplied by the source.
/// Built once per player per run and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationWindow {
    player_name: String,
    records: Vec<GameRecord>,
    games_missed: u32,
}

impl EvaluationWindow {
    /// Take the first `size` records. The source's ordering is trusted as-is.
    pub fn select(player_name: &str, mut records: Vec<GameRecord>, size: usize) -> Self {
        records.truncate(size);
        let games_missed = records.iter().filter(|r| !r.is_active()).count() as u32;
        Self {
            player_name: player_name.to_string(),
            records,
            games_missed,
        }
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    /// Records the player appeared in with non-zero minutes.
    pub fn active_records(&self) -> impl Iterator<Item = &GameRecord> {
        self.records.iter().filter(|r| r.is_active())
    }

    pub fn games_missed(&self) -> u32 {
        self.games_missed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
