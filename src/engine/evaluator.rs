use crate::config::EvalSettings;
use crate::engine::resolver::ResolvedStat;
use crate::engine::window::EvaluationWindow;
use crate::types::{BetEvaluation, Direction, Proposition};

/// Outcome of one observed game against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Hit,
    Miss,
    Tie,
}

pub fn classify_game(value: f64, target: f64, direction: Direction) -> GameOutcome {
    let hit = match direction {
        Direction::Over => value > target,
        Direction::Under => value < target,
    };
    if hit {
        GameOutcome::Hit
    } else if value == target {
        GameOutcome::Tie
    } else {
        GameOutcome::Miss
    }
}

/// Evaluate `prop` in `direction` over the active games of `window`.
///
/// Pure: the same inputs always give the same evaluation. A window with no
/// active games yields zero counts and a zero hit rate.
pub fn evaluate(
    window: &EvaluationWindow,
    prop: &Proposition,
    stat: &ResolvedStat,
    direction: Direction,
    settings: &EvalSettings,
) -> BetEvaluation {
    let observed: Vec<f64> = window.active_records().map(|r| stat.value_for(r)).collect();

    let (mut hits, mut misses, mut ties) = (0u32, 0u32, 0u32);
    for &value in &observed {
        match classify_game(value, prop.target, direction) {
            GameOutcome::Hit => hits += 1,
            GameOutcome::Miss => misses += 1,
            GameOutcome::Tie => ties += 1,
        }
    }

    let games_active = observed.len() as u32;
    let hit_rate = if games_active > 0 {
        hits as f64 / games_active as f64
    } else {
        0.0
    };

    let median = median(&observed);
    let mean = mean(&observed);
    let rationale = rationale(median, mean, prop.target, direction, settings);

    BetEvaluation {
        player_name: prop.player_name.clone(),
        stat: prop.stat.clone(),
        target: prop.target,
        direction,
        tier: prop.tier,
        hits,
        misses,
        ties,
        games_active,
        games_missed: window.games_missed(),
        window_len: window.len() as u32,
        hit_rate,
        median,
        mode: mode(&observed),
        mean,
        rationale,
    }
}

/// Middle value; mean of the two middle values for an even count; 0 when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent value, ties broken by first appearance. None when empty.
pub fn mode(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(f64, u32)> = Vec::new();
    for &v in values {
        match counts.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, n)) => *n += 1,
            None => counts.push((v, 1)),
        }
    }

    let mut best: Option<(f64, u32)> = None;
    for (v, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((v, n));
        }
    }
    best.map(|(v, _)| v)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Informational lines only; never feeds the classifier.
fn rationale(
    median: f64,
    mean: f64,
    target: f64,
    direction: Direction,
    settings: &EvalSettings,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, value) in [("Median", median), ("Mean", mean)] {
        let line = match direction {
            Direction::Over if value > settings.rationale_over_factor * target => {
                Some(describe_gap(name, value, target, "above"))
            }
            Direction::Under if value < settings.rationale_under_factor * target => {
                Some(describe_gap(name, value, target, "below"))
            }
            _ => None,
        };
        lines.extend(line);
    }
    lines
}

fn describe_gap(name: &str, value: f64, target: f64, side: &str) -> String {
    if target == 0.0 {
        return format!("{name} ({value:.1}) is {side} target ({target})");
    }
    let pct = ((value - target) / target * 100.0).abs();
    format!("{name} ({value:.1}) is {pct:.1}% {side} target ({target})")
}
