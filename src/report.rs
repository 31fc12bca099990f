use tracing::info;

use crate::engine::EvaluationWindow;
use crate::orchestrator::BatchReport;
use crate::types::{BetEvaluation, StatCode, Verbosity};

const RULE_HEAVY: &str = "==================================================";
const RULE_LIGHT: &str = "--------------------------------------------------";

/// Box-score columns of the per-game table, after date, matchup, W/L and minutes.
const TABLE_STATS: &[StatCode] = &[
    StatCode::Pts,
    StatCode::Oreb,
    StatCode::Dreb,
    StatCode::Reb,
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
];

/// Accepts classified evaluations for display. `window` is the player's
/// window when one was built, so detailed output can list each game.
pub trait ReportSink {
    fn report(
        &mut self,
        evaluation: &BetEvaluation,
        verbosity: Verbosity,
        window: Option<&EvaluationWindow>,
    );
}

/// Writes reports through `tracing` at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(
        &mut self,
        evaluation: &BetEvaluation,
        verbosity: Verbosity,
        window: Option<&EvaluationWindow>,
    ) {
        for line in render(evaluation, verbosity, window) {
            info!("{line}");
        }
    }
}

/// `{player} - {stat}: {Direction} {target} | Hit Rate: {rate}%`
pub fn summary_line(e: &BetEvaluation) -> String {
    format!(
        "{} - {}: {} {} | Hit Rate: {:.2}%",
        e.player_name,
        e.stat,
        e.direction.label(),
        e.target,
        e.hit_rate * 100.0
    )
}

pub fn detailed_block(e: &BetEvaluation, window: Option<&EvaluationWindow>) -> Vec<String> {
    let mode = e.mode.map(|m| m.to_string()).unwrap_or_else(|| "n/a".to_string());
    let mut lines = vec![
        RULE_HEAVY.to_string(),
        format!("Detailed Bet Evaluation for {} - {}", e.player_name, e.stat),
        format!(
            "Target: {} {} over last {} games",
            e.direction.label(),
            e.target,
            e.window_len
        ),
        format!("Hit Rate: {:.2}%", e.hit_rate * 100.0),
        format!("Tier: {}", e.tier),
        RULE_LIGHT.to_string(),
        format!("- Hits: {}", e.hits),
        format!("- Misses: {}", e.misses),
        format!("- Ties: {}", e.ties),
        format!("- Games Active: {}", e.games_active),
        format!("- Games Missed: {}", e.games_missed),
        format!("- Mean {}: {:.2}", e.stat, e.mean),
        format!("- Median {}: {}", e.stat, e.median),
        format!("- Mode {}: {}", e.stat, mode),
    ];
    lines.extend(e.rationale.iter().map(|r| format!("- Rationale: {r}")));
    if let Some(window) = window {
        lines.push(RULE_LIGHT.to_string());
        lines.extend(game_table(window));
    }
    lines.push(RULE_HEAVY.to_string());
    lines
}

/// One row per game in the window, newest first. Games the player sat out read DNP.
pub fn game_table(window: &EvaluationWindow) -> Vec<String> {
    let mut header = format!("{:<10} {:<12} {:<2} {:>5}", "GAME_DATE", "MATCHUP", "WL", "MIN");
    for code in TABLE_STATS {
        header.push_str(&format!(" {:>4}", code.code()));
    }

    let mut lines = Vec::with_capacity(window.len() + 2);
    lines.push(format!("Last {} Games for {}:", window.len(), window.player_name()));
    lines.push(header);
    for r in window.records() {
        let mut row = format!(
            "{:<10} {:<12} {:<2} ",
            r.date.to_string(),
            r.matchup.as_deref().unwrap_or("-"),
            r.result.as_deref().unwrap_or("-"),
        );
        if r.participated {
            row.push_str(&format!("{:>5}", cell(r.stat(StatCode::Min))));
            for &code in TABLE_STATS {
                row.push_str(&format!(" {:>4}", cell(r.stat(code))));
            }
        } else {
            row.push_str(&format!("{:>5}", "DNP"));
        }
        lines.push(row);
    }
    lines
}

fn cell(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

pub fn render(
    e: &BetEvaluation,
    verbosity: Verbosity,
    window: Option<&EvaluationWindow>,
) -> Vec<String> {
    match verbosity {
        Verbosity::Summary => vec![summary_line(e)],
        Verbosity::Detailed => detailed_block(e, window),
    }
}

/// Push every evaluation of a batch into `sink`, in report order, with the
/// player's window attached.
pub fn emit(report: &BatchReport, sink: &mut dyn ReportSink) {
    for c in &report.evaluations {
        let window = report.windows.get(&c.evaluation.player_name).map(|w| w.as_ref());
        sink.report(&c.evaluation, c.verbosity, window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassifiedEvaluation, Direction, GameRecord, Tier};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn evaluation() -> BetEvaluation {
        BetEvaluation {
            player_name: "Jalen Brunson".to_string(),
            stat: "Points".to_string(),
            target: 25.5,
            direction: Direction::Over,
            tier: Tier::Demon,
            hits: 8,
            misses: 2,
            ties: 0,
            games_active: 10,
            games_missed: 1,
            window_len: 11,
            hit_rate: 0.8,
            median: 28.0,
            mode: None,
            mean: 27.25,
            rationale: vec!["Median (28.0) is 9.8% above target (25.5)".to_string()],
        }
    }

    fn window() -> EvaluationWindow {
        let mut played = GameRecord::new(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), true)
            .with_stat(StatCode::Min, 36.5)
            .with_stat(StatCode::Pts, 31.0)
            .with_stat(StatCode::Ast, 8.0);
        played.matchup = Some("NYK vs. BOS".to_string());
        played.result = Some("W".to_string());
        let mut sat = GameRecord::new(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(), false);
        sat.matchup = Some("NYK @ MIA".to_string());
        sat.result = Some("L".to_string());
        EvaluationWindow::select("Jalen Brunson", vec![played, sat], 20)
    }

    #[derive(Default)]
    struct VecSink(Vec<(String, Verbosity, bool)>);

    impl ReportSink for VecSink {
        fn report(
            &mut self,
            e: &BetEvaluation,
            verbosity: Verbosity,
            window: Option<&EvaluationWindow>,
        ) {
            self.0.push((e.player_name.clone(), verbosity, window.is_some()));
        }
    }

    #[test]
    fn summary_line_format() {
        assert_eq!(
            summary_line(&evaluation()),
            "Jalen Brunson - Points: Over 25.5 | Hit Rate: 80.00%"
        );
    }

    #[test]
    fn detailed_block_carries_every_field() {
        let block = detailed_block(&evaluation(), None).join("\n");
        assert!(block.contains("Target: Over 25.5 over last 11 games"));
        assert!(block.contains("- Hits: 8"));
        assert!(block.contains("- Misses: 2"));
        assert!(block.contains("- Ties: 0"));
        assert!(block.contains("- Games Active: 10"));
        assert!(block.contains("- Games Missed: 1"));
        assert!(block.contains("- Mean Points: 27.25"));
        assert!(block.contains("- Median Points: 28"));
        assert!(block.contains("- Mode Points: n/a"));
        assert!(block.contains("Tier: demon"));
        assert!(block.contains("- Rationale: Median (28.0)"));
        assert!(!block.contains("GAME_DATE"));
    }

    #[test]
    fn detailed_block_lists_every_window_game() {
        let block = detailed_block(&evaluation(), Some(&window()));
        let start = block
            .iter()
            .position(|l| l == "Last 2 Games for Jalen Brunson:")
            .unwrap();
        let header = &block[start + 1];
        assert!(header.starts_with("GAME_DATE"));
        assert!(header.contains("MATCHUP"));
        assert!(header.contains(" PTS"));
        assert!(header.contains("FG3M"));

        let played = &block[start + 2];
        assert!(played.starts_with("2025-03-04 NYK vs. BOS  W"));
        assert!(played.contains(" 36.5"));
        assert!(played.contains(" 31"));

        let sat = &block[start + 3];
        assert!(sat.starts_with("2025-03-02 NYK @ MIA    L"));
        assert!(sat.ends_with("DNP"));
        assert_eq!(block.last().map(String::as_str), Some(RULE_HEAVY));
    }

    #[test]
    fn render_respects_verbosity() {
        assert_eq!(render(&evaluation(), Verbosity::Summary, Some(&window())).len(), 1);
        assert!(render(&evaluation(), Verbosity::Detailed, None).len() > 10);
    }

    #[test]
    fn emit_forwards_in_order() {
        let mut second = evaluation();
        second.player_name = "Mikal Bridges".to_string();
        let report = BatchReport {
            evaluations: vec![
                ClassifiedEvaluation { evaluation: evaluation(), verbosity: Verbosity::Detailed },
                ClassifiedEvaluation { evaluation: second, verbosity: Verbosity::Summary },
            ],
            windows: [("Jalen Brunson".to_string(), Arc::new(window()))].into_iter().collect(),
            ..BatchReport::default()
        };
        let mut sink = VecSink::default();
        emit(&report, &mut sink);
        assert_eq!(sink.0[0], ("Jalen Brunson".to_string(), Verbosity::Detailed, true));
        assert_eq!(sink.0[1], ("Mikal Bridges".to_string(), Verbosity::Summary, false));
    }
}
