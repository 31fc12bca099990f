use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::EvalSettings;
use crate::engine::classifier::{classify, directions_for};
use crate::engine::evaluator::evaluate;
use crate::engine::{EvaluationWindow, ResolvedStat, StatResolver};
use crate::fetcher::GameLogSource;
use crate::state::WindowCache;
use crate::types::{ClassifiedEvaluation, Proposition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownStat,
    /// Player not found, or no games in their log.
    PlayerUnavailable(String),
    /// The game log source failed (transport or payload).
    FetchFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownStat => write!(f, "statistic not recognized"),
            SkipReason::PlayerUnavailable(why) => write!(f, "{why}"),
            SkipReason::FetchFailed(why) => write!(f, "game log fetch failed: {why}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedProp {
    pub player_name: String,
    pub stat: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Grouped by player; within a player, input order (and over before under).
    pub evaluations: Vec<ClassifiedEvaluation>,
    pub skipped: Vec<SkippedProp>,
    pub players_evaluated: usize,
    pub players_skipped: usize,
    pub fetches: u64,
    /// Window each evaluated player was scored over, for per-game reporting.
    pub windows: HashMap<String, Arc<EvaluationWindow>>,
}

#[derive(Default)]
struct PlayerOutcome {
    evaluations: Vec<ClassifiedEvaluation>,
    skipped: Vec<SkippedProp>,
    window: Option<Arc<EvaluationWindow>>,
}

/// Drives resolution, window lookup, evaluation and classification across a batch.
///
/// Each `run` owns a fresh `WindowCache`, so every player is fetched at most
/// once per run and nothing carries over between runs.
pub struct BatchOrchestrator {
    source: Arc<dyn GameLogSource>,
    resolver: StatResolver,
    settings: EvalSettings,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(source: Arc<dyn GameLogSource>, resolver: StatResolver, settings: EvalSettings) -> Self {
        Self { source, resolver, settings, concurrency: 1 }
    }

    /// Players fetched in parallel. Order across players is then unspecified.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, props: &[Proposition]) -> BatchReport {
        let cache = WindowCache::new();
        let groups = group_by_player(props);
        info!(
            propositions = props.len(),
            players = groups.len(),
            "Batch run starting"
        );

        let outcomes: Vec<PlayerOutcome> = stream::iter(groups)
            .map(|(player, player_props)| self.process_player(&cache, player, player_props))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport { fetches: cache.fetch_count(), ..BatchReport::default() };
        for outcome in outcomes {
            match outcome.window {
                Some(window) => {
                    report.players_evaluated += 1;
                    report.windows.insert(window.player_name().to_string(), window);
                }
                None => report.players_skipped += 1,
            }
            report.evaluations.extend(outcome.evaluations);
            report.skipped.extend(outcome.skipped);
        }

        info!(
            evaluations = report.evaluations.len(),
            skipped = report.skipped.len(),
            players_evaluated = report.players_evaluated,
            players_skipped = report.players_skipped,
            fetches = report.fetches,
            "Batch run complete"
        );
        report
    }

    async fn process_player(
        &self,
        cache: &WindowCache,
        player: String,
        props: Vec<&Proposition>,
    ) -> PlayerOutcome {
        let mut outcome = PlayerOutcome::default();

        // Resolve first so a player with nothing evaluable costs no fetch.
        let mut resolved: Vec<(&Proposition, ResolvedStat)> = Vec::with_capacity(props.len());
        for prop in props {
            match self.resolver.resolve(&prop.stat) {
                Ok(stat) => resolved.push((prop, stat)),
                Err(e) => {
                    warn!(player = %player, stat = %prop.stat, reason = %e, "Skipping proposition");
                    outcome.skipped.push(SkippedProp {
                        player_name: player.clone(),
                        stat: prop.stat.clone(),
                        reason: SkipReason::UnknownStat,
                    });
                }
            }
        }
        if resolved.is_empty() {
            return outcome;
        }

        let window = match cache
            .get_or_fetch(self.source.as_ref(), &player, self.settings.window_size)
            .await
        {
            Ok(w) => w,
            Err(err) => {
                warn!(
                    player = %player,
                    props = resolved.len(),
                    reason = %err,
                    "Skipping all propositions for player"
                );
                let reason = if err.is_lookup() {
                    SkipReason::PlayerUnavailable(err.to_string())
                } else {
                    SkipReason::FetchFailed(err.to_string())
                };
                outcome.skipped.extend(resolved.into_iter().map(|(prop, _)| SkippedProp {
                    player_name: player.clone(),
                    stat: prop.stat.clone(),
                    reason: reason.clone(),
                }));
                return outcome;
            }
        };

        for (prop, stat) in resolved {
            for direction in directions_for(prop, &self.settings) {
                let evaluation = evaluate(&window, prop, &stat, direction, &self.settings);
                let verbosity = classify(
                    evaluation.hit_rate,
                    evaluation.tier,
                    &self.settings.thresholds,
                    self.settings.force_detailed,
                );
                outcome.evaluations.push(ClassifiedEvaluation { evaluation, verbosity });
            }
        }
        outcome.window = Some(window);
        outcome
    }
}

/// Group by player name, players in first-appearance order, props in input order.
pub fn group_by_player(props: &[Proposition]) -> Vec<(String, Vec<&Proposition>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Proposition>)> = Vec::new();
    for prop in props {
        let slot = *index.entry(prop.player_name.as_str()).or_insert_with(|| {
            groups.push((prop.player_name.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(prop);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::types::{Direction, GameRecord, StatCode, Tier, Verbosity};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory source: player → per-game (participated, PTS, AST).
    struct MemorySource {
        games: HashMap<String, Vec<(bool, f64, f64)>>,
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl MemorySource {
        fn new(entries: &[(&str, Vec<(bool, f64, f64)>)]) -> Arc<Self> {
            Arc::new(Self {
                games: entries.iter().map(|(n, g)| (n.to_string(), g.clone())).collect(),
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GameLogSource for MemorySource {
        async fn fetch_recent_games(&self, player: &str, max: usize) -> Result<Option<Vec<GameRecord>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(player.to_string());
            if player == "Flaky" {
                return Err(AppError::Upstream("timeout".to_string()));
            }
            let Some(games) = self.games.get(player) else {
                return Ok(None);
            };
            Ok(Some(
                games
                    .iter()
                    .take(max)
                    .enumerate()
                    .map(|(i, &(played, pts, ast))| {
                        GameRecord::new(NaiveDate::from_ymd_opt(2025, 2, 28 - i as u32).unwrap(), played)
                            .with_stat(StatCode::Pts, pts)
                            .with_stat(StatCode::Ast, ast)
                    })
                    .collect(),
            ))
        }
    }

    fn prop(player: &str, stat: &str, target: f64, direction: Direction, tier: Tier) -> Proposition {
        Proposition {
            player_name: player.to_string(),
            stat: stat.to_string(),
            target,
            direction,
            tier,
        }
    }

    fn played(points: &[f64]) -> Vec<(bool, f64, f64)> {
        points.iter().map(|&p| (true, p, 0.0)).collect()
    }

    fn orchestrator(source: Arc<MemorySource>) -> BatchOrchestrator {
        BatchOrchestrator::new(source, StatResolver::new(), EvalSettings::default())
    }

    #[tokio::test]
    async fn one_fetch_per_player_across_props() {
        let source = MemorySource::new(&[("Alpha", played(&[10.0, 12.0, 8.0, 15.0, 9.0]))]);
        let props = vec![
            prop("Alpha", "Points", 10.0, Direction::Over, Tier::Demon),
            prop("Alpha", "Assists", 1.5, Direction::Under, Tier::Goblin),
            prop("Alpha", "Pts+Asts", 9.5, Direction::Over, Tier::Demon),
        ];
        let report = orchestrator(Arc::clone(&source)).run(&props).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.fetches, 1);
        assert_eq!(report.evaluations.len(), 3);
        assert_eq!(report.players_evaluated, 1);

        let stats: Vec<&str> = report.evaluations.iter().map(|c| c.evaluation.stat.as_str()).collect();
        assert_eq!(stats, vec!["Points", "Assists", "Pts+Asts"]);
    }

    #[tokio::test]
    async fn scenario_window_values_over_and_under() {
        let source = MemorySource::new(&[("Alpha", played(&[10.0, 12.0, 8.0, 15.0, 9.0]))]);
        let props = vec![prop("Alpha", "Points", 10.0, Direction::Over, Tier::Standard)];
        let report = orchestrator(source).run(&props).await;

        assert_eq!(report.evaluations.len(), 2);
        let over = &report.evaluations[0].evaluation;
        let under = &report.evaluations[1].evaluation;
        assert_eq!(over.direction, Direction::Over);
        assert_eq!((over.hits, over.misses, over.ties), (2, 2, 1));
        assert_eq!(over.hit_rate, 0.4);
        assert_eq!(under.direction, Direction::Under);
        assert_eq!((under.hits, under.misses, under.ties), (2, 2, 1));
        assert_eq!(under.hit_rate, 0.4);
        assert!(report.evaluations.iter().all(|c| c.verbosity == Verbosity::Summary));
    }

    #[tokio::test]
    async fn unknown_stat_skips_only_that_prop() {
        let source = MemorySource::new(&[("Alpha", played(&[30.0, 31.0, 32.0]))]);
        let props = vec![
            prop("Alpha", "Fantasy Score", 40.0, Direction::Over, Tier::Demon),
            prop("Alpha", "Points", 20.0, Direction::Over, Tier::Demon),
        ];
        let report = orchestrator(source).run(&props).await;
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].stat, "Fantasy Score");
        assert_eq!(report.skipped[0].reason, SkipReason::UnknownStat);
        assert_eq!(report.evaluations.len(), 1);
        assert_eq!(report.evaluations[0].evaluation.hit_rate, 1.0);
        assert_eq!(report.evaluations[0].verbosity, Verbosity::Detailed);
    }

    #[tokio::test]
    async fn unavailable_player_skips_all_their_props_and_batch_continues() {
        let source = MemorySource::new(&[("Alpha", played(&[30.0])), ("Empty", Vec::new())]);
        let props = vec![
            prop("Ghost", "Points", 10.0, Direction::Over, Tier::Demon),
            prop("Ghost", "Assists", 2.0, Direction::Over, Tier::Demon),
            prop("Flaky", "Points", 10.0, Direction::Over, Tier::Demon),
            prop("Empty", "Points", 10.0, Direction::Over, Tier::Demon),
            prop("Alpha", "Points", 10.0, Direction::Over, Tier::Demon),
        ];
        let report = orchestrator(source).run(&props).await;
        assert_eq!(report.skipped.len(), 4);
        let unavailable: Vec<&str> = report
            .skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::PlayerUnavailable(_)))
            .map(|s| s.player_name.as_str())
            .collect();
        assert_eq!(unavailable, vec!["Ghost", "Ghost", "Empty"]);
        assert!(matches!(report.skipped[2].reason, SkipReason::FetchFailed(ref m) if m.contains("timeout")));
        assert_eq!(report.players_skipped, 3);
        assert_eq!(report.players_evaluated, 1);
        assert_eq!(report.evaluations.len(), 1);
        assert_eq!(report.evaluations[0].evaluation.player_name, "Alpha");
        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.windows["Alpha"].len(), 1);
    }

    #[tokio::test]
    async fn player_with_only_unknown_stats_is_never_fetched() {
        let source = MemorySource::new(&[("Alpha", played(&[30.0]))]);
        let props = vec![prop("Alpha", "Dunks", 1.0, Direction::Over, Tier::Demon)];
        let report = orchestrator(Arc::clone(&source)).run(&props).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn missed_games_flow_through() {
        let games = vec![
            (false, 0.0, 0.0),
            (true, 20.0, 5.0),
            (false, 0.0, 0.0),
            (true, 18.0, 7.0),
            (false, 0.0, 0.0),
        ];
        let source = MemorySource::new(&[("Alpha", games)]);
        let props = vec![prop("Alpha", "PTS+AST", 24.0, Direction::Over, Tier::Goblin)];
        let report = orchestrator(source).run(&props).await;
        let e = &report.evaluations[0].evaluation;
        assert_eq!(e.games_missed, 3);
        assert_eq!(e.games_active, 2);
        assert_eq!(e.window_len, 5);
        assert_eq!((e.mode, e.median, e.mean), (Some(25.0), 25.0, 25.0));
        assert_eq!(report.evaluations[0].verbosity, Verbosity::Detailed);
    }

    #[tokio::test]
    async fn window_size_bounds_every_evaluation() {
        let source = MemorySource::new(&[("Alpha", played(&[1.0; 30]))]);
        let props = vec![prop("Alpha", "Points", 0.5, Direction::Over, Tier::Demon)];
        let report = orchestrator(Arc::clone(&source)).run(&props).await;
        let e = &report.evaluations[0].evaluation;
        assert_eq!(e.window_len, 20);
        assert_eq!(e.games_active, 20);
    }

    #[tokio::test]
    async fn concurrent_players_each_fetched_once() {
        let source = MemorySource::new(&[
            ("Alpha", played(&[10.0])),
            ("Beta", played(&[11.0])),
            ("Gamma", played(&[12.0])),
        ]);
        let props: Vec<Proposition> = ["Alpha", "Beta", "Gamma", "Alpha", "Beta", "Gamma"]
            .iter()
            .map(|p| prop(p, "Points", 5.0, Direction::Over, Tier::Goblin))
            .collect();
        let report = orchestrator(Arc::clone(&source)).with_concurrency(3).run(&props).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.evaluations.len(), 6);
        let mut requested = source.requested.lock().unwrap().clone();
        requested.sort();
        assert_eq!(requested, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn force_detailed_overrides_thresholds() {
        let source = MemorySource::new(&[("Alpha", played(&[1.0, 1.0]))]);
        let settings = EvalSettings { force_detailed: true, ..EvalSettings::default() };
        let orch = BatchOrchestrator::new(source, StatResolver::new(), settings);
        let props = vec![prop("Alpha", "Points", 10.0, Direction::Over, Tier::Goblin)];
        let report = orch.run(&props).await;
        assert_eq!(report.evaluations[0].evaluation.hit_rate, 0.0);
        assert_eq!(report.evaluations[0].verbosity, Verbosity::Detailed);
    }

    #[test]
    fn grouping_preserves_first_appearance_and_input_order() {
        let props = vec![
            prop("B", "Points", 1.0, Direction::Over, Tier::Demon),
            prop("A", "Points", 2.0, Direction::Over, Tier::Demon),
            prop("B", "Assists", 3.0, Direction::Over, Tier::Demon),
        ];
        let groups = group_by_player(&props);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "B");
        assert_eq!(groups[0].1[0].target, 1.0);
        assert_eq!(groups[0].1[1].target, 3.0);
        assert_eq!(groups[1].0, "A");
    }
}
