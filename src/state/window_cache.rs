use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::engine::EvaluationWindow;
use crate::error::AppError;
use crate::fetcher::GameLogSource;

/// A built window, or the shared error that prevented it.
pub type WindowLookup = std::result::Result<Arc<EvaluationWindow>, Arc<AppError>>;

// ---------------------------------------------------------------------------
// WindowCache
// ---------------------------------------------------------------------------

/// Per-run memo of player windows, keyed by player name.
///
/// Each key owns a `OnceCell`, so concurrent callers for the same player share
/// a single in-flight fetch: at most one fetch per player for the life of the
/// cache. Failures are memoized too. Entries never expire; drop the cache to
/// end the run.
#[derive(Default)]
pub struct WindowCache {
    entries: DashMap<String, Arc<OnceCell<WindowLookup>>>,
    fetches: AtomicU64,
}

impl WindowCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn get_or_fetch(
        &self,
        source: &dyn GameLogSource,
        player_name: &str,
        window_size: usize,
    ) -> WindowLookup {
        // Clone the cell out so the shard lock is released before awaiting.
        let cell = Arc::clone(&self.entries.entry(player_name.to_string()).or_default());

        if let Some(hit) = cell.get() {
            debug!(player = player_name, "window cache hit");
            return hit.clone();
        }

        cell.get_or_init(|| self.load(source, player_name, window_size))
            .await
            .clone()
    }

    async fn load(
        &self,
        source: &dyn GameLogSource,
        player_name: &str,
        window_size: usize,
    ) -> WindowLookup {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(player = player_name, "window cache miss, fetching");
        match source.fetch_recent_games(player_name, window_size).await {
            Ok(Some(records)) if !records.is_empty() => Ok(Arc::new(EvaluationWindow::select(
                player_name,
                records,
                window_size,
            ))),
            Ok(Some(_)) => Err(Arc::new(AppError::EmptyWindow(player_name.to_string()))),
            Ok(None) => Err(Arc::new(AppError::PlayerNotFound(player_name.to_string()))),
            Err(e) => Err(Arc::new(e)),
        }
    }

    /// Number of fetches issued to the source.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}
