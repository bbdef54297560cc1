//! Debounced product search.
//!
//! Each browser session has a generation counter. A query bumps it, waits
//! the debounce interval and is dropped if another query arrived meanwhile.
//! The backend response is only applied if the generation is still current
//! once it returns, so a slow response can never overwrite a newer result.
//! Empty queries answer immediately and supersede anything in flight.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

/// How long an idle session's counter is kept.
const GENERATION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Result of a debounced search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    /// The query was current when its response arrived.
    Results(T),
    /// The query was blank.
    Empty,
    /// A newer query replaced this one; nothing should be applied.
    Superseded,
}

/// Per-session debounce and sequence guard for search requests.
#[derive(Clone)]
pub struct SearchCoordinator {
    debounce: Duration,
    generations: Cache<String, Arc<AtomicU64>>,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        let generations = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(GENERATION_IDLE)
            .build();
        Self {
            debounce,
            generations,
        }
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Run `fetch` for `query` on behalf of the session `key`, unless a
    /// newer query from the same session supersedes it.
    ///
    /// # Errors
    ///
    /// Returns the error of `fetch` if the query was still current when it
    /// failed.
    pub async fn search<T, E, F, Fut>(
        &self,
        key: &str,
        query: &str,
        fetch: F,
    ) -> Result<SearchOutcome<T>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let counter = self
            .generations
            .get_with(key.to_owned(), async { Arc::new(AtomicU64::new(0)) })
            .await;
        let generation = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let is_current = || counter.load(Ordering::SeqCst) == generation;

        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Empty);
        }

        tokio::time::sleep(self.debounce).await;
        if !is_current() {
            debug!(generation, "Search superseded during debounce");
            return Ok(SearchOutcome::Superseded);
        }

        let result = fetch(query.to_owned()).await;
        if !is_current() {
            debug!(generation, "Discarding stale search response");
            return Ok(SearchOutcome::Superseded);
        }

        result.map(SearchOutcome::Results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn coordinator() -> SearchCoordinator {
        SearchCoordinator::new(Duration::from_millis(30))
    }

    async fn echo(query: String) -> Result<String, Infallible> {
        Ok(query)
    }

    #[tokio::test]
    async fn test_single_query_returns_results() {
        let outcome = coordinator().search("s1", " écran ", echo).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Results("écran".to_string()));
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let outcome = coordinator().search("s1", "   ", echo).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_keystrokes_within_debounce_collapse() {
        let search = coordinator();
        let (first, second) = tokio::join!(search.search("s1", "écr", echo), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            search.search("s1", "écran", echo).await
        });
        assert_eq!(first.unwrap(), SearchOutcome::Superseded);
        assert_eq!(second.unwrap(), SearchOutcome::Results("écran".to_string()));
    }

    #[tokio::test]
    async fn test_slow_response_does_not_overwrite_cleared_box() {
        let search = coordinator();
        let slow = |query: String| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, Infallible>(query)
        };
        let (stale, cleared) = tokio::join!(search.search("s1", "onduleur", slow), async {
            // Past the debounce, while the first request is in flight.
            tokio::time::sleep(Duration::from_millis(60)).await;
            search.search("s1", "", echo).await
        });
        assert_eq!(stale.unwrap(), SearchOutcome::Superseded);
        assert_eq!(cleared.unwrap(), SearchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let search = coordinator();
        let (a, b) = tokio::join!(
            search.search("s1", "câble", echo),
            search.search("s2", "switch", echo)
        );
        assert_eq!(a.unwrap(), SearchOutcome::Results("câble".to_string()));
        assert_eq!(b.unwrap(), SearchOutcome::Results("switch".to_string()));
    }
}
