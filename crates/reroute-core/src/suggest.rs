//! `SuggestionAggregator` — turns the failure log into ranked redirect
//! suggestions and handles their lifecycle.
//!
//! A suggestion is a projection of one failure-log entry; it never lives in
//! the redirect store. Promotion, ignoring, and marking gone all follow the
//! same shape: persist a redirect row, drop the failure-log entry, and
//! invalidate the cached index.

use std::sync::Arc;

use serde::Serialize;

use crate::{
  cache::CacheLifecycle,
  redirect::{Redirect, RedirectKind},
  store::{FailureLog, RedirectStore},
  Error, Result,
};

// ─── Projections ─────────────────────────────────────────────────────────────

/// One ranked suggestion: a failing path and how often it was hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
  pub path:  String,
  pub count: u64,
}

/// A ranked suggestion listing. `highest`/`lowest` bound the counts in the
/// current result set, for range display in the administrative surface;
/// both are `None` when the set is empty.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionPage {
  pub suggestions: Vec<Suggestion>,
  pub highest:     Option<u64>,
  pub lowest:      Option<u64>,
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

pub struct SuggestionAggregator<S, F> {
  redirects: Arc<S>,
  failures:  Arc<F>,
  cache:     Arc<CacheLifecycle<S>>,
}

impl<S: RedirectStore, F: FailureLog> SuggestionAggregator<S, F> {
  pub fn new(redirects: Arc<S>, failures: Arc<F>, cache: Arc<CacheLifecycle<S>>) -> Self {
    Self { redirects, failures, cache }
  }

  /// The current suggestions, sorted by count descending. Ties break by
  /// path ascending so the ranking is stable across rebuilds. An optional
  /// search word restricts to paths containing it (case-insensitive).
  pub async fn list(&self, search_word: Option<&str>) -> Result<SuggestionPage> {
    let entries = self.failures.list_all().await.map_err(Error::store)?;

    let needle = search_word.map(str::trim).filter(|w| !w.is_empty()).map(str::to_lowercase);

    let mut suggestions: Vec<Suggestion> = entries
      .into_iter()
      .filter(|entry| match &needle {
        Some(word) => entry.path.to_lowercase().contains(word),
        None => true,
      })
      .map(|entry| Suggestion { path: entry.path, count: entry.count })
      .collect();

    suggestions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));

    let highest = suggestions.first().map(|s| s.count);
    let lowest = suggestions.last().map(|s| s.count);

    Ok(SuggestionPage { suggestions, highest, lowest })
  }

  /// The referring URLs recorded for one failing path.
  pub async fn referrers(&self, path: &str) -> Result<Vec<String>> {
    self.failures.referrers(path).await.map_err(Error::store)
  }

  /// Promote a suggestion into a `Saved` redirect: the path resolves to
  /// `new_url` from the next lookup on, and its failure-log entry is gone.
  pub async fn promote(
    &self,
    path: &str,
    new_url: &str,
    kind: RedirectKind,
    skip_append: bool,
  ) -> Result<()> {
    let redirect = Redirect::new(path, new_url, kind, skip_append)?;
    self.persist_and_clear(redirect).await
  }

  /// Suppress a path from future suggestion listings without serving a
  /// redirect for it.
  pub async fn ignore(&self, path: &str) -> Result<()> {
    let redirect = Redirect::ignored(path)?;
    self.persist_and_clear(redirect).await
  }

  /// Mark a path as permanently gone (HTTP 410).
  pub async fn mark_gone(&self, path: &str) -> Result<()> {
    let redirect = Redirect::gone(path)?;
    self.persist_and_clear(redirect).await
  }

  /// Bulk-delete stale suggestions: entries last seen at least `min_days`
  /// ago with at most `max_error_count` hits. Returns how many were
  /// removed.
  pub async fn prune_older_than(&self, min_days: u32, max_error_count: u64) -> Result<u64> {
    self
      .failures
      .delete_all_where(max_error_count, min_days)
      .await
      .map_err(Error::store)
  }

  /// Clear the whole failure log. Returns how many entries were removed.
  pub async fn delete_all(&self) -> Result<u64> {
    self.failures.delete_all().await.map_err(Error::store)
  }

  /// Number of distinct failing paths currently logged.
  pub async fn total_distinct_paths(&self) -> Result<u64> {
    self.failures.total_distinct_paths().await.map_err(Error::store)
  }

  async fn persist_and_clear(&self, redirect: Redirect) -> Result<()> {
    let path = redirect.old_url.clone();
    self.redirects.add_or_update(redirect).await.map_err(Error::store)?;
    self.failures.delete_by_path(&path).await.map_err(Error::store)?;
    self.cache.invalidate().await;
    Ok(())
  }
}
