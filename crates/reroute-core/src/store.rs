//! The `RedirectStore` and `FailureLog` trait contracts.
//!
//! Implemented by storage backends (e.g. `reroute-store-sqlite`). The engine
//! and the API layer depend on these abstractions, not on any concrete
//! backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use crate::{
  failure::FailureLogEntry,
  redirect::{Redirect, RedirectState},
};

// ─── RedirectStore ───────────────────────────────────────────────────────────

/// The durable table of configured redirects, keyed by old URL.
///
/// Writes are individually atomic; `add_or_update` overwrites an existing
/// row for the same old URL (last write wins). Backends must refuse to
/// persist [`RedirectState::Suggestion`].
pub trait RedirectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All redirects in the given state.
  fn list_by_state(
    &self,
    state: RedirectState,
  ) -> impl Future<Output = Result<Vec<Redirect>, Self::Error>> + Send + '_;

  /// Saved redirects whose old or new URL contains `term`
  /// (case-insensitive).
  fn search<'a>(
    &'a self,
    term: &'a str,
  ) -> impl Future<Output = Result<Vec<Redirect>, Self::Error>> + Send + 'a;

  /// Insert or overwrite the row keyed by `redirect.old_url`.
  fn add_or_update(
    &self,
    redirect: Redirect,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Bulk variant of [`add_or_update`](Self::add_or_update); applied as a
  /// single transaction where the backend supports one.
  fn add_or_update_many(
    &self,
    redirects: Vec<Redirect>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove the row keyed by `old_url`. Returns whether a row existed.
  fn delete_by_old_url<'a>(
    &'a self,
    old_url: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove every redirect. Returns the number of rows removed.
  fn delete_all(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove every redirect in `state`. Returns the number of rows removed.
  fn delete_all_where(
    &self,
    state: RedirectState,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── FailureLog ──────────────────────────────────────────────────────────────

/// The durable multiset of unmatched request paths.
pub trait FailureLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Record one unmatched hit on `path`: create the entry with count 1, or
  /// increment an existing one. The referrer, if given, joins the entry's
  /// referrer set.
  fn record<'a>(
    &'a self,
    path: &'a str,
    referrer: Option<&'a str>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every entry, referrers included. Ordering is backend-defined; callers
  /// that need ranking sort for themselves.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<FailureLogEntry>, Self::Error>> + Send + '_;

  /// The distinct referrers observed for `path`.
  fn referrers<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Remove the entry for `path` (promotion/ignore cleanup). Returns
  /// whether an entry existed.
  fn delete_by_path<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove every entry. Returns the number of entries removed.
  fn delete_all(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove entries last seen at least `min_days` ago whose count is at
  /// most `max_count`. Returns the number of entries removed.
  fn delete_all_where(
    &self,
    max_count: u64,
    min_days: u32,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Number of distinct failing paths currently logged.
  fn total_distinct_paths(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
