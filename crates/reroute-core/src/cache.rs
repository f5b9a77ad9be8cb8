//! `CacheLifecycle` — owns the current [`RedirectIndex`] and its rebuild
//! protocol.
//!
//! The index is the only shared mutable resource in the engine and is read
//! far more often than it is rebuilt. Rebuilds scan the store with no lock
//! held, then publish the finished index under a short write lock, so
//! in-flight readers keep the previous (last good) index until the swap.
//!
//! A failed rebuild never surfaces to resolution callers: the last good
//! index stays installed and the failure message is retained for inspection
//! via [`CacheLifecycle::last_build_error`].

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{index::RedirectIndex, redirect::RedirectState, store::RedirectStore};

struct CacheState {
  /// `None` until the first successful build.
  index: Option<Arc<RedirectIndex>>,
  /// Set by [`CacheLifecycle::invalidate`] and by failed rebuilds; the next
  /// read triggers a rebuild.
  stale: bool,
  /// Bumped by every invalidation. A rebuild captures it before scanning
  /// and only clears `stale` if it is unchanged at publish time, so an
  /// invalidation landing mid-scan is never erased by the stale snapshot.
  generation: u64,
  /// Message from the most recent failed rebuild; cleared on success.
  last_error: Option<String>,
}

/// Process-wide holder of the current redirect index.
///
/// Explicitly constructed and injected rather than accessed as an ambient
/// singleton; starts unbuilt and stale so the first read performs the
/// initial scan.
pub struct CacheLifecycle<S> {
  store: Arc<S>,
  state: RwLock<CacheState>,
}

impl<S: RedirectStore> CacheLifecycle<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      state: RwLock::new(CacheState {
        index:      None,
        stale:      true,
        generation: 0,
        last_error: None,
      }),
    }
  }

  /// The current index, lazily rebuilding if none exists or the cache was
  /// invalidated. On rebuild failure this degrades to the last good index
  /// (or an empty one if nothing was ever built) — never an error.
  pub async fn get_index(&self) -> Arc<RedirectIndex> {
    {
      let state = self.state.read().await;
      if !state.stale {
        if let Some(index) = &state.index {
          return Arc::clone(index);
        }
      }
    }
    // Concurrent stale readers may race here; each produces a complete
    // index and the last published one wins.
    self.rebuild().await
  }

  /// Mark the index stale. Called after every redirect mutation.
  pub async fn invalidate(&self) {
    let mut state = self.state.write().await;
    state.stale = true;
    state.generation += 1;
  }

  /// Force an immediate rebuild regardless of staleness.
  pub async fn reload(&self) -> Arc<RedirectIndex> {
    self.rebuild().await
  }

  /// The failure message from the most recent rebuild attempt, if it
  /// failed. Cleared by the next successful build.
  pub async fn last_build_error(&self) -> Option<String> {
    self.state.read().await.last_error.clone()
  }

  async fn rebuild(&self) -> Arc<RedirectIndex> {
    let generation = self.state.read().await.generation;

    // Scan outside the lock: the old index stays servable during the scan.
    match self.store.list_by_state(RedirectState::Saved).await {
      Ok(rows) => {
        let index = Arc::new(RedirectIndex::build(rows));
        let mut state = self.state.write().await;
        state.index = Some(Arc::clone(&index));
        state.last_error = None;
        // An invalidation that landed during the scan means this snapshot
        // may predate a write; keep `stale` so the next read rebuilds.
        if state.generation == generation {
          state.stale = false;
        }
        index
      }
      Err(err) => {
        tracing::error!(error = %err, "redirect index rebuild failed; serving last good index");
        let mut state = self.state.write().await;
        state.stale = true;
        state.last_error = Some(err.to_string());
        state
          .index
          .as_ref()
          .map(Arc::clone)
          .unwrap_or_else(|| Arc::new(RedirectIndex::default()))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

  use super::*;
  use crate::redirect::{Redirect, RedirectKind};

  /// Parks a scan between its snapshot and its return, so a test can land
  /// writes in that window.
  #[derive(Default)]
  struct ScanGate {
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
  }

  /// In-memory store whose scans can be made to fail on demand, or parked
  /// mid-flight via a [`ScanGate`].
  #[derive(Default)]
  struct StubStore {
    rows: std::sync::Mutex<Vec<Redirect>>,
    fail: AtomicBool,
    scans: AtomicUsize,
    gate: Option<Arc<ScanGate>>,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("store unreachable")]
  struct StubError;

  impl StubStore {
    fn with_rows(rows: Vec<Redirect>) -> Self {
      Self { rows: std::sync::Mutex::new(rows), ..Self::default() }
    }

    fn set_rows(&self, rows: Vec<Redirect>) {
      *self.rows.lock().unwrap() = rows;
    }
  }

  impl RedirectStore for StubStore {
    type Error = StubError;

    async fn list_by_state(&self, _state: RedirectState) -> Result<Vec<Redirect>, StubError> {
      self.scans.fetch_add(1, Ordering::SeqCst);
      if self.fail.load(Ordering::SeqCst) {
        return Err(StubError);
      }
      // Snapshot first: writes landing while the gate holds us are not
      // reflected in this scan's result, like a real store read would be.
      let snapshot = self.rows.lock().unwrap().clone();
      if let Some(gate) = &self.gate {
        gate.entered.notify_one();
        gate.release.notified().await;
      }
      Ok(snapshot)
    }

    async fn search(&self, _term: &str) -> Result<Vec<Redirect>, StubError> {
      unimplemented!("not exercised by cache tests")
    }

    async fn add_or_update(&self, _redirect: Redirect) -> Result<(), StubError> {
      unimplemented!("not exercised by cache tests")
    }

    async fn add_or_update_many(&self, _redirects: Vec<Redirect>) -> Result<(), StubError> {
      unimplemented!("not exercised by cache tests")
    }

    async fn delete_by_old_url(&self, _old_url: &str) -> Result<bool, StubError> {
      unimplemented!("not exercised by cache tests")
    }

    async fn delete_all(&self) -> Result<u64, StubError> {
      unimplemented!("not exercised by cache tests")
    }

    async fn delete_all_where(&self, _state: RedirectState) -> Result<u64, StubError> {
      unimplemented!("not exercised by cache tests")
    }
  }

  fn saved(old_url: &str, new_url: &str) -> Redirect {
    Redirect::new(old_url, new_url, RedirectKind::Permanent, false).unwrap()
  }

  #[tokio::test]
  async fn first_read_builds_lazily() {
    let store = Arc::new(StubStore::with_rows(vec![saved("/old", "/new")]));
    let cache = CacheLifecycle::new(Arc::clone(&store));

    assert_eq!(store.scans.load(Ordering::SeqCst), 0);
    let index = cache.get_index().await;
    assert_eq!(index.lookup("/old").unwrap().target, "/new");
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);

    // Fresh index is served without another scan.
    cache.get_index().await;
    assert_eq!(store.scans.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn invalidate_triggers_rebuild_on_next_read() {
    let store = Arc::new(StubStore::with_rows(vec![saved("/old", "/new")]));
    let cache = CacheLifecycle::new(Arc::clone(&store));

    cache.get_index().await;
    store.set_rows(vec![saved("/old", "/changed")]);

    // Stale data until invalidated.
    assert_eq!(cache.get_index().await.lookup("/old").unwrap().target, "/new");

    cache.invalidate().await;
    assert_eq!(cache.get_index().await.lookup("/old").unwrap().target, "/changed");
  }

  #[tokio::test]
  async fn repeated_invalidate_is_idempotent() {
    let store = Arc::new(StubStore::with_rows(vec![saved("/old", "/new")]));
    let cache = CacheLifecycle::new(Arc::clone(&store));

    let before = cache.get_index().await;
    cache.invalidate().await;
    cache.invalidate().await;
    let after = cache.get_index().await;

    assert_eq!(before.lookup("/old"), after.lookup("/old"));
    assert_eq!(before.len(), after.len());
  }

  #[tokio::test]
  async fn invalidation_during_rebuild_is_not_lost() {
    let gate = Arc::new(ScanGate::default());
    let store = Arc::new(StubStore {
      gate: Some(Arc::clone(&gate)),
      ..StubStore::with_rows(vec![saved("/old", "/new")])
    });
    let cache = Arc::new(CacheLifecycle::new(Arc::clone(&store)));

    // Kick off a rebuild and park it after its store snapshot.
    let reader = tokio::spawn({
      let cache = Arc::clone(&cache);
      async move { cache.get_index().await }
    });
    gate.entered.notified().await;

    // A write plus its invalidation land while the scan is in flight.
    store.set_rows(vec![saved("/old", "/changed")]);
    cache.invalidate().await;

    gate.release.notify_one();
    // The parked rebuild publishes its pre-write snapshot.
    assert_eq!(reader.await.unwrap().lookup("/old").unwrap().target, "/new");

    // The mid-scan invalidation must survive: the next read rebuilds and
    // sees the write.
    gate.release.notify_one();
    assert_eq!(cache.get_index().await.lookup("/old").unwrap().target, "/changed");
    assert_eq!(store.scans.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn failed_rebuild_keeps_last_good_index_and_records_error() {
    let store = Arc::new(StubStore::with_rows(vec![saved("/old", "/new")]));
    let cache = CacheLifecycle::new(Arc::clone(&store));

    cache.get_index().await;
    store.fail.store(true, Ordering::SeqCst);

    let index = cache.reload().await;
    assert_eq!(index.lookup("/old").unwrap().target, "/new");
    assert_eq!(cache.last_build_error().await.as_deref(), Some("store unreachable"));

    // Recovery clears the recorded error.
    store.fail.store(false, Ordering::SeqCst);
    cache.reload().await;
    assert_eq!(cache.last_build_error().await, None);
  }

  #[tokio::test]
  async fn failed_first_build_serves_empty_index() {
    let store = Arc::new(StubStore::default());
    store.fail.store(true, Ordering::SeqCst);
    let cache = CacheLifecycle::new(Arc::clone(&store));

    let index = cache.get_index().await;
    assert!(index.is_empty());
    assert!(cache.last_build_error().await.is_some());
  }
}
