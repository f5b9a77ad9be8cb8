//! `ResolutionEngine` — the per-request entry point.
//!
//! Given a failed request path, consults the cached [`RedirectIndex`]; on a
//! hit it returns the replacement URL and response kind, on a miss it
//! records the path in the failure log. Resolution itself is infallible:
//! index lookups are read-only, and a failed log write is swallowed (logged
//! at `warn`) rather than failing the surrounding request.

use std::sync::Arc;

use serde::Serialize;

use crate::{
  cache::CacheLifecycle,
  redirect::RedirectKind,
  store::{FailureLog, RedirectStore},
};

/// Outcome of resolving a failed request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Resolution {
  /// A configured redirect matched. The consumer answers with
  /// `kind.status_code()` and, for 301/302, the `target` location.
  Hit { target: String, kind: RedirectKind },
  /// No redirect configured; the 404 stands and has been recorded as a
  /// suggestion candidate.
  Miss,
}

pub struct ResolutionEngine<S, F> {
  cache: Arc<CacheLifecycle<S>>,
  failures: Arc<F>,
}

impl<S: RedirectStore, F: FailureLog> ResolutionEngine<S, F> {
  pub fn new(cache: Arc<CacheLifecycle<S>>, failures: Arc<F>) -> Self {
    Self { cache, failures }
  }

  /// Resolve a failed request path. Hits are side-effect-free and safe to
  /// retry or cache; misses increment the path's failure counter.
  pub async fn resolve(&self, path: &str, referrer: Option<&str>) -> Resolution {
    let index = self.cache.get_index().await;

    if let Some(hit) = index.lookup(path) {
      return Resolution::Hit { target: hit.target, kind: hit.kind };
    }

    if recordable(path) {
      let referrer = referrer.map(str::trim).filter(|r| !r.is_empty());
      if let Err(err) = self.failures.record(path.trim(), referrer).await {
        tracing::warn!(path, error = %err, "failed to record unmatched request");
      }
    }

    Resolution::Miss
  }
}

/// Only rooted, non-empty paths are worth logging as suggestions; anything
/// else still gets a lookup but never pollutes the failure log.
fn recordable(path: &str) -> bool {
  let path = path.trim();
  !path.is_empty() && path.starts_with('/')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recordable_requires_rooted_path() {
    assert!(recordable("/missing"));
    assert!(recordable("  /missing  "));
    assert!(!recordable(""));
    assert!(!recordable("   "));
    assert!(!recordable("missing"));
    assert!(!recordable("http:/missing")); // not rooted either
  }
}
