//! JSON REST API for reroute.
//!
//! Exposes an axum [`Router`] backed by any [`RedirectStore`] +
//! [`FailureLog`] pair. This is the boundary the (external) administrative
//! UI and the 404-intercepting edge component talk to: it serves redirect
//! *decisions* as JSON, never content, and never performs the redirect
//! itself. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", reroute_api::router(state))
//! ```

pub mod cache;
pub mod error;
pub mod redirects;
pub mod resolve;
pub mod suggestions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use reroute_core::{
  cache::CacheLifecycle,
  engine::ResolutionEngine,
  store::{FailureLog, RedirectStore},
  suggest::SuggestionAggregator,
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers: the engine pieces,
/// all wired to one store pair and one cache.
pub struct AppState<S, F> {
  pub redirects:  Arc<S>,
  pub cache:      Arc<CacheLifecycle<S>>,
  pub engine:     Arc<ResolutionEngine<S, F>>,
  pub aggregator: Arc<SuggestionAggregator<S, F>>,
}

impl<S: RedirectStore, F: FailureLog> AppState<S, F> {
  /// Wire up the full engine around a redirect store and failure log.
  pub fn new(redirects: Arc<S>, failures: Arc<F>) -> Self {
    let cache = Arc::new(CacheLifecycle::new(Arc::clone(&redirects)));
    let engine =
      Arc::new(ResolutionEngine::new(Arc::clone(&cache), Arc::clone(&failures)));
    let aggregator = Arc::new(SuggestionAggregator::new(
      Arc::clone(&redirects),
      failures,
      Arc::clone(&cache),
    ));
    Self { redirects, cache, engine, aggregator }
  }
}

// Manual impl: `#[derive(Clone)]` would demand `S: Clone, F: Clone`, which
// the `Arc` fields don't need.
impl<S, F> Clone for AppState<S, F> {
  fn clone(&self) -> Self {
    Self {
      redirects:  Arc::clone(&self.redirects),
      cache:      Arc::clone(&self.cache),
      engine:     Arc::clone(&self.engine),
      aggregator: Arc::clone(&self.aggregator),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S, F>(state: AppState<S, F>) -> Router<()>
where
  S: RedirectStore + 'static,
  F: FailureLog + 'static,
{
  Router::new()
    // Resolution (the per-404 entry point)
    .route("/resolve", post(resolve::handler::<S, F>))
    // Redirect table
    .route(
      "/redirects",
      get(redirects::list::<S, F>)
        .put(redirects::save::<S, F>)
        .delete(redirects::delete::<S, F>),
    )
    // Suggestions
    .route(
      "/suggestions",
      get(suggestions::list::<S, F>).delete(suggestions::delete_all::<S, F>),
    )
    .route("/suggestions/promote", post(suggestions::promote::<S, F>))
    .route("/suggestions/ignore", post(suggestions::ignore::<S, F>))
    .route("/suggestions/gone", post(suggestions::gone::<S, F>))
    .route("/suggestions/prune", post(suggestions::prune::<S, F>))
    .route("/suggestions/referrers", get(suggestions::referrers::<S, F>))
    // Cache lifecycle
    .route("/cache/reload", post(cache::reload::<S, F>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use reroute_core::{
    redirect::{Redirect, RedirectKind},
    store::RedirectStore as _,
  };
  use reroute_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore, SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    AppState::new(Arc::clone(&store), store)
  }

  async fn send(
    state: &AppState<SqliteStore, SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header("content-type", "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let response = router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  // ── Resolution ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn resolve_round_trip() {
    let state = make_state().await;

    let (status, _) = send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/old", "new_url": "/new", "kind": "permanent" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) =
      send(&state, "POST", "/resolve", Some(json!({ "path": "/old" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({ "outcome": "hit", "target": "/new", "kind": "permanent", "status": 301 })
    );

    // A miss is still HTTP 200.
    let (status, body) =
      send(&state, "POST", "/resolve", Some(json!({ "path": "/nope" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "outcome": "miss" }));
  }

  // ── Redirect table ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn save_list_and_delete_redirects() {
    let state = make_state().await;

    send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/a", "new_url": "/b", "kind": "temporary" })),
    )
    .await;

    let (status, body) = send(&state, "GET", "/redirects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["old_url"], "/a");
    assert_eq!(body[0]["kind"], "temporary");

    let (status, _) = send(&state, "DELETE", "/redirects?old_url=/a", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&state, "DELETE", "/redirects?old_url=/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn failed_delete_does_not_invalidate_cache() {
    let state = make_state().await;

    send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/old", "new_url": "/new", "kind": "permanent" })),
    )
    .await;
    let (_, body) = send(&state, "POST", "/resolve", Some(json!({ "path": "/old" }))).await;
    assert_eq!(body["outcome"], "hit");

    let (status, _) = send(&state, "DELETE", "/redirects?old_url=/absent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A write behind the API's back is only visible after an invalidation;
    // the failed delete above must not have been one.
    state
      .redirects
      .add_or_update(Redirect::new("/side", "/door", RedirectKind::Permanent, false).unwrap())
      .await
      .unwrap();
    let (_, body) = send(&state, "POST", "/resolve", Some(json!({ "path": "/side" }))).await;
    assert_eq!(body["outcome"], "miss");

    // A real deletion invalidates; the rebuild picks the write up.
    let (status, _) = send(&state, "DELETE", "/redirects?old_url=/old", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&state, "POST", "/resolve", Some(json!({ "path": "/side" }))).await;
    assert_eq!(body["outcome"], "hit");
  }

  #[tokio::test]
  async fn bulk_delete_by_state_and_all() {
    let state = make_state().await;

    send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/a", "new_url": "/b", "kind": "permanent" })),
    )
    .await;
    send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/noise", "state": "ignored", "kind": "notfound" })),
    )
    .await;

    let (status, body) = send(&state, "DELETE", "/redirects?state=ignored", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "removed": 1 }));
    let (_, body) = send(&state, "GET", "/redirects?state=ignored", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = send(&state, "DELETE", "/redirects", None).await;
    assert_eq!(body, json!({ "removed": 1 }));
    let (_, body) = send(&state, "GET", "/redirects", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&state, "DELETE", "/redirects?state=suggestion", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
      send(&state, "DELETE", "/redirects?old_url=/a&state=ignored", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn suggestion_state_cannot_be_saved() {
    let state = make_state().await;

    let (status, _) = send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/x", "state": "suggestion", "kind": "permanent" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn search_filters_saved_redirects() {
    let state = make_state().await;

    for (old, new) in [("/blog/a", "/articles/a"), ("/shop", "/store")] {
      send(
        &state,
        "PUT",
        "/redirects",
        Some(json!({ "old_url": old, "new_url": new, "kind": "permanent" })),
      )
      .await;
    }

    let (_, body) = send(&state, "GET", "/redirects?search=blog", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["old_url"], "/blog/a");
  }

  // ── Suggestions ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn misses_surface_as_ranked_suggestions() {
    let state = make_state().await;

    for _ in 0..3 {
      send(
        &state,
        "POST",
        "/resolve",
        Some(json!({ "path": "/missing", "referrer": "http://r.example/" })),
      )
      .await;
    }
    send(&state, "POST", "/resolve", Some(json!({ "path": "/rare" }))).await;

    let (status, body) = send(&state, "GET", "/suggestions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"][0], json!({ "path": "/missing", "count": 3 }));
    assert_eq!(body["highest"], 3);
    assert_eq!(body["lowest"], 1);
    assert_eq!(body["total_distinct_paths"], 2);

    let (_, referrers) =
      send(&state, "GET", "/suggestions/referrers?path=/missing", None).await;
    assert_eq!(referrers, json!(["http://r.example/"]));
  }

  #[tokio::test]
  async fn promote_then_resolve_hits() {
    let state = make_state().await;

    send(&state, "POST", "/resolve", Some(json!({ "path": "/missing" }))).await;

    let (status, _) = send(
      &state,
      "POST",
      "/suggestions/promote",
      Some(json!({ "path": "/missing", "new_url": "/found" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) =
      send(&state, "POST", "/resolve", Some(json!({ "path": "/missing" }))).await;
    assert_eq!(body["outcome"], "hit");
    assert_eq!(body["target"], "/found");

    let (_, body) = send(&state, "GET", "/suggestions", None).await;
    assert!(body["suggestions"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn prune_and_delete_all_report_removed_counts() {
    let state = make_state().await;

    send(&state, "POST", "/resolve", Some(json!({ "path": "/missing" }))).await;

    // Nothing is 30 days old yet.
    let (_, body) = send(
      &state,
      "POST",
      "/suggestions/prune",
      Some(json!({ "min_days": 30, "max_error_count": 5 })),
    )
    .await;
    assert_eq!(body["removed"], 0);

    let (_, body) = send(&state, "DELETE", "/suggestions", None).await;
    assert_eq!(body["removed"], 1);
  }

  // ── Cache ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn reload_reports_index_size() {
    let state = make_state().await;

    send(
      &state,
      "PUT",
      "/redirects",
      Some(json!({ "old_url": "/old", "new_url": "/new", "kind": "permanent" })),
    )
    .await;

    let (status, body) = send(&state, "POST", "/cache/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "redirects": 1 }));
  }
}
