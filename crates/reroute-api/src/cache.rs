//! Handler for `POST /cache/reload` — explicit index rebuild.

use axum::{Json, extract::State};
use reroute_core::store::{FailureLog, RedirectStore};
use serde::Serialize;

use crate::AppState;

/// Outcome of a forced rebuild. A failed scan is reported, not raised: the
/// last good index keeps serving either way.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReloadResponse {
  Rebuilt { redirects: usize },
  Failed { error: String },
}

/// `POST /cache/reload`
pub async fn reload<S, F>(State(state): State<AppState<S, F>>) -> Json<ReloadResponse>
where
  S: RedirectStore,
  F: FailureLog,
{
  let index = state.cache.reload().await;

  Json(match state.cache.last_build_error().await {
    Some(error) => ReloadResponse::Failed { error },
    None => ReloadResponse::Rebuilt { redirects: index.len() },
  })
}
