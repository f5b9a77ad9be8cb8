//! Handlers for `/redirects` — the configured redirect table.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/redirects` | Saved rows; `?search=w` filters, `?state=ignored\|deleted` lists those states |
//! | `PUT`    | `/redirects` | Add-or-update (last write wins), then invalidate |
//! | `DELETE` | `/redirects?old_url=u` | Remove one row |
//! | `DELETE` | `/redirects[?state=s]` | Remove every row (in `state`, if given) |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use reroute_core::{
  redirect::{Redirect, RedirectKind, RedirectState},
  store::{FailureLog, RedirectStore},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── List / search ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub state:  Option<RedirectState>,
}

/// `GET /redirects[?search=w][&state=s]`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Redirect>>, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  if params.state == Some(RedirectState::Suggestion) {
    return Err(ApiError::BadRequest(
      "suggestions are served from /suggestions".into(),
    ));
  }

  let rows = match params.search {
    // Search is an admin view over Saved rows only.
    Some(term) => state
      .redirects
      .search(&term)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?,
    None => state
      .redirects
      .list_by_state(params.state.unwrap_or(RedirectState::Saved))
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?,
  };
  Ok(Json(rows))
}

// ─── Save ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SaveBody {
  pub old_url: String,
  #[serde(default)]
  pub new_url: String,
  #[serde(default = "default_state")]
  pub state:   RedirectState,
  pub kind:    RedirectKind,
  #[serde(default)]
  pub wildcard_skip_append: bool,
}

fn default_state() -> RedirectState { RedirectState::Saved }

/// `PUT /redirects` — body: [`SaveBody`]. Upserts and invalidates.
pub async fn save<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<SaveBody>,
) -> Result<StatusCode, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  if body.state == RedirectState::Suggestion {
    return Err(ApiError::BadRequest(
      "the suggestion state is derived and cannot be saved".into(),
    ));
  }

  let mut redirect =
    Redirect::new(&body.old_url, &body.new_url, body.kind, body.wildcard_skip_append)?;
  redirect.state = body.state;

  state
    .redirects
    .add_or_update(redirect)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  state.cache.invalidate().await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  pub old_url: Option<String>,
  pub state:   Option<RedirectState>,
}

/// `DELETE /redirects?old_url=u` — remove one row, 404 if absent.
/// `DELETE /redirects[?state=s]` — bulk: every row, or every row in `s`;
/// returns `{"removed":n}`.
///
/// The cache is only invalidated when a row actually went away.
pub async fn delete<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  if params.old_url.is_some() && params.state.is_some() {
    return Err(ApiError::BadRequest(
      "old_url and state are mutually exclusive".into(),
    ));
  }
  if params.state == Some(RedirectState::Suggestion) {
    return Err(ApiError::BadRequest(
      "suggestions are cleared via DELETE /suggestions".into(),
    ));
  }

  if let Some(old_url) = params.old_url {
    let removed = state
      .redirects
      .delete_by_old_url(&old_url)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    if !removed {
      return Err(ApiError::NotFound(format!("no redirect for {old_url}")));
    }
    state.cache.invalidate().await;
    return Ok(StatusCode::NO_CONTENT.into_response());
  }

  let removed = match params.state {
    Some(s) => state.redirects.delete_all_where(s).await,
    None => state.redirects.delete_all().await,
  }
  .map_err(|e| ApiError::Store(Box::new(e)))?;

  if removed > 0 {
    state.cache.invalidate().await;
  }
  Ok(Json(serde_json::json!({ "removed": removed })).into_response())
}
