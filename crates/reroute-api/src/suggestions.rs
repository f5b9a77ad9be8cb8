//! Handlers for `/suggestions` — the ranked view over the failure log.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/suggestions[?search=w]` | Ranked page + distinct-path total |
//! | `POST`   | `/suggestions/promote` | Suggestion → Saved redirect |
//! | `POST`   | `/suggestions/ignore`  | Suggestion → Ignored marker |
//! | `POST`   | `/suggestions/gone`    | Suggestion → Deleted (410) marker |
//! | `POST`   | `/suggestions/prune`   | Bulk-delete by age and count |
//! | `DELETE` | `/suggestions` | Clear the failure log |
//! | `GET`    | `/suggestions/referrers?path=p` | Referring URLs for one path |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use reroute_core::{
  redirect::RedirectKind,
  store::{FailureLog, RedirectStore},
  suggest::SuggestionPage,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
  #[serde(flatten)]
  pub page: SuggestionPage,
  pub total_distinct_paths: u64,
}

/// `GET /suggestions[?search=w]`
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  let page = state.aggregator.list(params.search.as_deref()).await?;
  let total_distinct_paths = state.aggregator.total_distinct_paths().await?;
  Ok(Json(ListResponse { page, total_distinct_paths }))
}

// ─── Lifecycle actions ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PromoteBody {
  pub path:    String,
  pub new_url: String,
  /// Defaults to a permanent (301) redirect.
  #[serde(default = "default_kind")]
  pub kind:    RedirectKind,
  #[serde(default)]
  pub wildcard_skip_append: bool,
}

fn default_kind() -> RedirectKind { RedirectKind::Permanent }

/// `POST /suggestions/promote` — body: [`PromoteBody`].
pub async fn promote<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<PromoteBody>,
) -> Result<StatusCode, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  state
    .aggregator
    .promote(&body.path, &body.new_url, body.kind, body.wildcard_skip_append)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PathBody {
  pub path: String,
}

/// `POST /suggestions/ignore` — body: `{"path":"/p"}`.
pub async fn ignore<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<PathBody>,
) -> Result<StatusCode, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  state.aggregator.ignore(&body.path).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /suggestions/gone` — body: `{"path":"/p"}`.
pub async fn gone<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<PathBody>,
) -> Result<StatusCode, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  state.aggregator.mark_gone(&body.path).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Pruning ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PruneBody {
  pub min_days:        u32,
  pub max_error_count: u64,
}

/// `POST /suggestions/prune` — body: [`PruneBody`]; returns `{"removed":n}`.
pub async fn prune<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<PruneBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  let removed = state
    .aggregator
    .prune_older_than(body.min_days, body.max_error_count)
    .await?;
  Ok(Json(json!({ "removed": removed })))
}

/// `DELETE /suggestions` — returns `{"removed":n}`.
pub async fn delete_all<S, F>(
  State(state): State<AppState<S, F>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  let removed = state.aggregator.delete_all().await?;
  Ok(Json(json!({ "removed": removed })))
}

// ─── Referrers ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReferrersParams {
  pub path: String,
}

/// `GET /suggestions/referrers?path=p`
pub async fn referrers<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<ReferrersParams>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: RedirectStore,
  F: FailureLog,
{
  let referrers = state.aggregator.referrers(&params.path).await?;
  Ok(Json(referrers))
}
