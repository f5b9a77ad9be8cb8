//! Handler for `POST /resolve` — the per-404 entry point.
//!
//! The edge component that intercepts failed requests posts the path (and
//! the referrer, when one was sent) here and acts on the decision: redirect
//! for 301/302, answer 404/410 directly otherwise. A miss is a normal
//! outcome and still an HTTP 200.

use axum::{Json, extract::State};
use reroute_core::{
  engine::Resolution,
  redirect::RedirectKind,
  store::{FailureLog, RedirectStore},
};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub path:     String,
  pub referrer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ResolveResponse {
  Hit {
    target: String,
    kind:   RedirectKind,
    /// Convenience projection of `kind.status_code()`.
    status: u16,
  },
  Miss,
}

/// `POST /resolve` — body: `{"path":"/old","referrer":"http://..."}`.
///
/// Infallible by design: the engine swallows failure-log write errors, so
/// this handler has no error path.
pub async fn handler<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<ResolveBody>,
) -> Json<ResolveResponse>
where
  S: RedirectStore,
  F: FailureLog,
{
  let resolution = state.engine.resolve(&body.path, body.referrer.as_deref()).await;

  Json(match resolution {
    Resolution::Hit { target, kind } => {
      ResolveResponse::Hit { target, kind, status: kind.status_code() }
    }
    Resolution::Miss => ResolveResponse::Miss,
  })
}
