//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; state and kind enums as their
//! lowercase `strum` discriminants.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use reroute_core::redirect::{Redirect, RedirectKind, RedirectState};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── State / kind ────────────────────────────────────────────────────────────

pub fn encode_state(s: RedirectState) -> &'static str {
  match s {
    RedirectState::Saved => "saved",
    RedirectState::Ignored => "ignored",
    RedirectState::Deleted => "deleted",
    RedirectState::Suggestion => "suggestion",
  }
}

pub fn decode_state(s: &str) -> Result<RedirectState> {
  RedirectState::from_str(s).map_err(|_| Error::Decode(format!("unknown redirect state: {s:?}")))
}

pub fn encode_kind(k: RedirectKind) -> &'static str {
  match k {
    RedirectKind::Permanent => "permanent",
    RedirectKind::Temporary => "temporary",
    RedirectKind::NotFound => "notfound",
    RedirectKind::Gone => "gone",
  }
}

pub fn decode_kind(s: &str) -> Result<RedirectKind> {
  RedirectKind::from_str(s).map_err(|_| Error::Decode(format!("unknown redirect kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `redirects` row.
pub struct RawRedirect {
  pub old_url:              String,
  pub new_url:              String,
  pub state:                String,
  pub kind:                 String,
  pub wildcard_skip_append: bool,
  pub updated_at:           String,
}

impl RawRedirect {
  pub fn into_redirect(self) -> Result<Redirect> {
    Ok(Redirect {
      old_url:              self.old_url,
      new_url:              self.new_url,
      state:                decode_state(&self.state)?,
      kind:                 decode_kind(&self.kind)?,
      wildcard_skip_append: self.wildcard_skip_append,
      updated_at:           Some(decode_dt(&self.updated_at)?),
    })
  }
}
