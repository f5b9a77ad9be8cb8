//! Redirect — a stored mapping from an old URL to a new URL.
//!
//! A redirect row is keyed by its (trimmed) old URL. The `Suggestion` state
//! exists only as a projection materialised from the failure log; store
//! backends refuse to persist it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{Error, Result};

// ─── States and kinds ────────────────────────────────────────────────────────

/// Lifecycle state of a redirect row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RedirectState {
  /// An active mapping, served to users via the index.
  Saved,
  /// A known 404, explicitly suppressed from suggestions. Not served.
  Ignored,
  /// An explicit "no longer exists" marker (HTTP 410). Not served as a
  /// redirect.
  Deleted,
  /// Derived from the failure log on demand; never stored.
  Suggestion,
}

/// The HTTP response semantics a served redirect carries.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RedirectKind {
  Permanent,
  Temporary,
  NotFound,
  Gone,
}

impl RedirectKind {
  /// The status code the consumer should answer with.
  pub fn status_code(self) -> u16 {
    match self {
      Self::Permanent => 301,
      Self::Temporary => 302,
      Self::NotFound => 404,
      Self::Gone => 410,
    }
  }
}

// ─── Redirect ────────────────────────────────────────────────────────────────

/// A configured URL-to-URL mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirect {
  /// Trimmed old URL; unique key among persisted states.
  pub old_url: String,
  /// Replacement URL. Empty is valid for `Ignored`/`Deleted` rows.
  pub new_url: String,
  pub state: RedirectState,
  pub kind: RedirectKind,
  /// When `old_url` ends in the wildcard marker, `true` means the target is
  /// used verbatim instead of appending the unmatched path suffix.
  pub wildcard_skip_append: bool,
  /// Assigned by the store on write; `None` until persisted.
  pub updated_at: Option<DateTime<Utc>>,
}

impl Redirect {
  /// A `Saved` redirect. Trims both URLs; rejects an empty `old_url`.
  pub fn new(
    old_url: &str,
    new_url: &str,
    kind: RedirectKind,
    wildcard_skip_append: bool,
  ) -> Result<Self> {
    Self::with_state(old_url, new_url, RedirectState::Saved, kind, wildcard_skip_append)
  }

  /// An `Ignored` marker: suppresses the path from suggestions.
  pub fn ignored(old_url: &str) -> Result<Self> {
    Self::with_state(old_url, "", RedirectState::Ignored, RedirectKind::NotFound, false)
  }

  /// A `Deleted` marker: the path is permanently gone (HTTP 410).
  pub fn gone(old_url: &str) -> Result<Self> {
    Self::with_state(old_url, "", RedirectState::Deleted, RedirectKind::Gone, false)
  }

  fn with_state(
    old_url: &str,
    new_url: &str,
    state: RedirectState,
    kind: RedirectKind,
    wildcard_skip_append: bool,
  ) -> Result<Self> {
    let old_url = old_url.trim();
    if old_url.is_empty() {
      return Err(Error::EmptyOldUrl);
    }
    Ok(Self {
      old_url: old_url.to_owned(),
      new_url: new_url.trim().to_owned(),
      state,
      kind,
      wildcard_skip_append,
      updated_at: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_trims_both_urls() {
    let r = Redirect::new("  /old ", " /new  ", RedirectKind::Permanent, false).unwrap();
    assert_eq!(r.old_url, "/old");
    assert_eq!(r.new_url, "/new");
    assert_eq!(r.state, RedirectState::Saved);
  }

  #[test]
  fn empty_old_url_is_rejected() {
    assert!(matches!(
      Redirect::new("   ", "/new", RedirectKind::Permanent, false),
      Err(Error::EmptyOldUrl)
    ));
    assert!(matches!(Redirect::ignored(""), Err(Error::EmptyOldUrl)));
  }

  #[test]
  fn markers_carry_empty_targets() {
    let ignored = Redirect::ignored("/gone-away").unwrap();
    assert_eq!(ignored.state, RedirectState::Ignored);
    assert_eq!(ignored.new_url, "");

    let gone = Redirect::gone("/gone-away").unwrap();
    assert_eq!(gone.state, RedirectState::Deleted);
    assert_eq!(gone.kind, RedirectKind::Gone);
  }

  #[test]
  fn status_codes() {
    assert_eq!(RedirectKind::Permanent.status_code(), 301);
    assert_eq!(RedirectKind::Temporary.status_code(), 302);
    assert_eq!(RedirectKind::NotFound.status_code(), 404);
    assert_eq!(RedirectKind::Gone.status_code(), 410);
  }
}
