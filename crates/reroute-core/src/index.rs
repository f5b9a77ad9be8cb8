//! The in-memory lookup structure built from `Saved` redirects.
//!
//! An index is immutable once built. [`CacheLifecycle`](crate::cache) owns
//! the current instance and swaps in a fresh one on rebuild; lookups never
//! observe a half-built index.
//!
//! Internally the index is split into an exact-match map and an ordered list
//! of wildcard patterns. Wildcard patterns are parsed once here, at build
//! time, and matched by literal prefix at lookup time.

use std::collections::HashMap;

use crate::redirect::{Redirect, RedirectKind, RedirectState};

/// A trailing `*` on an old URL marks it as a prefix pattern.
pub const WILDCARD_MARKER: char = '*';

// ─── Lookup result ───────────────────────────────────────────────────────────

/// A successful index lookup. Absence of a match is `None`, which is
/// distinct from a match whose kind is [`RedirectKind::NotFound`] or
/// [`RedirectKind::Gone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub target: String,
  pub kind: RedirectKind,
}

// ─── Patterns ────────────────────────────────────────────────────────────────

/// A wildcard rule, parsed at build time so lookups never re-parse.
#[derive(Debug, Clone)]
struct WildcardPattern {
  /// Normalized literal prefix — the old URL with the marker removed. Keeps
  /// its trailing slash, so `/old/*` matches `/old/x` but not `/oldx`.
  prefix: String,
  target: String,
  kind: RedirectKind,
  skip_append: bool,
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// Canonical lookup form of a request path: trimmed, query string stripped,
/// case-folded, trailing slash stripped (except for a bare `/`).
pub fn normalize(path: &str) -> String {
  let path = path.trim();
  let path = match path.split_once('?') {
    Some((before, _)) => before,
    None => path,
  };
  let mut path = path.to_lowercase();
  while path.len() > 1 && path.ends_with('/') {
    path.pop();
  }
  path
}

/// Like [`normalize`], but keeps a trailing slash: wildcard prefixes use the
/// slash as the segment boundary.
fn normalize_prefix(prefix: &str) -> String {
  let prefix = prefix.trim();
  let prefix = match prefix.split_once('?') {
    Some((before, _)) => before,
    None => prefix,
  };
  prefix.to_lowercase()
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Exact-match map plus wildcard patterns ordered longest-prefix-first.
///
/// Build cost is O(n) in the number of redirects; exact lookup is O(1)
/// average and wildcard lookup O(w) in the (expected small) pattern count.
#[derive(Debug, Default)]
pub struct RedirectIndex {
  exact: HashMap<String, Resolved>,
  wildcards: Vec<WildcardPattern>,
}

impl RedirectIndex {
  /// Build an index from a scan of the redirect store.
  ///
  /// Only `Saved` rows participate. A malformed pattern (a marker anywhere
  /// but the end, or a pattern reduced to a bare marker) is logged and
  /// skipped rather than aborting the build. Duplicate normalized old URLs
  /// resolve to the last row seen.
  pub fn build(redirects: impl IntoIterator<Item = Redirect>) -> Self {
    let mut exact = HashMap::new();
    let mut by_prefix: HashMap<String, WildcardPattern> = HashMap::new();

    for redirect in redirects {
      if redirect.state != RedirectState::Saved {
        continue;
      }

      let old_url = redirect.old_url.trim();
      match old_url.strip_suffix(WILDCARD_MARKER) {
        Some(literal) => {
          let prefix = normalize_prefix(literal);
          if prefix.is_empty() {
            tracing::warn!(
              old_url,
              "skipping wildcard redirect with empty literal prefix"
            );
            continue;
          }
          if prefix.contains(WILDCARD_MARKER) {
            tracing::warn!(old_url, "skipping redirect with interior wildcard marker");
            continue;
          }
          by_prefix.insert(prefix.clone(), WildcardPattern {
            prefix,
            target: redirect.new_url.clone(),
            kind: redirect.kind,
            skip_append: redirect.wildcard_skip_append,
          });
        }
        None => {
          if old_url.contains(WILDCARD_MARKER) {
            tracing::warn!(old_url, "skipping redirect with interior wildcard marker");
            continue;
          }
          exact.insert(normalize(old_url), Resolved {
            target: redirect.new_url.clone(),
            kind: redirect.kind,
          });
        }
      }
    }

    let mut wildcards: Vec<WildcardPattern> = by_prefix.into_values().collect();
    // Longest prefix first; equal lengths ordered by prefix for determinism.
    wildcards.sort_by(|a, b| {
      b.prefix
        .len()
        .cmp(&a.prefix.len())
        .then_with(|| a.prefix.cmp(&b.prefix))
    });

    Self { exact, wildcards }
  }

  /// Look `path` up: exact match first, then the first (longest) wildcard
  /// prefix that matches. `None` is a miss.
  pub fn lookup(&self, path: &str) -> Option<Resolved> {
    let path = normalize(path);

    if let Some(hit) = self.exact.get(&path) {
      return Some(hit.clone());
    }

    for pattern in &self.wildcards {
      if let Some(suffix) = path.strip_prefix(pattern.prefix.as_str()) {
        let target = if pattern.skip_append {
          pattern.target.clone()
        } else {
          format!("{}{}", pattern.target, suffix)
        };
        return Some(Resolved { target, kind: pattern.kind });
      }
    }

    None
  }

  /// Number of lookup entries (exact keys plus wildcard patterns).
  pub fn len(&self) -> usize {
    self.exact.len() + self.wildcards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
