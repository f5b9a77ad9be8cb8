//! Error types for `reroute-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("old URL must not be empty")]
  EmptyOldUrl,

  /// `Suggestion` is a projection materialised from the failure log; it is
  /// never written to the redirect store.
  #[error("suggestion is a derived state and cannot be persisted")]
  SuggestionNotPersistable,

  /// A backing-store failure surfaced through an administrative operation.
  /// Resolution-path store failures never take this route — the engine
  /// records misses best-effort (see [`engine`](crate::engine)).
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box an arbitrary backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
