//! [`SqliteStore`] — the SQLite implementation of [`RedirectStore`] and
//! [`FailureLog`].

use std::path::Path;

use chrono::{Duration, Utc};
use reroute_core::{
  failure::FailureLogEntry,
  redirect::{Redirect, RedirectState},
  store::{FailureLog, RedirectStore},
};

use crate::{
  encode::{decode_dt, encode_dt, encode_kind, encode_state, RawRedirect},
  schema::SCHEMA,
  Error, Result,
};

const REDIRECT_COLUMNS: &str =
  "old_url, new_url, state, kind, wildcard_skip_append, updated_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A reroute store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRedirect> {
    Ok(RawRedirect {
      old_url:              row.get(0)?,
      new_url:              row.get(1)?,
      state:                row.get(2)?,
      kind:                 row.get(3)?,
      wildcard_skip_append: row.get(4)?,
      updated_at:           row.get(5)?,
    })
  }

  /// Write one redirect row inside an already-open connection. `Suggestion`
  /// rows are refused before we get here.
  fn upsert_redirect(
    conn: &rusqlite::Connection,
    redirect: &Redirect,
    updated_at: &str,
  ) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO redirects
         (old_url, new_url, state, kind, wildcard_skip_append, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT(old_url) DO UPDATE SET
         new_url              = excluded.new_url,
         state                = excluded.state,
         kind                 = excluded.kind,
         wildcard_skip_append = excluded.wildcard_skip_append,
         updated_at           = excluded.updated_at",
      rusqlite::params![
        redirect.old_url,
        redirect.new_url,
        encode_state(redirect.state),
        encode_kind(redirect.kind),
        redirect.wildcard_skip_append,
        updated_at,
      ],
    )?;
    Ok(())
  }
}

// ─── RedirectStore impl ──────────────────────────────────────────────────────

impl RedirectStore for SqliteStore {
  type Error = Error;

  async fn list_by_state(&self, state: RedirectState) -> Result<Vec<Redirect>> {
    let state_str = encode_state(state).to_owned();

    let raws: Vec<RawRedirect> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REDIRECT_COLUMNS} FROM redirects WHERE state = ?1 ORDER BY old_url"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![state_str], Self::row_to_raw)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRedirect::into_redirect).collect()
  }

  async fn search(&self, term: &str) -> Result<Vec<Redirect>> {
    let pattern = format!("%{}%", term.trim().to_lowercase());

    let raws: Vec<RawRedirect> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REDIRECT_COLUMNS} FROM redirects
           WHERE state = 'saved'
             AND (lower(old_url) LIKE ?1 OR lower(new_url) LIKE ?1)
           ORDER BY old_url"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], Self::row_to_raw)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRedirect::into_redirect).collect()
  }

  async fn add_or_update(&self, redirect: Redirect) -> Result<()> {
    if redirect.state == RedirectState::Suggestion {
      return Err(Error::Core(reroute_core::Error::SuggestionNotPersistable));
    }

    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        Self::upsert_redirect(conn, &redirect, &at_str)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn add_or_update_many(&self, redirects: Vec<Redirect>) -> Result<()> {
    if redirects.iter().any(|r| r.state == RedirectState::Suggestion) {
      return Err(Error::Core(reroute_core::Error::SuggestionNotPersistable));
    }

    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for redirect in &redirects {
          Self::upsert_redirect(&tx, redirect, &at_str)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_by_old_url(&self, old_url: &str) -> Result<bool> {
    let old_url = old_url.to_owned();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM redirects WHERE old_url = ?1",
          rusqlite::params![old_url],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete_all(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM redirects", [])?))
      .await?;
    Ok(removed as u64)
  }

  async fn delete_all_where(&self, state: RedirectState) -> Result<u64> {
    let state_str = encode_state(state).to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM redirects WHERE state = ?1",
          rusqlite::params![state_str],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }
}

// ─── FailureLog impl ─────────────────────────────────────────────────────────

impl FailureLog for SqliteStore {
  type Error = Error;

  async fn record(&self, path: &str, referrer: Option<&str>) -> Result<()> {
    let path = path.to_owned();
    let referrer = referrer.map(str::to_owned);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO failures (path, count, first_seen, last_seen)
           VALUES (?1, 1, ?2, ?2)
           ON CONFLICT(path) DO UPDATE SET
             count     = count + 1,
             last_seen = excluded.last_seen",
          rusqlite::params![path, at_str],
        )?;

        if let Some(referrer) = referrer {
          conn.execute(
            "INSERT OR IGNORE INTO failure_referrers (path, referrer) VALUES (?1, ?2)",
            rusqlite::params![path, referrer],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_all(&self) -> Result<Vec<FailureLogEntry>> {
    type RawEntry = (String, u64, String, String);

    let (raws, referrers): (Vec<RawEntry>, Vec<(String, String)>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT path, count, first_seen, last_seen FROM failures ORDER BY path",
        )?;
        let raws = stmt
          .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn
          .prepare("SELECT path, referrer FROM failure_referrers ORDER BY path, referrer")?;
        let referrers = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((raws, referrers))
      })
      .await?;

    let mut entries = Vec::with_capacity(raws.len());
    for (path, count, first_seen, last_seen) in raws {
      let referrers = referrers
        .iter()
        .filter(|(p, _)| *p == path)
        .map(|(_, r)| r.clone())
        .collect();
      entries.push(FailureLogEntry {
        path,
        count,
        first_seen: decode_dt(&first_seen)?,
        last_seen: decode_dt(&last_seen)?,
        referrers,
      });
    }
    Ok(entries)
  }

  async fn referrers(&self, path: &str) -> Result<Vec<String>> {
    let path = path.to_owned();
    let referrers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT referrer FROM failure_referrers WHERE path = ?1 ORDER BY referrer",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![path], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(referrers)
  }

  async fn delete_by_path(&self, path: &str) -> Result<bool> {
    let path = path.to_owned();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM failures WHERE path = ?1", rusqlite::params![path])?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete_all(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM failures", [])?))
      .await?;
    Ok(removed as u64)
  }

  async fn delete_all_where(&self, max_count: u64, min_days: u32) -> Result<u64> {
    let cutoff = encode_dt(Utc::now() - Duration::days(i64::from(min_days)));
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM failures WHERE count <= ?1 AND last_seen <= ?2",
          rusqlite::params![max_count, cutoff],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }

  async fn total_distinct_paths(&self) -> Result<u64> {
    let total: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM failures", [], |r| r.get(0))?))
      .await?;
    Ok(total as u64)
  }
}
