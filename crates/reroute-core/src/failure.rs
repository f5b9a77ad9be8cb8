//! Failure log — the aggregated record of unmatched 404 requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One distinct failing path, with its occurrence counter and the referring
/// URLs observed for it. Created on the first unmatched hit, incremented on
/// repeats, and removed on promotion, ignore, or pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureLogEntry {
  pub path: String,
  pub count: u64,
  pub first_seen: DateTime<Utc>,
  pub last_seen: DateTime<Utc>,
  /// Distinct referrers, in no particular order.
  pub referrers: Vec<String>,
}
