//! Bounded retry for profile reads.
//!
//! Profile rows are created moments after the matching auth identity and
//! may not be visible to the first read. Every flow that needs a row goes
//! through [`resolve_profile`] so the retry policy lives in one place;
//! call sites differ only in their attempt budget.

use std::time::Duration;

use tracing::{debug, warn};

use crate::provider::{ProfileRow, Provider};

/// Read a profile row, retrying on not-yet-visible and on transient
/// provider failures. Returns `None` once the attempt budget is spent;
/// the caller decides what exhaustion means for its flow.
pub(crate) async fn resolve_profile(
    provider: &dyn Provider,
    id: &str,
    attempts: u32,
    backoff: Duration,
) -> Option<ProfileRow> {
    for attempt in 1..=attempts {
        match provider.read_profile(id).await {
            Ok(Some(row)) => {
                debug!(id, attempt, "profile resolved");
                return Some(row);
            }
            Ok(None) => {
                debug!(id, attempt, "profile not visible yet");
            }
            Err(e) => {
                warn!(id, attempt, error = %e, "profile read failed");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(backoff).await;
        }
    }
    warn!(id, attempts, "profile unresolved after retry budget");
    None
}
