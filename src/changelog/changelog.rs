use crate::error::Result;
use crate::types::{ChangeEntry, NewChangeEntry};

/// An append-only log of comment state transitions with age-based
/// retention. Implementations must be safe to share across threads:
/// appends and sweeps are serialized per store, reads see a consistent
/// snapshot.
pub trait Changelog: Send + Sync {
    /// Appends one entry, assigns its id, and returns the id. Repeated
    /// comment_ids are expected; the log records history, not current
    /// state.
    fn append(&self, entry: &NewChangeEntry) -> Result<i64>;

    /// Removes every entry recorded before `cutoff_ms`. Returns how many
    /// were removed; repeating the call with no new expirations removes
    /// zero.
    fn delete_older_than(&self, cutoff_ms: i64) -> Result<usize>;

    /// All entries for a post recorded strictly after `min_recorded_at`,
    /// oldest first, append order preserved on timestamp ties.
    fn query_by_post(&self, post_id: i64, min_recorded_at: i64) -> Result<Vec<ChangeEntry>>;
}
