use std::sync::{Arc, RwLock};

use crate::changelog::Changelog;
use crate::error::Result;
use crate::types::{ChangeEntry, NewChangeEntry};

/// Changelog backend held entirely in memory. Useful for tests and for
/// embedders that can afford to lose the retained window on restart;
/// clients recover by requesting a fresh bootstrap cursor.
pub struct InMemoryChangelog {
    inner: Arc<RwLock<ChangelogInner>>,
}

#[derive(Default)]
struct ChangelogInner {
    entries: Vec<ChangeEntry>,
    next_id: i64,
}

impl InMemoryChangelog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryChangelog {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ChangelogInner::default())),
        }
    }
}

impl Clone for InMemoryChangelog {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Changelog for InMemoryChangelog {
    fn append(&self, entry: &NewChangeEntry) -> Result<i64> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        inner.next_id += 1;
        let id = inner.next_id;
        // recorded_at never moves backwards relative to what is already
        // logged, even if the wall clock does
        let floor = inner
            .entries
            .last()
            .map(|e| e.recorded_at)
            .unwrap_or(entry.recorded_at);
        let recorded_at = entry.recorded_at.max(floor);
        inner.entries.push(ChangeEntry {
            id,
            comment_id: entry.comment_id,
            parent_id: entry.parent_id,
            post_id: entry.post_id,
            kind: entry.kind,
            payload: entry.payload.clone(),
            recorded_at,
        });
        log::debug!(
            "CHANGELOG APPEND: id={}, post={}, comment={}, kind={}",
            id,
            entry.post_id,
            entry.comment_id,
            entry.kind.as_str()
        );
        Ok(id)
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.recorded_at >= cutoff_ms);
        let removed = before - inner.entries.len();
        log::debug!("CHANGELOG SWEEP: cutoff={}, removed={}", cutoff_ms, removed);
        Ok(removed)
    }

    fn query_by_post(&self, post_id: i64, min_recorded_at: i64) -> Result<Vec<ChangeEntry>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?;
        // entries is already ordered by (recorded_at, id): appends clamp
        // the timestamp and push in id order
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.post_id == post_id && e.recorded_at > min_recorded_at)
            .cloned()
            .collect())
    }
}
