use std::sync::Arc;

use crate::changelog::Changelog;
use crate::clock::Clock;
use crate::comments::CommentSource;
use crate::config::RealtimeConfig;
use crate::error::{Error, Result};
use crate::types::{ChangeEntry, ClientBootstrap, Cursor, PollEntry, PollResponse};

fn validate_cursor(cursor: &Cursor) -> Result<()> {
    if cursor.bookmark < Cursor::ORIGIN_BOOKMARK {
        return Err(Error::InvalidCursor(format!(
            "bookmark {} is before the origin anchor {}",
            cursor.bookmark,
            Cursor::ORIGIN_BOOKMARK
        )));
    }
    if cursor.max_known_comment_id < 0 {
        return Err(Error::InvalidCursor(format!(
            "max_known_comment_id {} is negative",
            cursor.max_known_comment_id
        )));
    }
    Ok(())
}

/// An entry is news to a client if it was recorded after the bookmark, or
/// if it concerns a comment id the client has never rendered. The second
/// clause covers a comment created in the same instant the page was built,
/// whose entry shares the bookmark timestamp.
fn is_news(cursor: &Cursor, entry: &ChangeEntry) -> bool {
    entry.recorded_at > cursor.bookmark || entry.comment_id > cursor.max_known_comment_id
}

/// Filters the retained window down to the client's delta and advances the
/// cursor. Every matching entry is returned in log order, repeats for the
/// same comment included; the client applies them in sequence. Both cursor
/// fields only move forward.
pub(crate) fn resolve_delta(
    entries: Vec<ChangeEntry>,
    cursor: Cursor,
) -> (Vec<ChangeEntry>, Cursor) {
    let delta: Vec<ChangeEntry> = entries.into_iter().filter(|e| is_news(&cursor, e)).collect();
    let mut next = cursor;
    for entry in &delta {
        next.bookmark = next.bookmark.max(entry.recorded_at);
        next.max_known_comment_id = next.max_known_comment_id.max(entry.comment_id);
    }
    (delta, next)
}

/// The boundary clients poll. Validates the request, reads the retained
/// window for the post, and returns the delta with an advanced cursor.
pub struct PollService {
    changelog: Arc<dyn Changelog>,
    comments: Arc<dyn CommentSource>,
    clock: Arc<dyn Clock>,
    config: RealtimeConfig,
}

impl PollService {
    pub fn new(
        changelog: Arc<dyn Changelog>,
        comments: Arc<dyn CommentSource>,
        clock: Arc<dyn Clock>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            changelog,
            comments,
            clock,
            config,
        }
    }

    pub fn poll(&self, post_id: i64, cursor: Cursor) -> Result<PollResponse> {
        validate_cursor(&cursor)?;
        if !self.comments.post_exists(post_id)? {
            return Err(Error::UnknownPost(post_id));
        }
        let retained = self
            .changelog
            .query_by_post(post_id, Cursor::ORIGIN_BOOKMARK)?;
        let (delta, next) = resolve_delta(retained, cursor);
        log::debug!(
            "POLL: post={}, delta={}, bookmark {} -> {}",
            post_id,
            delta.len(),
            cursor.bookmark,
            next.bookmark
        );
        Ok(PollResponse {
            entries: delta.into_iter().map(PollEntry::from).collect(),
            cursor: next,
            server_time: self.clock.now_ms(),
        })
    }

    /// Starting state for a page that just rendered the thread server
    /// side: a cursor anchored at "now" and at the highest comment id on
    /// this post, plus the client-facing settings.
    pub fn bootstrap(&self, post_id: i64) -> Result<ClientBootstrap> {
        if !self.comments.post_exists(post_id)? {
            return Err(Error::UnknownPost(post_id));
        }
        let now = self.clock.now_ms();
        let cursor = Cursor::new(now, self.comments.max_comment_id(post_id)?);
        log::debug!(
            "BOOTSTRAP: post={}, bookmark={}, max_known_comment_id={}",
            post_id,
            cursor.bookmark,
            cursor.max_known_comment_id
        );
        Ok(ClientBootstrap {
            post_id,
            cursor,
            refresh_interval_ms: self.config.refresh_interval_ms,
            ordering: self.config.ordering,
            server_time: now,
        })
    }
}
