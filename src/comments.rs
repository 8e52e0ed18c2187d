use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::{CommentEvent, CommentEvents};

/// Moderation state of a comment. Only `Approved` comments are visible to
/// readers; every other state takes the comment out of the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Approved,
    Pending,
    Spam,
    Trash,
}

impl CommentStatus {
    pub fn is_visible(&self) -> bool {
        matches!(self, CommentStatus::Approved)
    }

    /// The token clients receive on a Retract so they can word the removal.
    pub fn as_token(&self) -> &'static str {
        match self {
            CommentStatus::Approved => "approved",
            CommentStatus::Pending => "pending",
            CommentStatus::Spam => "spam",
            CommentStatus::Trash => "trash",
        }
    }
}

/// A comment as the lifecycle subsystem stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    /// 0 for top-level comments.
    pub parent_id: i64,
    pub author: String,
    pub body: String,
    pub status: CommentStatus,
}

/// Read access to the comment subsystem. The change log never stores
/// comments itself; it records transitions and asks this boundary for
/// current state.
pub trait CommentSource: Send + Sync {
    /// The comment's current state, or None if it no longer exists.
    fn fetch(&self, comment_id: i64) -> Result<Option<CommentRecord>>;

    /// Whether the content item exists at all.
    fn post_exists(&self, post_id: i64) -> Result<bool>;

    /// Highest comment id currently attached to this post, 0 if none.
    /// Scoped to the post: comments on other posts must not influence this
    /// post's starting cursor.
    fn max_comment_id(&self, post_id: i64) -> Result<i64>;
}

/// In-memory comment store for tests, demos, and embedders without a real
/// comment subsystem. Announces a lifecycle event through its hub on every
/// insert, status change, and delete.
pub struct InMemoryComments {
    inner: Arc<RwLock<CommentsInner>>,
    events: CommentEvents,
}

#[derive(Default)]
struct CommentsInner {
    posts: HashSet<i64>,
    comments: BTreeMap<i64, CommentRecord>,
    next_comment_id: i64,
}

impl InMemoryComments {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hub this store announces lifecycle events on.
    pub fn events(&self) -> &CommentEvents {
        &self.events
    }

    pub fn add_post(&self, post_id: i64) -> Result<()> {
        let mut inner = self.write()?;
        inner.posts.insert(post_id);
        Ok(())
    }

    /// Stores a new comment and announces it. Returns the assigned id.
    pub fn insert(
        &self,
        post_id: i64,
        parent_id: i64,
        author: &str,
        body: &str,
        status: CommentStatus,
    ) -> Result<i64> {
        let event = {
            let mut inner = self.write()?;
            if !inner.posts.contains(&post_id) {
                return Err(Error::UnknownPost(post_id));
            }
            inner.next_comment_id += 1;
            let id = inner.next_comment_id;
            inner.comments.insert(
                id,
                CommentRecord {
                    id,
                    post_id,
                    parent_id,
                    author: author.to_string(),
                    body: body.to_string(),
                    status,
                },
            );
            CommentEvent::with_hints(id, post_id, parent_id)
        };
        self.events.notify(event);
        Ok(event.comment_id)
    }

    /// Changes moderation state and announces the edit.
    pub fn set_status(&self, comment_id: i64, status: CommentStatus) -> Result<()> {
        let event = {
            let mut inner = self.write()?;
            let comment = inner
                .comments
                .get_mut(&comment_id)
                .ok_or_else(|| anyhow::anyhow!("No such comment: {}", comment_id))?;
            comment.status = status;
            CommentEvent::with_hints(comment_id, comment.post_id, comment.parent_id)
        };
        self.events.notify(event);
        Ok(())
    }

    /// Removes the comment entirely and announces the removal. The event
    /// keeps the post and parent hints so the change can still be scoped.
    pub fn delete(&self, comment_id: i64) -> Result<()> {
        let event = {
            let mut inner = self.write()?;
            let comment = inner
                .comments
                .remove(&comment_id)
                .ok_or_else(|| anyhow::anyhow!("No such comment: {}", comment_id))?;
            CommentEvent::with_hints(comment_id, comment.post_id, comment.parent_id)
        };
        self.events.notify(event);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CommentsInner>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?;
        Ok(inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CommentsInner>> {
        let inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        Ok(inner)
    }
}

impl Default for InMemoryComments {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CommentsInner::default())),
            events: CommentEvents::new(),
        }
    }
}

impl Clone for InMemoryComments {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            events: self.events.clone(),
        }
    }
}

impl CommentSource for InMemoryComments {
    fn fetch(&self, comment_id: i64) -> Result<Option<CommentRecord>> {
        let inner = self.read()?;
        Ok(inner.comments.get(&comment_id).cloned())
    }

    fn post_exists(&self, post_id: i64) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.posts.contains(&post_id))
    }

    fn max_comment_id(&self, post_id: i64) -> Result<i64> {
        let inner = self.read()?;
        Ok(inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::time::Duration;

    fn setup() -> Result<InMemoryComments> {
        let comments = InMemoryComments::new();
        comments.add_post(1)?;
        comments.add_post(2)?;
        Ok(comments)
    }

    #[test]
    fn insert_assigns_sequential_ids() -> Result<()> {
        let comments = setup()?;
        let first = comments.insert(1, 0, "ada", "First!", CommentStatus::Approved)?;
        let second = comments.insert(1, 0, "grace", "Hello", CommentStatus::Approved)?;
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        Ok(())
    }

    #[test]
    fn insert_into_unknown_post_fails() -> Result<()> {
        let comments = setup()?;
        let result = comments.insert(99, 0, "ada", "hi", CommentStatus::Approved);
        assert!(matches!(result, Err(Error::UnknownPost(99))));
        Ok(())
    }

    #[test]
    fn max_comment_id_is_scoped_to_post() -> Result<()> {
        let comments = setup()?;
        comments.insert(1, 0, "ada", "on post one", CommentStatus::Approved)?;
        comments.insert(2, 0, "grace", "on post two", CommentStatus::Approved)?;
        comments.insert(2, 0, "grace", "again", CommentStatus::Approved)?;
        assert_eq!(comments.max_comment_id(1)?, 1);
        assert_eq!(comments.max_comment_id(2)?, 3);
        assert_eq!(comments.max_comment_id(7)?, 0);
        Ok(())
    }

    #[test]
    fn lifecycle_changes_fire_events_with_hints() -> Result<()> {
        let comments = setup()?;
        let rx = comments.events().observer();
        let id = comments.insert(1, 6, "ada", "hi", CommentStatus::Pending)?;
        comments.set_status(id, CommentStatus::Approved)?;
        comments.delete(id)?;

        for _ in 0..3 {
            let event = rx.recv_timeout(Duration::from_millis(100))?;
            assert_eq!(event.comment_id, id);
            assert_eq!(event.post_id, Some(1));
            assert_eq!(event.parent_id, Some(6));
        }
        Ok(())
    }

    #[test]
    fn fetch_reflects_status_edits() -> Result<()> {
        let comments = setup()?;
        let id = comments.insert(1, 0, "ada", "hi", CommentStatus::Approved)?;
        comments.set_status(id, CommentStatus::Spam)?;
        let record = comments
            .fetch(id)?
            .ok_or_else(|| anyhow::anyhow!("comment missing"))?;
        assert!(!record.status.is_visible());
        assert_eq!(record.status.as_token(), "spam");
        assert_eq!(comments.fetch(999)?, None);
        Ok(())
    }

    #[test]
    fn delete_removes_the_record() -> Result<()> {
        let comments = setup()?;
        let id = comments.insert(1, 0, "ada", "hi", CommentStatus::Approved)?;
        comments.delete(id)?;
        assert_eq!(comments.fetch(id)?, None);
        assert!(comments.delete(id).is_err());
        Ok(())
    }
}
