use serde::{Deserialize, Serialize};

use crate::config::OrderingMode;

/// What the client should do with a change: render `payload` into the
/// thread, or take the comment it names out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Insert,
    Retract,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "Insert",
            ChangeKind::Retract => "Retract",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Insert" => Some(ChangeKind::Insert),
            "Retract" => Some(ChangeKind::Retract),
            _ => None,
        }
    }
}

/// A change ready to be appended. The store assigns the surrogate id and
/// may clamp `recorded_at` forward to keep the log ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChangeEntry {
    pub comment_id: i64,
    pub parent_id: i64,
    pub post_id: i64,
    pub kind: ChangeKind,
    pub payload: String,
    pub recorded_at: i64,
}

impl NewChangeEntry {
    pub fn insert(
        comment_id: i64,
        parent_id: i64,
        post_id: i64,
        payload: impl Into<String>,
        recorded_at: i64,
    ) -> Self {
        Self {
            comment_id,
            parent_id,
            post_id,
            kind: ChangeKind::Insert,
            payload: payload.into(),
            recorded_at,
        }
    }

    pub fn retract(
        comment_id: i64,
        parent_id: i64,
        post_id: i64,
        status_token: impl Into<String>,
        recorded_at: i64,
    ) -> Self {
        Self {
            comment_id,
            parent_id,
            post_id,
            kind: ChangeKind::Retract,
            payload: status_token.into(),
            recorded_at,
        }
    }
}

/// One immutable row of the change log. `id` orders the log internally and
/// is never part of a client cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: i64,
    pub comment_id: i64,
    pub parent_id: i64,
    pub post_id: i64,
    pub kind: ChangeKind,
    pub payload: String,
    pub recorded_at: i64,
}

/// A client's position in the log: the newest server timestamp it has seen
/// and the highest comment id it has already rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub bookmark: i64,
    pub max_known_comment_id: i64,
}

impl Cursor {
    /// Bookmark anchor that precedes every recorded entry. Polling with it
    /// returns the whole retained window.
    pub const ORIGIN_BOOKMARK: i64 = -1;

    pub fn new(bookmark: i64, max_known_comment_id: i64) -> Self {
        Self {
            bookmark,
            max_known_comment_id,
        }
    }

    pub fn origin() -> Self {
        Self::new(Self::ORIGIN_BOOKMARK, 0)
    }
}

/// One change as delivered to a polling client. Storage details (`id`,
/// `recorded_at`) stay server side; the cursor carries the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollEntry {
    pub kind: ChangeKind,
    pub comment_id: i64,
    pub parent_id: i64,
    pub payload: String,
}

impl From<ChangeEntry> for PollEntry {
    fn from(entry: ChangeEntry) -> Self {
        Self {
            kind: entry.kind,
            comment_id: entry.comment_id,
            parent_id: entry.parent_id,
            payload: entry.payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub entries: Vec<PollEntry>,
    pub cursor: Cursor,
    /// The server's "now" on the same scale as `cursor.bookmark`, so the
    /// client can detect skew against its own clock.
    pub server_time: i64,
}

/// Everything a freshly rendered page needs to start polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBootstrap {
    pub post_id: i64,
    pub cursor: Cursor,
    pub refresh_interval_ms: i64,
    pub ordering: OrderingMode,
    pub server_time: i64,
}
