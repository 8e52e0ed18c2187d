use std::sync::Arc;

use crate::changelog::Changelog;
use crate::clock::Clock;
use crate::comments::CommentSource;
use crate::config::RealtimeConfig;
use crate::error::Result;
use crate::events::CommentEvent;
use crate::render::CommentRenderer;
use crate::types::NewChangeEntry;

/// Retract token recorded when a comment is gone upstream.
pub const DELETED_TOKEN: &str = "deleted";

/// Retract token recorded when the renderer fails on a visible comment.
pub const UNAVAILABLE_TOKEN: &str = "unavailable";

/// Turns one lifecycle event into exactly one change-log entry, then runs
/// the retention sweep. Events are expected one at a time in delivery
/// order; attach the recorder to a CommentEvents hub for that.
#[derive(Clone)]
pub struct ChangeRecorder {
    changelog: Arc<dyn Changelog>,
    comments: Arc<dyn CommentSource>,
    renderer: Arc<dyn CommentRenderer>,
    clock: Arc<dyn Clock>,
    config: RealtimeConfig,
}

impl ChangeRecorder {
    pub fn new(
        changelog: Arc<dyn Changelog>,
        comments: Arc<dyn CommentSource>,
        renderer: Arc<dyn CommentRenderer>,
        clock: Arc<dyn Clock>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            changelog,
            comments,
            renderer,
            clock,
            config,
        }
    }

    /// Records the change for one lifecycle event and returns the new
    /// entry's id. A comment that vanished upstream, or a renderer failure,
    /// still produces a Retract entry: clients must hear about removals.
    pub fn record(&self, event: &CommentEvent) -> Result<i64> {
        let now = self.clock.now_ms();
        let entry = match self.comments.fetch(event.comment_id)? {
            Some(comment) if comment.status.is_visible() => {
                match self.renderer.render(&comment) {
                    Ok(html) => NewChangeEntry::insert(
                        comment.id,
                        comment.parent_id,
                        comment.post_id,
                        html,
                        now,
                    ),
                    Err(err) => {
                        log::warn!(
                            "Renderer failed for comment {}, recording a retract instead: {}",
                            comment.id,
                            err
                        );
                        NewChangeEntry::retract(
                            comment.id,
                            comment.parent_id,
                            comment.post_id,
                            UNAVAILABLE_TOKEN,
                            now,
                        )
                    }
                }
            }
            Some(comment) => NewChangeEntry::retract(
                comment.id,
                comment.parent_id,
                comment.post_id,
                comment.status.as_token(),
                now,
            ),
            None => {
                log::warn!(
                    "Comment {} is gone upstream, recording a retract from event hints",
                    event.comment_id
                );
                NewChangeEntry::retract(
                    event.comment_id,
                    event.parent_id.unwrap_or(0),
                    event.post_id.unwrap_or(0),
                    DELETED_TOKEN,
                    now,
                )
            }
        };
        let id = self.changelog.append(&entry)?;
        log::debug!(
            "RECORD: comment={}, kind={}, entry_id={}",
            entry.comment_id,
            entry.kind.as_str(),
            id
        );
        sweep(self.changelog.as_ref(), &self.config, now)?;
        Ok(id)
    }
}

/// The retention sweep: drops entries older than the configured window,
/// evaluated at `now_ms`. Returns how many were removed.
pub fn sweep(changelog: &dyn Changelog, config: &RealtimeConfig, now_ms: i64) -> Result<usize> {
    changelog.delete_older_than(now_ms - config.retention_window_ms())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;

    use super::*;
    use crate::changelog::InMemoryChangelog;
    use crate::clock::ManualClock;
    use crate::comments::{CommentStatus, InMemoryComments};
    use crate::error::Error;
    use crate::render::ListItemRenderer;
    use crate::types::ChangeKind;

    struct Rig {
        recorder: ChangeRecorder,
        changelog: Arc<InMemoryChangelog>,
        comments: Arc<InMemoryComments>,
        clock: Arc<ManualClock>,
    }

    fn setup() -> Result<Rig> {
        setup_with_renderer(Arc::new(ListItemRenderer))
    }

    fn setup_with_renderer(renderer: Arc<dyn CommentRenderer>) -> Result<Rig> {
        let changelog = Arc::new(InMemoryChangelog::new());
        let comments = Arc::new(InMemoryComments::new());
        comments.add_post(1)?;
        let clock = Arc::new(ManualClock::new());
        let recorder = ChangeRecorder::new(
            changelog.clone(),
            comments.clone(),
            renderer,
            clock.clone(),
            RealtimeConfig::default(),
        );
        Ok(Rig {
            recorder,
            changelog,
            comments,
            clock,
        })
    }

    #[test]
    fn visible_comment_records_an_insert() -> Result<()> {
        let rig = setup()?;
        let id = rig
            .comments
            .insert(1, 0, "ada", "First!", CommentStatus::Approved)?;
        rig.recorder.record(&CommentEvent::new(id))?;

        let entries = rig.changelog.query_by_post(1, -1)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ChangeKind::Insert);
        assert_eq!(entries[0].comment_id, id);
        assert!(entries[0].payload.contains("First!"));
        Ok(())
    }

    #[test]
    fn hidden_comment_records_a_retract_with_its_status() -> Result<()> {
        let rig = setup()?;
        let id = rig
            .comments
            .insert(1, 0, "ada", "hi", CommentStatus::Pending)?;
        rig.recorder.record(&CommentEvent::new(id))?;

        let entries = rig.changelog.query_by_post(1, -1)?;
        assert_eq!(entries[0].kind, ChangeKind::Retract);
        assert_eq!(entries[0].payload, "pending");
        Ok(())
    }

    #[test]
    fn missing_comment_records_a_retract_from_hints() -> Result<()> {
        let rig = setup()?;
        rig.recorder.record(&CommentEvent::with_hints(42, 1, 5))?;

        let entries = rig.changelog.query_by_post(1, -1)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ChangeKind::Retract);
        assert_eq!(entries[0].comment_id, 42);
        assert_eq!(entries[0].parent_id, 5);
        assert_eq!(entries[0].payload, DELETED_TOKEN);
        Ok(())
    }

    #[test]
    fn missing_comment_without_hints_still_records() -> Result<()> {
        let rig = setup()?;
        let id = rig.recorder.record(&CommentEvent::new(42))?;
        assert!(id > 0);
        // no post hint, so the entry lands outside every real post
        assert_eq!(rig.changelog.query_by_post(0, -1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn renderer_failure_records_an_unavailable_retract() -> Result<()> {
        struct FailingRenderer;
        impl CommentRenderer for FailingRenderer {
            fn render(&self, _: &crate::comments::CommentRecord) -> crate::error::Result<String> {
                Err(Error::render_unavailable("template engine offline"))
            }
        }

        let rig = setup_with_renderer(Arc::new(FailingRenderer))?;
        let id = rig
            .comments
            .insert(1, 0, "ada", "hi", CommentStatus::Approved)?;
        rig.recorder.record(&CommentEvent::new(id))?;

        let entries = rig.changelog.query_by_post(1, -1)?;
        assert_eq!(entries[0].kind, ChangeKind::Retract);
        assert_eq!(entries[0].payload, UNAVAILABLE_TOKEN);
        Ok(())
    }

    #[test]
    fn every_record_runs_the_sweep() -> Result<()> {
        let rig = setup()?;
        let first = rig
            .comments
            .insert(1, 0, "ada", "old", CommentStatus::Approved)?;
        rig.recorder.record(&CommentEvent::new(first))?;

        // default retention is 4000ms; the first entry is out of the window
        rig.clock.set(10_000);
        let second = rig
            .comments
            .insert(1, 0, "grace", "new", CommentStatus::Approved)?;
        rig.recorder.record(&CommentEvent::new(second))?;

        let entries = rig.changelog.query_by_post(1, -1)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].comment_id, second);
        Ok(())
    }

    #[test]
    fn sweep_window_boundaries() -> Result<()> {
        let log = InMemoryChangelog::new();
        log.append(&NewChangeEntry::insert(1, 0, 1, "<li></li>", 0))?;
        let config = RealtimeConfig {
            refresh_interval_ms: 2,
            retention_window_override_ms: Some(4),
            ..Default::default()
        };
        assert_eq!(sweep(&log, &config, 3)?, 0);
        assert_eq!(log.query_by_post(1, -1)?.len(), 1);
        assert_eq!(sweep(&log, &config, 5)?, 1);
        assert_eq!(log.query_by_post(1, -1)?.len(), 0);
        Ok(())
    }
}
