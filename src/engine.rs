use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::changelog::{Changelog, InMemoryChangelog, SqliteChangelog};
use crate::clock::{Clock, SystemClock};
use crate::comments::CommentSource;
use crate::config::RealtimeConfig;
use crate::error::Result;
use crate::events::{CommentEvent, CommentEvents};
use crate::poll::PollService;
use crate::recorder::ChangeRecorder;
use crate::render::{CommentRenderer, ListItemRenderer};
use crate::types::{ClientBootstrap, Cursor, PollResponse};

/// One assembled live-comments pipeline: a recorder for the write side and
/// a poll service for the read side, sharing a store, clock, and config.
pub struct LiveComments {
    recorder: ChangeRecorder,
    poll: PollService,
}

impl LiveComments {
    pub fn builder() -> LiveCommentsBuilder {
        LiveCommentsBuilder::default()
    }

    pub fn recorder(&self) -> &ChangeRecorder {
        &self.recorder
    }

    pub fn poll_service(&self) -> &PollService {
        &self.poll
    }

    /// Records one lifecycle event. See ChangeRecorder::record.
    pub fn record(&self, event: &CommentEvent) -> Result<i64> {
        self.recorder.record(event)
    }

    /// Answers one client poll. See PollService::poll.
    pub fn poll(&self, post_id: i64, cursor: Cursor) -> Result<PollResponse> {
        self.poll.poll(post_id, cursor)
    }

    /// Issues a fresh cursor and client settings for a newly rendered page.
    pub fn bootstrap(&self, post_id: i64) -> Result<ClientBootstrap> {
        self.poll.bootstrap(post_id)
    }

    /// Subscribes the recorder to a lifecycle hub. Events are consumed on
    /// one observer thread in delivery order; a failed record is logged and
    /// the thread keeps consuming.
    pub fn attach(&self, events: &CommentEvents) {
        let recorder = self.recorder.clone();
        events.observe(move |event| {
            if let Err(err) = recorder.record(&event) {
                log::warn!(
                    "Failed to record change for comment {}: {}",
                    event.comment_id,
                    err
                );
            }
        });
    }
}

#[derive(Default)]
pub struct LiveCommentsBuilder {
    changelog: Option<Arc<dyn Changelog>>,
    sqlite_path: Option<PathBuf>,
    comments: Option<Arc<dyn CommentSource>>,
    renderer: Option<Arc<dyn CommentRenderer>>,
    clock: Option<Arc<dyn Clock>>,
    config: RealtimeConfig,
}

impl LiveCommentsBuilder {
    /// Keep the change log in memory (the default).
    pub fn in_memory(mut self) -> Self {
        self.changelog = Some(Arc::new(InMemoryChangelog::new()));
        self
    }

    /// Keep the change log in a SQLite database at `path`.
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = Some(path.into());
        self
    }

    /// Use a caller-provided store.
    pub fn changelog(mut self, changelog: Arc<dyn Changelog>) -> Self {
        self.changelog = Some(changelog);
        self
    }

    pub fn comments(mut self, comments: Arc<dyn CommentSource>) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn CommentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: RealtimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the config from a JSON file, writing the defaults there first if
    /// the file does not exist yet.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = RealtimeConfig::load_or_init(path)?;
        Ok(self)
    }

    pub fn build(self) -> Result<LiveComments> {
        self.config.validate()?;
        let comments = self.comments.ok_or_else(|| {
            anyhow::anyhow!("A comment source is required; pass one with .comments()")
        })?;
        let changelog: Arc<dyn Changelog> = if let Some(changelog) = self.changelog {
            changelog
        } else if let Some(path) = self.sqlite_path {
            Arc::new(SqliteChangelog::open(path)?)
        } else {
            Arc::new(InMemoryChangelog::new())
        };
        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(ListItemRenderer));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let recorder = ChangeRecorder::new(
            changelog.clone(),
            comments.clone(),
            renderer,
            clock.clone(),
            self.config.clone(),
        );
        let poll = PollService::new(changelog, comments, clock, self.config);
        Ok(LiveComments { recorder, poll })
    }
}
