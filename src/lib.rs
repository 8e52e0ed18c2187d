pub mod changelog;
pub mod clock;
pub mod comments;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod poll;
pub mod recorder;
pub mod render;
pub mod types;

pub use changelog::{Changelog, InMemoryChangelog, SqliteChangelog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use comments::{CommentRecord, CommentSource, CommentStatus, InMemoryComments};
pub use config::{OrderingMode, RealtimeConfig};
pub use engine::{LiveComments, LiveCommentsBuilder};
pub use error::{Error, Result};
pub use events::{CommentEvent, CommentEvents};
pub use poll::PollService;
pub use recorder::{sweep, ChangeRecorder, DELETED_TOKEN, UNAVAILABLE_TOKEN};
pub use render::{CommentRenderer, ListItemRenderer, RendererTable};
pub use types::{
    ChangeEntry, ChangeKind, ClientBootstrap, Cursor, NewChangeEntry, PollEntry, PollResponse,
};

pub use rusqlite;
pub use rusqlite_migration;
