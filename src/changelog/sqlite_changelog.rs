use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, TransactionBehavior};
use rusqlite_migration::{Migrations, M};
use uuid::Uuid;

use crate::changelog::Changelog;
use crate::error::Result;
use crate::types::{ChangeEntry, ChangeKind, NewChangeEntry};

/// Changelog backend over SQLite. Connections come from an r2d2 pool so
/// polls can read in parallel while appends and sweeps queue on SQLite's
/// single writer.
#[derive(Clone)]
pub struct SqliteChangelog {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteChangelog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::file(path))
    }

    /// In-memory database shared by every connection in the pool.
    pub fn open_memory() -> Result<Self> {
        let name = format!(
            "file:changelog_{}?mode=memory&cache=shared",
            Uuid::now_v7().simple()
        );
        Self::from_manager(SqliteConnectionManager::file(&name))
    }

    fn from_manager(manager: SqliteConnectionManager) -> Result<Self> {
        let manager = manager.with_init(init_connection);
        let pool = Pool::builder().max_size(8).build(manager)?;
        let mut conn = pool.get()?;
        migrations().to_latest(&mut conn)?;
        drop(conn);
        Ok(Self { pool })
    }
}

fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // an acknowledged append must survive a crash
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(Duration::from_secs(5))
}

fn migrations() -> Migrations<'static> {
    // AUTOINCREMENT keeps ids monotonic even after a sweep empties the table
    Migrations::new(vec![M::up(
        "CREATE TABLE comment_change_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_id INTEGER NOT NULL,
            parent_id INTEGER NOT NULL DEFAULT 0,
            post_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            recorded_at INTEGER NOT NULL
        );
        CREATE INDEX idx_change_log_post_id ON comment_change_log (post_id);
        CREATE INDEX idx_change_log_recorded_at ON comment_change_log (recorded_at);",
    )])
}

impl ToSql for ChangeKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ChangeKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        ChangeKind::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown change kind '{}'", text).into()))
    }
}

impl Changelog for SqliteChangelog {
    fn append(&self, entry: &NewChangeEntry) -> Result<i64> {
        let mut conn = self.pool.get()?;
        // take the write lock up front so racing appends queue here
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let newest: i64 = txn.query_row(
            "SELECT IFNULL(MAX(recorded_at), ?1) FROM comment_change_log",
            [entry.recorded_at],
            |row| row.get(0),
        )?;
        let recorded_at = entry.recorded_at.max(newest);
        txn.execute(
            "INSERT INTO comment_change_log (comment_id, parent_id, post_id, kind, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.comment_id,
                entry.parent_id,
                entry.post_id,
                entry.kind,
                entry.payload,
                recorded_at
            ],
        )?;
        let id = txn.last_insert_rowid();
        txn.commit()?;
        log::debug!(
            "SQL EXECUTE: INSERT comment_change_log id={}, post={}, comment={}, kind={}",
            id,
            entry.post_id,
            entry.comment_id,
            entry.kind.as_str()
        );
        Ok(id)
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM comment_change_log WHERE recorded_at < ?1",
            [cutoff_ms],
        )?;
        log::debug!(
            "SQL EXECUTE: DELETE comment_change_log cutoff={}, {} rows affected",
            cutoff_ms,
            removed
        );
        Ok(removed)
    }

    fn query_by_post(&self, post_id: i64, min_recorded_at: i64) -> Result<Vec<ChangeEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, comment_id, parent_id, post_id, kind, payload, recorded_at
             FROM comment_change_log
             WHERE post_id = ?1 AND recorded_at > ?2
             ORDER BY recorded_at ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![post_id, min_recorded_at], |row| {
                Ok(ChangeEntry {
                    id: row.get(0)?,
                    comment_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    post_id: row.get(3)?,
                    kind: row.get(4)?,
                    payload: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
