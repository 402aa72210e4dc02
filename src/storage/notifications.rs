use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use crate::common::MessageId;

use super::ensure_parent_dir;

/// Remembers the last message the user was alerted about, so a restart does not
/// alert again for the same message.
pub struct NotificationLog {
    conn: Connection,
}

impl NotificationLog {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        if let Err(err) = ensure_parent_dir(path.as_ref()) {
            log::warn!(
                "Unable to create directory for {}: {err}",
                path.as_ref().display()
            );
        }
        let log = Self {
            conn: Connection::open(path)?,
        };
        log.init_schema()?;
        Ok(log)
    }

    pub fn in_memory() -> SqlResult<Self> {
        let log = Self {
            conn: Connection::open_in_memory()?,
        };
        log.init_schema()?;
        Ok(log)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS last_notified (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                message_id INTEGER NOT NULL,
                notified_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;
        Ok(())
    }

    pub fn last_notified(&self) -> SqlResult<Option<MessageId>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT message_id FROM last_notified WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|id| MessageId(id as u64)))
    }

    pub fn record(&self, message_id: MessageId) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO last_notified (id, message_id, notified_at)
             VALUES (1, ?1, strftime('%s', 'now'))",
            params![message_id.0 as i64],
        )?;
        Ok(())
    }
}
