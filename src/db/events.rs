use super::{parse_sqlite_utc, to_sqlite_utc, Database};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use tracing::debug;

/// A scheduled event. `starts_at` is always UTC; `repeat` marks weekly
/// recurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: i64,
    pub name: String,
    pub guild_id: String,
    pub starts_at: DateTime<Utc>,
    pub repeat: bool,
}

#[derive(Clone)]
pub struct EventStore {
    db: Database,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    let raw: String = row.get(3)?;
    let starts_at = parse_sqlite_utc(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unparsable starts_at '{raw}'").into(),
        )
    })?;
    Ok(EventRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        guild_id: row.get(2)?,
        starts_at,
        repeat: row.get(4)?,
    })
}

impl EventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a new event and returns its assigned id. Ids are strictly
    /// increasing and never reused.
    pub fn insert(
        &self,
        guild_id: &str,
        name: &str,
        starts_at: DateTime<Utc>,
        repeat: bool,
    ) -> anyhow::Result<i64> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO events (name, guild_id, starts_at, repeat) VALUES (?1, ?2, ?3, ?4)",
            (name, guild_id, to_sqlite_utc(starts_at), repeat),
        )?;
        let id = conn.last_insert_rowid();
        debug!("EventStore: inserted event {} ('{}') for guild {}", id, name, guild_id);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> anyhow::Result<Option<EventRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, guild_id, starts_at, repeat FROM events WHERE id = ?1",
        )?;
        let mut rows = stmt.query([id])?;

        match rows.next()? {
            Some(row) => Ok(Some(event_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Events for one guild, ordered by id ascending.
    pub fn list_for_guild(
        &self,
        guild_id: &str,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<EventRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, guild_id, starts_at, repeat FROM events
             WHERE guild_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map((guild_id, limit, offset), event_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Full scan used by the scheduler sweep.
    pub fn all(&self) -> anyhow::Result<Vec<EventRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, guild_id, starts_at, repeat FROM events ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], event_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Returns the number of rows updated; 0 means the id no longer exists.
    pub fn set_starts_at(&self, id: i64, starts_at: DateTime<Utc>) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute(
            "UPDATE events SET starts_at = ?1 WHERE id = ?2",
            (to_sqlite_utc(starts_at), id),
        )?;
        Ok(count)
    }

    pub fn set_repeat(&self, id: i64, repeat: bool) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute("UPDATE events SET repeat = ?1 WHERE id = ?2", (repeat, id))?;
        Ok(count)
    }

    pub fn delete(&self, id: i64) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute("DELETE FROM events WHERE id = ?1", (id,))?;
        Ok(count)
    }
}
