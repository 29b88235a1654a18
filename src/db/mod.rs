use crate::config::Config;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

pub mod events;
pub mod settings;
pub mod subscriptions;

pub use events::{EventRecord, EventStore};
pub use settings::{GuildSettings, GuildSettingsStore};
pub use subscriptions::{SubscriptionRecord, SubscriptionStore};

const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        // AUTOINCREMENT so event ids are never reused after cancellation.
        let sql = "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                guild_id TEXT NOT NULL,
                starts_at DATETIME NOT NULL,
                repeat BOOLEAN NOT NULL DEFAULT FALSE
            );
            CREATE INDEX IF NOT EXISTS idx_events_guild ON events (guild_id, id);

            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                event_id INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions (user_id, id);
            CREATE INDEX IF NOT EXISTS idx_subscriptions_event ON subscriptions (event_id);

            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id TEXT PRIMARY KEY,
                event_channel_id TEXT,
                timezone TEXT NOT NULL DEFAULT 'UTC'
            );
        ";
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

/// Timestamps are stored as UTC text in SQLite's datetime format.
pub fn to_sqlite_utc(dt: DateTime<Utc>) -> String {
    dt.format(SQLITE_DATETIME_FORMAT).to_string()
}

pub fn parse_sqlite_utc(ts: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(ts, SQLITE_DATETIME_FORMAT).ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn test_config() -> Config {
        Config {
            discord_token: "test".to_string(),
            database_url: ":memory:".to_string(),
            command_prefix: "eb!".to_string(),
            sweep_interval_secs: 60,
            status_message: "test".to_string(),
        }
    }

    pub fn memory_database() -> Database {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        db
    }
}
