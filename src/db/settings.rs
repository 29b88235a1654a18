use super::Database;

pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Per-guild configuration. Absent rows fall back to these defaults: no
/// explicit event channel and the UTC timezone label.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSettings {
    pub guild_id: String,
    pub event_channel_id: Option<String>,
    pub timezone: String,
}

impl GuildSettings {
    fn defaults(guild_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            event_channel_id: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GuildSettingsStore {
    db: Database,
}

impl GuildSettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, guild_id: &str) -> anyhow::Result<GuildSettings> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT event_channel_id, timezone FROM guild_settings WHERE guild_id = ?1",
        )?;
        let mut rows = stmt.query([guild_id])?;

        if let Some(row) = rows.next()? {
            Ok(GuildSettings {
                guild_id: guild_id.to_string(),
                event_channel_id: row.get(0)?,
                timezone: row.get(1)?,
            })
        } else {
            Ok(GuildSettings::defaults(guild_id))
        }
    }

    pub fn set_event_channel(&self, guild_id: &str, channel_id: &str) -> anyhow::Result<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO guild_settings (guild_id, event_channel_id)
             VALUES (?1, ?2)
             ON CONFLICT(guild_id) DO UPDATE SET event_channel_id = ?2",
            (guild_id, channel_id),
        )?;
        Ok(())
    }

    pub fn set_timezone(&self, guild_id: &str, timezone: &str) -> anyhow::Result<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO guild_settings (guild_id, timezone)
             VALUES (?1, ?2)
             ON CONFLICT(guild_id) DO UPDATE SET timezone = ?2",
            (guild_id, timezone),
        )?;
        Ok(())
    }

    /// Removes the row when the bot leaves (or is removed from) a guild.
    pub fn delete(&self, guild_id: &str) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute("DELETE FROM guild_settings WHERE guild_id = ?1", (guild_id,))?;
        Ok(count)
    }
}
