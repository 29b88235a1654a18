use super::Database;
use tracing::debug;

/// A user's subscription to an event. `event_id` is a weak reference: the
/// event may have been deleted, and callers prune stale rows when they
/// notice.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub id: i64,
    pub user_id: String,
    pub event_id: i64,
}

#[derive(Clone)]
pub struct SubscriptionStore {
    db: Database,
}

impl SubscriptionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Storage does not enforce uniqueness; callers must check this before
    /// inserting to keep one row per (user, event).
    pub fn exists(&self, user_id: &str, event_id: i64) -> anyhow::Result<bool> {
        let conn = self.db.conn();
        let exists = conn
            .prepare("SELECT 1 FROM subscriptions WHERE user_id = ?1 AND event_id = ?2")?
            .exists((user_id, event_id))?;
        Ok(exists)
    }

    pub fn insert(&self, user_id: &str, event_id: i64) -> anyhow::Result<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO subscriptions (user_id, event_id) VALUES (?1, ?2)",
            (user_id, event_id),
        )?;
        debug!("SubscriptionStore: user {} subscribed to event {}", user_id, event_id);
        Ok(())
    }

    /// Cascade removal for a deleted or retired event.
    pub fn delete_by_event(&self, event_id: i64) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute("DELETE FROM subscriptions WHERE event_id = ?1", (event_id,))?;
        Ok(count)
    }

    pub fn delete_for_user(&self, user_id: &str, event_id: i64) -> anyhow::Result<usize> {
        let conn = self.db.conn();
        let count = conn.execute(
            "DELETE FROM subscriptions WHERE user_id = ?1 AND event_id = ?2",
            (user_id, event_id),
        )?;
        Ok(count)
    }

    /// One user's subscriptions, ordered by id ascending.
    pub fn list_for_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<SubscriptionRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, event_id FROM subscriptions
             WHERE user_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map((user_id, limit, offset), |row| {
            Ok(SubscriptionRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                event_id: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// All subscriber user ids for one event, in subscription order.
    pub fn subscriber_ids(&self, event_id: i64) -> anyhow::Result<Vec<String>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare("SELECT user_id FROM subscriptions WHERE event_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map((event_id,), |row| row.get(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
