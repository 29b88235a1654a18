use crate::db::EventRecord;
use crate::messaging::Messenger;
use std::sync::Arc;
use tracing::warn;

/// Fans out a fired event: one channel announcement, then one DM per
/// subscriber. Every delivery attempt is independent; an unreachable target
/// is logged and skipped.
pub struct NotificationDispatcher {
    messenger: Arc<dyn Messenger>,
}

impl NotificationDispatcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// `channels` are announcement candidates in preference order, usually
    /// the configured event channel then the guild default. A stale or
    /// unreachable candidate is skipped in favor of the next one.
    pub async fn notify(
        &self,
        event: &EventRecord,
        channels: &[String],
        subscriber_ids: &[String],
    ) {
        let announcement = format!("Event \"{}\" (#{}) is starting now!", event.name, event.id);
        let mut announced = false;
        for channel in channels {
            match self.messenger.send_to_channel(channel, &announcement).await {
                Ok(()) => {
                    announced = true;
                    break;
                }
                Err(e) => warn!(
                    "Could not announce event {} in channel {}: {}",
                    event.id, channel, e
                ),
            }
        }
        if !announced {
            warn!(
                "No announcement channel available for guild {} (event {})",
                event.guild_id, event.id
            );
        }

        for user_id in subscriber_ids {
            let notice = format!(
                "Event \"{}\" (#{}) you subscribed to is starting now!",
                event.name, event.id
            );
            if let Err(e) = self.messenger.send_direct(user_id, &notice).await {
                warn!(
                    "Could not notify subscriber {} for event {}: {}",
                    user_id, event.id, e
                );
            }
        }
    }
}
