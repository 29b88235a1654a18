use crate::db::{EventRecord, EventStore, GuildSettingsStore, SubscriptionStore};
use crate::messaging::Messenger;
use crate::notify::NotificationDispatcher;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

/// The background sweep loop. Every tick it scans the full event set, fires
/// events whose start time has arrived, and transitions each one: weekly
/// reschedule if it repeats, retirement otherwise. Detection is a non-strict
/// comparison against persisted `starts_at`, so a restart with overdue
/// events behaves the same as a late tick.
pub struct Scheduler {
    events: EventStore,
    subscriptions: SubscriptionStore,
    settings: GuildSettingsStore,
    dispatcher: NotificationDispatcher,
    messenger: Arc<dyn Messenger>,
    sweep_interval: Duration,
}

impl Scheduler {
    pub fn new(
        events: EventStore,
        subscriptions: SubscriptionStore,
        settings: GuildSettingsStore,
        dispatcher: NotificationDispatcher,
        messenger: Arc<dyn Messenger>,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            events,
            subscriptions,
            settings,
            dispatcher,
            messenger,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.sweep_interval);
        loop {
            ticker.tick().await;
            self.sweep(Utc::now()).await;
        }
    }

    /// One pass over all persisted events. Takes the sweep timestamp as a
    /// parameter so tests can drive due-event detection deterministically.
    pub async fn sweep(&self, now: DateTime<Utc>) {
        let events = match self.events.all() {
            Ok(events) => events,
            Err(e) => {
                error!("Sweep aborted, could not read events: {}", e);
                return;
            }
        };

        let mut fired = 0usize;
        for event in events {
            // An event exactly at the boundary counts as due.
            if event.starts_at > now {
                continue;
            }
            match self.fire_event(&event).await {
                Ok(()) => fired += 1,
                // Leaves starts_at in the past, so the next sweep retries.
                Err(e) => error!("Processing event {} failed: {}", event.id, e),
            }
        }

        if fired > 0 {
            info!("Sweep fired {} event(s)", fired);
        }
    }

    async fn fire_event(&self, event: &EventRecord) -> anyhow::Result<()> {
        let channels = self.announcement_candidates(&event.guild_id).await;
        let subscriber_ids = self.subscriptions.subscriber_ids(event.id)?;

        debug!(
            "Firing event {} ('{}') with {} subscriber(s)",
            event.id,
            event.name,
            subscriber_ids.len()
        );
        self.dispatcher
            .notify(event, &channels, &subscriber_ids)
            .await;

        if event.repeat {
            // Subscriptions persist across recurrences.
            let next = event.starts_at + ChronoDuration::weeks(1);
            if self.events.set_starts_at(event.id, next)? == 0 {
                debug!("Event {} was cancelled mid-sweep, nothing to reschedule", event.id);
            }
        } else {
            // Subscriptions first: a crash in between leaves only orphaned
            // rows, which listing prunes lazily.
            self.subscriptions.delete_by_event(event.id)?;
            self.events.delete(event.id)?;
        }
        Ok(())
    }

    /// Configured event channel first, then the guild's default channel. The
    /// dispatcher walks the list in order, so a stale configuration still
    /// reaches the default channel. A failure here degrades to skipping the
    /// announcement, never aborts the sweep.
    async fn announcement_candidates(&self, guild_id: &str) -> Vec<String> {
        let configured = match self.settings.get(guild_id) {
            Ok(settings) => settings.event_channel_id,
            Err(e) => {
                warn!("Could not load settings for guild {}: {}", guild_id, e);
                None
            }
        };

        let mut channels = Vec::new();
        if let Some(channel) = configured {
            channels.push(channel);
        }
        if let Some(fallback) = self.messenger.fallback_channel(guild_id).await {
            if !channels.contains(&fallback) {
                channels.push(fallback);
            }
        }
        channels
    }
}
