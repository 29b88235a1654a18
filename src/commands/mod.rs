use crate::config::Config;
use crate::db::{EventRecord, EventStore, GuildSettingsStore, SubscriptionStore};
use crate::error::CommandError;
use crate::messaging::Messenger;
use std::sync::Arc;
use tracing::{error, warn};

pub mod events;
pub mod settings;
pub mod subscriptions;

/// Who invoked a command and from where. Admin capability is resolved by the
/// platform layer before dispatch.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub author_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub is_private: bool,
    pub is_admin: bool,
}

/// Command name to handler lookup over tokenized argument arrays. The first token is
/// the command name, matched case-sensitively; `info` and `help` share a
/// handler. Handler failures with a user-facing cause are reported to the
/// invoking channel and never propagate further.
pub struct CommandRouter {
    pub(crate) config: Config,
    pub(crate) events: EventStore,
    pub(crate) subscriptions: SubscriptionStore,
    pub(crate) settings: GuildSettingsStore,
    pub(crate) messenger: Arc<dyn Messenger>,
}

impl CommandRouter {
    pub fn new(
        config: Config,
        events: EventStore,
        subscriptions: SubscriptionStore,
        settings: GuildSettingsStore,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            events,
            subscriptions,
            settings,
            messenger,
        }
    }

    pub async fn dispatch(&self, args: &[&str], inv: &Invocation) {
        let Some(&name) = args.first() else {
            return;
        };

        let outcome = match name {
            "info" | "help" => self.info(args, inv).await,
            "eventchannel" => self.eventchannel(args, inv).await,
            "timezone" => self.timezone(args, inv).await,
            "event" => self.create_event(args, inv).await,
            "repeat" => self.toggle_repeat(args, inv).await,
            "events" => self.list_events(args, inv).await,
            "cancel" => self.cancel(args, inv).await,
            "subscribe" => self.subscribe(args, inv).await,
            "unsubscribe" => self.unsubscribe(args, inv).await,
            "subscriptions" => self.list_subscriptions(args, inv).await,
            _ => return,
        };

        if let Err(err) = outcome {
            if !err.is_user_error() {
                error!("Command '{}' failed: {}", name, err);
            }
            if let Err(send_err) = self
                .messenger
                .send_to_channel(&inv.channel_id, err.user_message())
                .await
            {
                warn!(
                    "Could not report '{}' failure to channel {}: {}",
                    name, inv.channel_id, send_err
                );
            }
        }
    }

    pub(crate) async fn reply(&self, inv: &Invocation, text: &str) -> Result<(), CommandError> {
        self.messenger.send_to_channel(&inv.channel_id, text).await?;
        Ok(())
    }
}

/// Parses a non-negative integer token at `index`. Missing tokens are an
/// arity problem; non-numeric or negative tokens a bad page/id.
pub(crate) fn positive_int_at(args: &[&str], index: usize) -> Result<i64, CommandError> {
    let token = args.get(index).ok_or(CommandError::InvalidArguments)?;
    let value: i64 = token.parse().map_err(|_| CommandError::BadPageNumber)?;
    if value < 0 {
        return Err(CommandError::BadPageNumber);
    }
    Ok(value)
}

/// Resolves the event referenced by the id token at `index`.
pub(crate) fn event_at(
    events: &EventStore,
    args: &[&str],
    index: usize,
) -> Result<EventRecord, CommandError> {
    let id = positive_int_at(args, index)?;
    events.get(id)?.ok_or(CommandError::EventNotFound(id))
}

/// Text block for a page of events, one ID/Name/When entry per event.
pub(crate) fn render_event_block(events: &[EventRecord], page: i64, tz_label: &str) -> String {
    let mut out = format!("Page #{page}:\n");
    for event in events {
        out.push_str(&format!(
            "**ID:** {}\n**Name:** {}\n**When:** {} {}\n\n",
            event.id,
            event.name,
            event.starts_at.format("%m/%d/%y %I:%M%p"),
            tz_label
        ));
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::testing::{memory_database, test_config};
    use crate::messaging::testing::MockMessenger;

    pub struct RouterFixture {
        pub router: CommandRouter,
        pub messenger: Arc<MockMessenger>,
    }

    pub fn router_fixture(messenger: MockMessenger) -> RouterFixture {
        let db = memory_database();
        let messenger = Arc::new(messenger);
        let router = CommandRouter::new(
            test_config(),
            EventStore::new(db.clone()),
            SubscriptionStore::new(db.clone()),
            GuildSettingsStore::new(db),
            messenger.clone(),
        );
        RouterFixture { router, messenger }
    }

    pub fn guild_invocation(author: &str, admin: bool) -> Invocation {
        Invocation {
            author_id: author.to_string(),
            channel_id: "chan".to_string(),
            guild_id: Some("g1".to_string()),
            is_private: false,
            is_admin: admin,
        }
    }

    pub fn dm_invocation(author: &str) -> Invocation {
        Invocation {
            author_id: author.to_string(),
            channel_id: "dm-chan".to_string(),
            guild_id: None,
            is_private: true,
            is_admin: false,
        }
    }
}
