use crate::error::NotifyError;
use async_trait::async_trait;
use serenity::all::{ChannelId, CreateMessage, GuildId, UserId};
use serenity::http::Http;
use std::sync::Arc;
use tracing::debug;

/// The capability the core depends on: something that can carry a text
/// message to a channel or a user, and name a guild's fallback channel.
/// Channel, user, and guild ids cross this seam as strings.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<(), NotifyError>;

    async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), NotifyError>;

    /// The guild's default channel, used when no event channel is configured.
    async fn fallback_channel(&self, guild_id: &str) -> Option<String>;
}

pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn parse_id(kind: &str, id: &str) -> Result<u64, NotifyError> {
    id.parse()
        .map_err(|_| NotifyError::Unreachable(format!("invalid {kind} id '{id}'")))
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<(), NotifyError> {
        let id = parse_id("channel", channel_id)?;
        debug!("Sending message to channel {}", channel_id);
        ChannelId::new(id)
            .send_message(&self.http, CreateMessage::new().content(content))
            .await
            .map_err(|e| NotifyError::Unreachable(format!("channel {channel_id}: {e}")))?;
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), NotifyError> {
        let id = parse_id("user", user_id)?;
        debug!("Sending direct message to user {}", user_id);
        let dm = UserId::new(id)
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| NotifyError::Unreachable(format!("user {user_id}: {e}")))?;
        dm.id
            .send_message(&self.http, CreateMessage::new().content(content))
            .await
            .map_err(|e| NotifyError::Unreachable(format!("user {user_id}: {e}")))?;
        Ok(())
    }

    async fn fallback_channel(&self, guild_id: &str) -> Option<String> {
        let id: u64 = guild_id.parse().ok()?;
        let guild = GuildId::new(id).to_partial_guild(&self.http).await.ok()?;
        guild.system_channel_id.map(|c| c.to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records outgoing messages and fails delivery for configured targets.
    #[derive(Default)]
    pub struct MockMessenger {
        pub channel_messages: Mutex<Vec<(String, String)>>,
        pub direct_messages: Mutex<Vec<(String, String)>>,
        pub unreachable_users: HashSet<String>,
        pub unreachable_channels: HashSet<String>,
        pub fallback: Option<String>,
    }

    impl MockMessenger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_fallback(channel_id: &str) -> Self {
            Self {
                fallback: Some(channel_id.to_string()),
                ..Self::default()
            }
        }

        pub fn channel_log(&self) -> Vec<(String, String)> {
            self.channel_messages.lock().unwrap().clone()
        }

        pub fn direct_log(&self) -> Vec<(String, String)> {
            self.direct_messages.lock().unwrap().clone()
        }

        pub fn last_channel_message(&self) -> Option<String> {
            self.channel_log().last().map(|(_, text)| text.clone())
        }
    }

    #[async_trait]
    impl Messenger for MockMessenger {
        async fn send_to_channel(
            &self,
            channel_id: &str,
            content: &str,
        ) -> Result<(), NotifyError> {
            if self.unreachable_channels.contains(channel_id) {
                return Err(NotifyError::Unreachable(format!("channel {channel_id}")));
            }
            self.channel_messages
                .lock()
                .unwrap()
                .push((channel_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), NotifyError> {
            if self.unreachable_users.contains(user_id) {
                return Err(NotifyError::Unreachable(format!("user {user_id}")));
            }
            self.direct_messages
                .lock()
                .unwrap()
                .push((user_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn fallback_channel(&self, _guild_id: &str) -> Option<String> {
            self.fallback.clone()
        }
    }
}
