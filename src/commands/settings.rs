use super::{CommandRouter, Invocation};
use crate::error::CommandError;
use tracing::info;

const OVERVIEW: &str = "EventBot helps admins schedule events and notify subscribers when they start.";

fn command_list(prefix: &str) -> String {
    format!(
        "```\n\
         {p}info - shows this menu.\n\
         {p}eventchannel [#channel] - shows or sets the event announcement channel.\n\
         {p}timezone [label] - shows or sets the timezone label on event listings.\n\
         {p}event <name> <mm/dd/yy> <hh:mm> - schedules an event (UTC).\n\
         {p}repeat <id> - toggles whether an event repeats each week.\n\
         {p}events [page #] - shows the scheduled events.\n\
         {p}cancel <id> - cancels an event.\n\
         {p}subscribe <id> - subscribes to an event.\n\
         {p}unsubscribe <id> - unsubscribes from an event.\n\
         {p}subscriptions [page #] - lists subscribed events (DM only).\n\
         ```",
        p = prefix
    )
}

/// Accepts a `<#123>` channel mention or a bare numeric id.
pub(crate) fn parse_channel_token(token: &str) -> Option<String> {
    let inner = token
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(token);
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        Some(inner.to_string())
    } else {
        None
    }
}

impl CommandRouter {
    /// `info` / `help`: overview in the channel, command list by DM.
    pub(crate) async fn info(&self, args: &[&str], inv: &Invocation) -> Result<(), CommandError> {
        if args.len() != 1 {
            return Err(CommandError::InvalidArguments);
        }

        self.reply(inv, OVERVIEW).await?;
        self.messenger
            .send_direct(
                &inv.author_id,
                &format!("Commands:\n{}", command_list(&self.config.command_prefix)),
            )
            .await?;
        if !inv.is_private {
            self.reply(inv, "The commands have been DMed to you!").await?;
        }
        Ok(())
    }

    /// `eventchannel [target]`: reports or updates the announcement channel.
    pub(crate) async fn eventchannel(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        let Some(guild_id) = inv.guild_id.as_deref() else {
            return Ok(());
        };

        match args.len() {
            1 => {
                let settings = self.settings.get(guild_id)?;
                let channel = match settings.event_channel_id {
                    Some(channel) => Some(channel),
                    None => self.messenger.fallback_channel(guild_id).await,
                };
                match channel {
                    Some(channel) => {
                        self.reply(inv, &format!("The event channel is <#{channel}>."))
                            .await
                    }
                    None => {
                        self.reply(inv, "No event channel is configured for this server.")
                            .await
                    }
                }
            }
            2 => {
                let Some(channel) = parse_channel_token(args[1]) else {
                    return self
                        .reply(inv, "No channel mentioned! ex: eventchannel #general")
                        .await;
                };
                self.settings.set_event_channel(guild_id, &channel)?;
                info!("Guild {} event channel set to {}", guild_id, channel);
                self.reply(inv, &format!("<#{channel}> is now the event channel!"))
                    .await
            }
            _ => Err(CommandError::InvalidArguments),
        }
    }

    /// `timezone [label]`: reports or updates the label appended to times in
    /// event listings. The label is display text only; stored times stay UTC.
    pub(crate) async fn timezone(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        let Some(guild_id) = inv.guild_id.as_deref() else {
            return Ok(());
        };

        match args.len() {
            1 => {
                let timezone = self.settings.get(guild_id)?.timezone;
                self.reply(inv, &format!("Event times are listed in {timezone}."))
                    .await
            }
            2 => {
                self.settings.set_timezone(guild_id, args[1])?;
                info!("Guild {} timezone label set to {}", guild_id, args[1]);
                self.reply(
                    inv,
                    &format!("Event times will now be listed in {}!", args[1]),
                )
                .await
            }
            _ => Err(CommandError::InvalidArguments),
        }
    }
}
