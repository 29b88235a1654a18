use super::{event_at, positive_int_at, render_event_block, CommandRouter, Invocation};
use crate::error::CommandError;
use crate::pagination::page_window;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::info;

const DATETIME_FORMAT: &str = "%m/%d/%y %H:%M";

/// Strict `mm/dd/yy hh:mm` parse, interpreted as UTC. Start times already in
/// the past are rejected.
pub(crate) fn parse_start_time(
    date: &str,
    time: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, CommandError> {
    let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), DATETIME_FORMAT)
        .map_err(|_| CommandError::BadDatetime)?;
    let starts_at = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
    if starts_at < now {
        return Err(CommandError::PastDatetime);
    }
    Ok(starts_at)
}

impl CommandRouter {
    /// `event <name> <mm/dd/yy> <hh:mm>`: admin-only, guild channels only.
    pub(crate) async fn create_event(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        let Some(guild_id) = inv.guild_id.as_deref() else {
            return Ok(());
        };
        if !inv.is_admin {
            return Err(CommandError::PermissionDenied);
        }
        if args.len() != 4 {
            return Err(CommandError::InvalidArguments);
        }

        let starts_at = parse_start_time(args[2], args[3], Utc::now())?;
        let id = self.events.insert(guild_id, args[1], starts_at, false)?;
        info!(
            "Created event {} ('{}') in guild {} starting {}",
            id, args[1], guild_id, starts_at
        );

        self.reply(
            inv,
            &format!(
                "Created event \"{}\" (#{}) starting {} UTC!",
                args[1],
                id,
                starts_at.format("%m/%d/%y %I:%M%p")
            ),
        )
        .await
    }

    /// `repeat <id>`: toggles weekly recurrence.
    pub(crate) async fn toggle_repeat(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        if inv.guild_id.is_none() {
            return Ok(());
        }
        if !inv.is_admin {
            return Err(CommandError::PermissionDenied);
        }
        if args.len() != 2 {
            return Err(CommandError::InvalidArguments);
        }

        let event = event_at(&self.events, args, 1)?;
        let repeat = !event.repeat;
        self.events.set_repeat(event.id, repeat)?;
        info!("Event {} repeat toggled to {}", event.id, repeat);

        let text = if repeat {
            format!("Event #{} now repeats weekly!", event.id)
        } else {
            format!("Event #{} no longer repeats.", event.id)
        };
        self.reply(inv, &text).await
    }

    /// `events [page]`: paginated listing for the invoking guild.
    pub(crate) async fn list_events(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        let Some(guild_id) = inv.guild_id.as_deref() else {
            return Ok(());
        };
        if args.len() > 2 {
            return Err(CommandError::InvalidArguments);
        }

        // Clamp once so the empty-page reply and the rendered header agree.
        let page = if args.len() == 2 {
            positive_int_at(args, 1)?.max(1)
        } else {
            1
        };
        let (offset, limit) = page_window(page);
        let events = self.events.list_for_guild(guild_id, offset, limit)?;
        if events.is_empty() {
            return self.reply(inv, &format!("No events on page #{page}.")).await;
        }

        let timezone = self.settings.get(guild_id)?.timezone;
        self.reply(inv, &render_event_block(&events, page, &timezone))
            .await
    }

    /// `cancel <id>`: deletes the event and all its subscriptions.
    pub(crate) async fn cancel(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        if inv.guild_id.is_none() {
            return Ok(());
        }
        if !inv.is_admin {
            return Err(CommandError::PermissionDenied);
        }
        if args.len() != 2 {
            return Err(CommandError::InvalidArguments);
        }

        let event = event_at(&self.events, args, 1)?;
        // Subscriptions first, so a crash in between leaves only orphaned
        // rows that listing prunes lazily.
        self.subscriptions.delete_by_event(event.id)?;
        self.events.delete(event.id)?;
        info!("Event {} cancelled", event.id);

        self.reply(inv, &format!("Event #{} cancelled!", event.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::messaging::testing::MockMessenger;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 19, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_start_time() {
        let parsed = parse_start_time("01/01/24", "20:00", now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap());

        assert!(matches!(
            parse_start_time("2024-01-01", "20:00", now()),
            Err(CommandError::BadDatetime)
        ));
        assert!(matches!(
            parse_start_time("01/01/24", "8pm", now()),
            Err(CommandError::BadDatetime)
        ));
        assert!(matches!(
            parse_start_time("01/01/24", "18:00", now()),
            Err(CommandError::PastDatetime)
        ));
        // Exactly "now" is still acceptable.
        assert!(parse_start_time("01/01/24", "19:00", now()).is_ok());
    }

    #[tokio::test]
    async fn test_create_event_requires_admin() {
        let fx = router_fixture(MockMessenger::new());
        fx.router
            .dispatch(
                &["event", "Raid", "01/01/30", "20:00"],
                &guild_invocation("u1", false),
            )
            .await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "You don't have permission to do that!"
        );
        assert!(fx.router.events.list_for_guild("g1", 0, 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_rejects_past_datetime_without_insert() {
        let fx = router_fixture(MockMessenger::new());
        fx.router
            .dispatch(
                &["event", "Raid", "01/01/20", "20:00"],
                &guild_invocation("u1", true),
            )
            .await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "An event should take place in the future! (Remember to use UTC)"
        );
        assert!(fx.router.events.list_for_guild("g1", 0, 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_happy_path() {
        let fx = router_fixture(MockMessenger::new());
        fx.router
            .dispatch(
                &["event", "Raid", "01/01/30", "20:00"],
                &guild_invocation("u1", true),
            )
            .await;

        let events = fx.router.events.list_for_guild("g1", 0, 5).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Raid");
        assert!(!events[0].repeat);
        assert!(fx
            .messenger
            .last_channel_message()
            .unwrap()
            .contains("Created event \"Raid\""));
    }

    #[tokio::test]
    async fn test_toggle_repeat_flips_flag() {
        let fx = router_fixture(MockMessenger::new());
        let id = fx
            .router
            .events
            .insert("g1", "Raid", now(), false)
            .unwrap();
        let inv = guild_invocation("u1", true);

        fx.router.dispatch(&["repeat", &id.to_string()], &inv).await;
        assert!(fx.router.events.get(id).unwrap().unwrap().repeat);

        fx.router.dispatch(&["repeat", &id.to_string()], &inv).await;
        assert!(!fx.router.events.get(id).unwrap().unwrap().repeat);
    }

    #[tokio::test]
    async fn test_cancel_cascades_subscriptions() {
        let fx = router_fixture(MockMessenger::new());
        let id = fx.router.events.insert("g1", "Raid", now(), false).unwrap();
        fx.router.subscriptions.insert("u2", id).unwrap();

        fx.router
            .dispatch(&["cancel", &id.to_string()], &guild_invocation("u1", true))
            .await;

        assert!(fx.router.events.get(id).unwrap().is_none());
        assert!(!fx.router.subscriptions.exists("u2", id).unwrap());

        // Subscribing to the cancelled id now fails.
        fx.router
            .dispatch(&["subscribe", &id.to_string()], &guild_invocation("u2", false))
            .await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "No event exists with that id!"
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_id() {
        let fx = router_fixture(MockMessenger::new());
        fx.router
            .dispatch(&["cancel", "123"], &guild_invocation("u1", true))
            .await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "No event exists with that id!"
        );
    }

    #[tokio::test]
    async fn test_list_events_pagination() {
        let fx = router_fixture(MockMessenger::new());
        for i in 1..=7 {
            fx.router
                .events
                .insert("g1", &format!("event {i}"), now(), false)
                .unwrap();
        }
        let inv = guild_invocation("u1", false);

        fx.router.dispatch(&["events"], &inv).await;
        let page1 = fx.messenger.last_channel_message().unwrap();
        assert!(page1.contains("event 1"));
        assert!(page1.contains("event 5"));
        assert!(!page1.contains("event 6"));

        fx.router.dispatch(&["events", "2"], &inv).await;
        let page2 = fx.messenger.last_channel_message().unwrap();
        assert!(page2.contains("event 6"));
        assert!(page2.contains("event 7"));

        fx.router.dispatch(&["events", "3"], &inv).await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "No events on page #3."
        );

        fx.router.dispatch(&["events", "x"], &inv).await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "That isn't a valid number!"
        );
    }

    #[tokio::test]
    async fn test_list_events_page_zero_reads_as_first_page() {
        let fx = router_fixture(MockMessenger::new());
        let inv = guild_invocation("u1", false);

        fx.router.dispatch(&["events", "0"], &inv).await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "No events on page #1."
        );

        fx.router.events.insert("g1", "Raid", now(), false).unwrap();
        fx.router.dispatch(&["events", "0"], &inv).await;
        assert!(fx
            .messenger
            .last_channel_message()
            .unwrap()
            .starts_with("Page #1:"));
    }

    #[tokio::test]
    async fn test_list_events_tolerates_huge_page_numbers() {
        let fx = router_fixture(MockMessenger::new());
        fx.router.events.insert("g1", "Raid", now(), false).unwrap();
        let inv = guild_invocation("u1", false);

        fx.router
            .dispatch(&["events", "9223372036854775807"], &inv)
            .await;
        assert_eq!(
            fx.messenger.last_channel_message().unwrap(),
            "No events on page #9223372036854775807."
        );
    }

    #[tokio::test]
    async fn test_guild_commands_ignored_in_dms() {
        let fx = router_fixture(MockMessenger::new());
        let inv = dm_invocation("u1");
        fx.router
            .dispatch(&["event", "Raid", "01/01/30", "20:00"], &inv)
            .await;
        fx.router.dispatch(&["events"], &inv).await;
        fx.router.dispatch(&["cancel", "1"], &inv).await;
        assert!(fx.messenger.channel_log().is_empty());
    }
}
