use super::{event_at, positive_int_at, render_event_block, CommandRouter, Invocation};
use crate::db::EventRecord;
use crate::error::CommandError;
use crate::pagination::page_window;
use tracing::{debug, info};

impl CommandRouter {
    /// `subscribe <id>`: idempotent; a second subscribe to the same event
    /// leaves a single record.
    pub(crate) async fn subscribe(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        if args.len() != 2 {
            return Err(CommandError::InvalidArguments);
        }

        let event = event_at(&self.events, args, 1)?;
        if self.subscriptions.exists(&inv.author_id, event.id)? {
            return self
                .reply(inv, "You are already subscribed to that event!")
                .await;
        }

        self.subscriptions.insert(&inv.author_id, event.id)?;
        self.reply(
            inv,
            &format!("You are now subscribed to event #{}!", event.id),
        )
        .await
    }

    /// `unsubscribe <id>`: removes only the caller's subscription.
    pub(crate) async fn unsubscribe(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        if args.len() != 2 {
            return Err(CommandError::InvalidArguments);
        }

        let event = event_at(&self.events, args, 1)?;
        let removed = self.subscriptions.delete_for_user(&inv.author_id, event.id)?;
        if removed == 0 {
            return self
                .reply(inv, "You aren't subscribed to that event!")
                .await;
        }

        self.reply(inv, &format!("Unsubscribed from event #{}!", event.id))
            .await
    }

    /// `subscriptions [page]`: DM only. Subscriptions whose event no longer
    /// exists are pruned as they are discovered.
    pub(crate) async fn list_subscriptions(
        &self,
        args: &[&str],
        inv: &Invocation,
    ) -> Result<(), CommandError> {
        if !inv.is_private {
            return Ok(());
        }
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

        let mut events: Vec<EventRecord> = Vec::new();
        for subscription in self.subscriptions.list_for_user(&inv.author_id, offset, limit)? {
            match self.events.get(subscription.event_id)? {
                Some(event) => events.push(event),
                None => {
                    debug!(
                        "Pruning stale subscriptions for missing event {}",
                        subscription.event_id
                    );
                    let pruned = self.subscriptions.delete_by_event(subscription.event_id)?;
                    info!(
                        "Pruned {} stale subscription(s) for event {}",
                        pruned, subscription.event_id
                    );
                }
            }
        }

        if events.is_empty() {
            return self
                .reply(inv, &format!("No subscriptions on page #{page}."))
                .await;
        }
        self.reply(inv, &render_event_block(&events, page, "UTC"))
            .await
    }
}
