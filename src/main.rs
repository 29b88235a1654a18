use eventbot::commands::{CommandRouter, Invocation};
use eventbot::config::Config;
use eventbot::db::{Database, EventStore, GuildSettingsStore, SubscriptionStore};
use eventbot::messaging::DiscordMessenger;
use eventbot::notify::NotificationDispatcher;
use eventbot::scheduler::Scheduler;
use serenity::all::{ActivityData, GatewayIntents, Guild, Message, Ready, UnavailableGuild};
use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::http::Http;
use std::sync::Arc;
use tracing::{error, info};

struct Handler {
    router: CommandRouter,
    settings: GuildSettingsStore,
    prefix: String,
    status_message: String,
}

/// Admin capability is the platform's: resolved from the member's guild
/// permissions, never from bot-side state.
async fn member_is_admin(ctx: &Context, msg: &Message) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };
    let member = match guild_id.member(&ctx.http, msg.author.id).await {
        Ok(member) => member,
        Err(_) => return false,
    };
    let Some(guild) = msg.guild(&ctx.cache) else {
        return false;
    };
    if guild.owner_id == msg.author.id {
        return true;
    }
    member.roles.iter().any(|role_id| {
        guild
            .roles
            .get(role_id)
            .map(|role| role.permissions.administrator())
            .unwrap_or(false)
    })
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is now online!", ready.user.name);
        ctx.set_activity(Some(ActivityData::custom(&self.status_message)));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(rest) = msg.content.strip_prefix(&self.prefix) else {
            return;
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let invocation = Invocation {
            author_id: msg.author.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|id| id.to_string()),
            is_private: msg.guild_id.is_none(),
            is_admin: member_is_admin(&ctx, &msg).await,
        };

        self.router.dispatch(&args, &invocation).await;
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // `unavailable` means an outage, not a removal; settings stay.
        if incomplete.unavailable {
            return;
        }
        let guild_id = incomplete.id.to_string();
        match self.settings.delete(&guild_id) {
            Ok(_) => info!("Removed settings for departed guild {}", guild_id),
            Err(e) => error!("Could not remove settings for guild {}: {}", guild_id, e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let db = Database::new(&config)?;
    db.execute_init()?;
    let events = EventStore::new(db.clone());
    let subscriptions = SubscriptionStore::new(db.clone());
    let settings = GuildSettingsStore::new(db);

    let http = Arc::new(Http::new(&discord_token));
    let messenger = Arc::new(DiscordMessenger::new(http));

    let scheduler = Scheduler::new(
        events.clone(),
        subscriptions.clone(),
        settings.clone(),
        NotificationDispatcher::new(messenger.clone()),
        messenger.clone(),
        config.sweep_interval_secs,
    );
    tokio::spawn(scheduler.run());

    let handler = Handler {
        prefix: config.command_prefix.clone(),
        status_message: config.status_message.clone(),
        settings: settings.clone(),
        router: CommandRouter::new(config, events, subscriptions, settings, messenger),
    };

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES;

    let mut client = Client::builder(&discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
