//! Discord event handler for serenity.
//!
//! Translates gateway events into [`GatewayEvent`]s on the connection's hub.

use std::sync::Arc;

use {
    botdeck_channels::{BotUser, GatewayEvent, InboundMessage, MessageAuthor},
    serenity::{
        all::{ActivityData, Context, EventHandler, Guild, Message, Ready, UnavailableGuild},
        async_trait,
    },
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{counter, discord as discord_metrics, labels};

use crate::state::Session;

/// Handler for one connection's gateway events.
pub(crate) struct DiscordHandler {
    session: Arc<Session>,
}

impl DiscordHandler {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

fn record_event(_event: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(discord_metrics::DISPATCH_EVENTS_TOTAL, labels::EVENT => _event).increment(1);
}

pub(crate) fn inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        author: MessageAuthor {
            id: msg.author.id.to_string(),
            username: msg.author.name.clone(),
            global_name: msg.author.global_name.clone(),
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        record_event("READY");
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            session_id = %ready.session_id,
            "discord bot ready"
        );

        ctx.set_activity(Some(ActivityData::watching(
            self.session.presence_name.clone(),
        )));

        let user = BotUser {
            id: ready.user.id.to_string(),
            username: ready.user.name.clone(),
        };
        let nothing_pending = self
            .session
            .write()
            .on_ready(user, ready.guilds.iter().map(|g| g.id.to_string()));

        #[cfg(feature = "metrics")]
        counter!(discord_metrics::SESSIONS_TOTAL).increment(1);

        if !self.session.resolve(Ok(())) {
            debug!("READY after a resume or reconnect");
        }
        if nothing_pending {
            self.session.mark_ready();
        } else {
            let session = Arc::clone(&self.session);
            tokio::spawn(async move { session.wait_for_guilds().await });
        }
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        record_event("GUILD_CREATE");
        let guild_id = guild.id.to_string();
        let arrival = self
            .session
            .write()
            .on_guild_create(&guild_id, guild.member_count);
        if !arrival.was_pending {
            info!(guild = %guild.name, members = guild.member_count, "joined guild");
        }
        self.session.hub.emit(GatewayEvent::GuildAvailable {
            guild_id,
            name: guild.name.clone(),
            member_count: guild.member_count,
        });
        if arrival.completes {
            self.session.mark_ready();
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        record_event("GUILD_DELETE");
        let guild_id = incomplete.id.to_string();
        if incomplete.unavailable {
            debug!(%guild_id, "guild became unavailable");
            return;
        }
        self.session.write().on_guild_delete(&guild_id);
        info!(%guild_id, "left guild");
        self.session.hub.emit(GatewayEvent::GuildRemoved { guild_id });
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        record_event("MESSAGE_CREATE");
        self.session.hub.emit(GatewayEvent::Message(inbound(&msg)));
    }
}
