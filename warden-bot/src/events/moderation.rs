use serenity::all::{Context, Message};
use tracing::warn;

use warden_core::RawMessageEvent;
use warden_detector::normalize;
use warden_gateway::DiscordGateway;
use warden_utils::time::now_unix_secs;

use crate::EngineState;

/// The canonical moderation pipeline for one inbound message:
/// normalize → assess → remediate → log outcome.
pub async fn handle_message(ctx: &Context, state: &EngineState, message: &Message) {
    let Some(event) = normalize(raw_event(message)) else {
        return;
    };

    let now_secs = now_unix_secs();
    let Some(incident) = state.detector.assess(&event, now_secs).await else {
        return;
    };

    let gateway = DiscordGateway::new(ctx.http.clone(), state.config.page_delay);
    let outcome = state.orchestrator.remediate(&gateway, &incident).await;

    if outcome.is_partial() {
        warn!(summary = %outcome.summary(), "incident completed with errors");
    }
}

fn raw_event(message: &Message) -> RawMessageEvent {
    RawMessageEvent {
        message_id: message.id.get(),
        channel_id: message.channel_id.get(),
        guild_id: message.guild_id.map(|guild_id| guild_id.get()),
        user_id: message.author.id.get(),
        author_is_bot: message.author.bot,
        author_is_webhook: message.webhook_id.is_some(),
        timestamp_secs: message.timestamp.unix_timestamp().max(0) as u64,
        content: message.content.clone(),
        embed_count: message.embeds.len(),
        author_joined_at_secs: message
            .member
            .as_ref()
            .and_then(|member| member.joined_at)
            .map(|joined_at| joined_at.unix_timestamp().max(0) as u64),
    }
}
