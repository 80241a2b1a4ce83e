use tracing::debug;

use warden_core::{MessageEvent, RawMessageEvent};

use crate::content::count_links;

/// Convert a raw platform event into a canonical [`MessageEvent`].
///
/// Returns `None` for automated authors (bots, webhooks) so the engine never
/// reacts to its own actions, and for malformed input (no guild). Dropping is
/// silent for bots and logged at debug for malformed events; normalization
/// itself never fails.
pub fn normalize(raw: RawMessageEvent) -> Option<MessageEvent> {
    if raw.author_is_bot || raw.author_is_webhook {
        return None;
    }

    let Some(guild_id) = raw.guild_id else {
        debug!(
            message_id = raw.message_id,
            "dropping event without guild context"
        );
        return None;
    };

    let link_count = count_links(&raw.content);

    Some(MessageEvent {
        message_id: raw.message_id,
        channel_id: raw.channel_id,
        guild_id,
        user_id: raw.user_id,
        timestamp_secs: raw.timestamp_secs,
        content: raw.content,
        embed_count: raw.embed_count,
        link_count,
        author_joined_at_secs: raw.author_joined_at_secs,
    })
}
