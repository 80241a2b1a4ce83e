use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, EditMember, EditMessage, EmojiId, GetMessages, GuildId, Http,
    HttpError, MessageId, ReactionType, Timestamp, UserId,
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::classify_http;
use crate::{ChannelInfo, Gateway, GatewayError, MessageMeta, MessageRef, ReactionGlyph};

/// History page size; the platform caps one fetch at 100 messages.
const HISTORY_PAGE_SIZE: u8 = 100;

/// Discord-backed gateway. Holds the shared HTTP client and the pause
/// inserted between history pages to respect platform rate limits.
#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
    page_delay: Duration,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>, page_delay: Duration) -> Self {
        Self { http, page_delay }
    }
}

fn map_err(source: serenity::Error, context: &str) -> GatewayError {
    match &source {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify_http(
            response.status_code.as_u16(),
            response.error.code,
            context,
        ),
        _ => GatewayError::Transient(format!("{context}: {source}")),
    }
}

#[async_trait]
impl Gateway for DiscordGateway {
    async fn suppress_embeds(&self, message: MessageRef) -> Result<(), GatewayError> {
        ChannelId::new(message.channel_id)
            .edit_message(
                &self.http,
                MessageId::new(message.message_id),
                EditMessage::new().suppress_embeds(true),
            )
            .await
            .map(|_| ())
            .map_err(|source| map_err(source, "suppress embeds"))
    }

    async fn send_notice(
        &self,
        channel_id: u64,
        text: &str,
        ttl: Option<Duration>,
    ) -> Result<(), GatewayError> {
        let channel = ChannelId::new(channel_id);
        let notice = channel
            .say(&self.http, text)
            .await
            .map_err(|source| map_err(source, "send notice"))?;

        if let Some(ttl) = ttl {
            let http = self.http.clone();
            tokio::spawn(async move {
                sleep(ttl).await;
                if let Err(source) = channel.delete_message(&http, notice.id).await {
                    debug!(?source, "failed to expire transient notice");
                }
            });
        }

        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError> {
        ChannelId::new(message.channel_id)
            .delete_message(&self.http, MessageId::new(message.message_id))
            .await
            .map_err(|source| map_err(source, "delete message"))
    }

    async fn list_recent_messages(
        &self,
        channel_id: u64,
        limit: u16,
    ) -> Result<Vec<MessageMeta>, GatewayError> {
        let channel = ChannelId::new(channel_id);
        let mut collected: Vec<MessageMeta> = Vec::new();
        let mut before: Option<MessageId> = None;

        while collected.len() < limit as usize {
            let remaining = limit as usize - collected.len();
            let page_size = remaining.min(HISTORY_PAGE_SIZE as usize) as u8;

            let get_messages = match before {
                Some(before_id) => GetMessages::new().before(before_id).limit(page_size),
                None => GetMessages::new().limit(page_size),
            };

            let messages = channel
                .messages(&self.http, get_messages)
                .await
                .map_err(|source| map_err(source, "list recent messages"))?;

            if messages.is_empty() {
                break;
            }

            before = messages.last().map(|message| message.id);

            let page_len = messages.len();
            collected.extend(messages.into_iter().map(|message| MessageMeta {
                message: MessageRef::new(channel_id, message.id.get()),
                author_id: message.author.id.get(),
            }));

            if page_len < page_size as usize {
                break;
            }

            sleep(self.page_delay).await;
        }

        Ok(collected)
    }

    async fn list_channels(&self, guild_id: u64) -> Result<Vec<ChannelInfo>, GatewayError> {
        let channels = GuildId::new(guild_id)
            .channels(&self.http)
            .await
            .map_err(|source| map_err(source, "list channels"))?;

        Ok(channels
            .values()
            .filter(|channel| {
                matches!(
                    channel.kind,
                    ChannelType::Text
                        | ChannelType::News
                        | ChannelType::PublicThread
                        | ChannelType::PrivateThread
                        | ChannelType::NewsThread
                )
            })
            .map(|channel| ChannelInfo {
                channel_id: channel.id.get(),
                name: channel.name.clone(),
            })
            .collect())
    }

    async fn mute_user(
        &self,
        guild_id: u64,
        user_id: u64,
        until_unix_secs: u64,
    ) -> Result<(), GatewayError> {
        let until = Timestamp::from_unix_timestamp(until_unix_secs as i64)
            .map_err(|source| GatewayError::Transient(format!("mute until timestamp: {source}")))?;

        let edit = EditMember::new().disable_communication_until_datetime(until);
        GuildId::new(guild_id)
            .edit_member(&self.http, UserId::new(user_id), edit)
            .await
            .map(|_| ())
            .map_err(|source| map_err(source, "mute user"))
    }

    async fn find_emoji(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<ReactionGlyph>, GatewayError> {
        let emojis = GuildId::new(guild_id)
            .emojis(&self.http)
            .await
            .map_err(|source| map_err(source, "find emoji"))?;

        Ok(emojis
            .into_iter()
            .find(|emoji| emoji.name == name)
            .map(|emoji| ReactionGlyph::Custom {
                id: emoji.id.get(),
                name: emoji.name,
            }))
    }

    async fn react_to_message(
        &self,
        message: MessageRef,
        glyph: &ReactionGlyph,
    ) -> Result<(), GatewayError> {
        let reaction = match glyph {
            ReactionGlyph::Custom { id, name } => ReactionType::Custom {
                animated: false,
                id: EmojiId::new(*id),
                name: Some(name.clone()),
            },
            ReactionGlyph::Unicode(glyph) => ReactionType::Unicode(glyph.clone()),
        };

        self.http
            .create_reaction(
                ChannelId::new(message.channel_id),
                MessageId::new(message.message_id),
                &reaction,
            )
            .await
            .map_err(|source| {
                // Reactions are cosmetic; callers only ever log this.
                warn!(?source, "failed to add flag reaction");
                map_err(source, "react to message")
            })
    }
}
