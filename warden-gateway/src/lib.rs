//! Platform gateway seam: the capability set the remediation engine consumes,
//! its failure taxonomy, and the Discord-backed implementation. The trait
//! exists so the orchestrator can run against a scripted double in tests.

/// Discord implementation of the gateway.
pub mod discord;
/// Gateway failure taxonomy.
pub mod error;

use std::time::Duration;

use async_trait::async_trait;

pub use discord::DiscordGateway;
pub use error::GatewayError;

/// Glyph used to mark flagged messages when no guild emoji is configured or
/// the configured one is missing.
pub const FALLBACK_FLAG_GLYPH: &str = "\u{1F6AB}";

/// Address of one message on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

impl MessageRef {
    pub fn new(channel_id: u64, message_id: u64) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

/// Minimal per-message data returned by a channel scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageMeta {
    pub message: MessageRef,
    pub author_id: u64,
}

/// One guild channel eligible for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_id: u64,
    pub name: String,
}

/// A reaction emoji: a guild custom emoji or a plain unicode glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionGlyph {
    Custom { id: u64, name: String },
    Unicode(String),
}

impl ReactionGlyph {
    pub fn fallback() -> Self {
        ReactionGlyph::Unicode(FALLBACK_FLAG_GLYPH.to_owned())
    }
}

/// Outbound capability set of the platform gateway. Every call is fallible
/// and may suspend on network I/O; none is retried internally.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Hide embedded content on a message without removing the message.
    async fn suppress_embeds(&self, message: MessageRef) -> Result<(), GatewayError>;

    /// Post a notice to a channel. With a `ttl` the notice auto-expires.
    async fn send_notice(
        &self,
        channel_id: u64,
        text: &str,
        ttl: Option<Duration>,
    ) -> Result<(), GatewayError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError>;

    /// Most recent messages of a channel, newest first, up to `limit`.
    async fn list_recent_messages(
        &self,
        channel_id: u64,
        limit: u16,
    ) -> Result<Vec<MessageMeta>, GatewayError>;

    /// Scannable text channels of a guild.
    async fn list_channels(&self, guild_id: u64) -> Result<Vec<ChannelInfo>, GatewayError>;

    /// Apply a communication timeout until the given unix time.
    async fn mute_user(
        &self,
        guild_id: u64,
        user_id: u64,
        until_unix_secs: u64,
    ) -> Result<(), GatewayError>;

    /// Look up a guild custom emoji by name.
    async fn find_emoji(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<ReactionGlyph>, GatewayError>;

    async fn react_to_message(
        &self,
        message: MessageRef,
        glyph: &ReactionGlyph,
    ) -> Result<(), GatewayError>;
}
