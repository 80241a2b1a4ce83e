/// One inbound message as the platform hands it over, before normalization.
///
/// Fields the platform may omit (guild, member join time) stay optional here;
/// the normalizer decides what to do with them.
#[derive(Debug, Clone)]
pub struct RawMessageEvent {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub user_id: u64,
    pub author_is_bot: bool,
    pub author_is_webhook: bool,
    pub timestamp_secs: u64,
    pub content: String,
    pub embed_count: usize,
    pub author_joined_at_secs: Option<u64>,
}

/// Canonical, normalized message event. Created once per inbound message and
/// discarded after the pipeline runs; never persisted.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub user_id: u64,
    pub timestamp_secs: u64,
    pub content: String,
    pub embed_count: usize,
    pub link_count: usize,
    /// `None` when the platform omitted member data; such authors are treated
    /// as outside every new-account gate.
    pub author_joined_at_secs: Option<u64>,
}

impl MessageEvent {
    /// Account age in seconds at `now_secs`, if the join time is known.
    pub fn account_age_secs(&self, now_secs: u64) -> Option<u64> {
        self.author_joined_at_secs
            .map(|joined| now_secs.saturating_sub(joined))
    }
}
