use std::env;
use std::time::Duration;

use anyhow::bail;

use warden_utils::parse::{parse_duration_seconds, parse_keyword_list};

/// Default suspicious-keyword list applied when `SUSPICIOUS_KEYWORDS` is unset.
const DEFAULT_SUSPICIOUS_KEYWORDS: &[&str] = &[
    "free nitro",
    "free robux",
    "steam gift",
    "airdrop",
    "crypto giveaway",
    "discord.gg",
];

/// One embed rule: satisfied when a message carries at least `min_embeds`
/// embeds and at least `min_links` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedRule {
    pub min_embeds: usize,
    pub min_links: usize,
}

/// Policy variants for the embed rule. Which one is active is configuration,
/// not a separate code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedPolicy {
    /// Any message with more than one embed.
    #[default]
    MultipleEmbeds,
    /// Heavy embed walls only: five-or-more embeds carrying three-or-more links.
    EmbedsWithLinks,
}

impl EmbedPolicy {
    pub fn rule(self) -> EmbedRule {
        match self {
            EmbedPolicy::MultipleEmbeds => EmbedRule {
                min_embeds: 2,
                min_links: 0,
            },
            EmbedPolicy::EmbedsWithLinks => EmbedRule {
                min_embeds: 5,
                min_links: 3,
            },
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "multiple-embeds" | "multiple_embeds" => Some(EmbedPolicy::MultipleEmbeds),
            "embeds-with-links" | "embeds_with_links" => Some(EmbedPolicy::EmbedsWithLinks),
            _ => None,
        }
    }
}

/// Static remediation policy. Loaded once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RemediationConfig {
    /// Messages within `window` that count as a burst.
    pub message_threshold: u64,
    /// Sliding-window duration for burst detection.
    pub window: Duration,
    /// Fixed mute length per incident.
    pub mute_duration: Duration,
    /// Accounts older than this never get rate-based remediation (log only).
    pub new_account_rate_window: Duration,
    /// Accounts older than this are exempt from the risky-content rule.
    pub new_account_content_window: Duration,
    /// Lowercased keyword list for the risky-content rule.
    pub suspicious_keywords: Vec<String>,
    pub embed_policy: EmbedPolicy,
    /// After a completed incident, repeat detections for the same user are
    /// dropped for this long.
    pub remediation_cooldown: Duration,
    /// Most recent messages inspected per channel during deletion.
    pub scan_message_limit: u16,
    /// Channels inspected per guild during deletion.
    pub scan_channel_limit: usize,
    /// Pause between history pages, to stay under platform rate limits.
    pub page_delay: Duration,
    /// Lifetime of the transient notice posted on suppression.
    pub notice_ttl: Duration,
    /// Channel name receiving operator-facing outcome summaries, if any.
    pub log_channel_name: Option<String>,
    /// Guild emoji name used to mark suppressed messages.
    pub flag_emoji: Option<String>,
    /// Idle period after which an empty user window is swept.
    pub window_idle_eviction: Duration,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            message_threshold: 5,
            window: Duration::from_secs(5),
            mute_duration: Duration::from_secs(24 * 60 * 60),
            new_account_rate_window: Duration::from_secs(60 * 60),
            new_account_content_window: Duration::from_secs(60 * 60),
            suspicious_keywords: DEFAULT_SUSPICIOUS_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
            embed_policy: EmbedPolicy::MultipleEmbeds,
            remediation_cooldown: Duration::from_secs(10 * 60),
            scan_message_limit: 200,
            scan_channel_limit: 50,
            page_delay: Duration::from_millis(1_100),
            notice_ttl: Duration::from_secs(5),
            log_channel_name: None,
            flag_emoji: None,
            window_idle_eviction: Duration::from_secs(10 * 60),
        }
    }
}

impl RemediationConfig {
    /// Load the policy from the environment, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            message_threshold: env_u64("SPAM_MESSAGE_THRESHOLD", defaults.message_threshold),
            window: env_duration("SPAM_WINDOW", defaults.window),
            mute_duration: env_duration("MUTE_DURATION", defaults.mute_duration),
            new_account_rate_window: env_duration(
                "NEW_ACCOUNT_RATE_WINDOW",
                defaults.new_account_rate_window,
            ),
            new_account_content_window: env_duration(
                "NEW_ACCOUNT_CONTENT_WINDOW",
                defaults.new_account_content_window,
            ),
            suspicious_keywords: match env::var("SUSPICIOUS_KEYWORDS") {
                Ok(raw) => parse_keyword_list(&raw),
                Err(_) => defaults.suspicious_keywords,
            },
            embed_policy: match env::var("EMBED_POLICY") {
                Ok(raw) => match EmbedPolicy::parse(&raw) {
                    Some(policy) => policy,
                    None => bail!(
                        "invalid EMBED_POLICY `{raw}` (expected `multiple-embeds` or `embeds-with-links`)"
                    ),
                },
                Err(_) => defaults.embed_policy,
            },
            remediation_cooldown: env_duration(
                "REMEDIATION_COOLDOWN",
                defaults.remediation_cooldown,
            ),
            scan_message_limit: env_u64("SCAN_MESSAGE_LIMIT", defaults.scan_message_limit as u64)
                .min(u16::MAX as u64) as u16,
            scan_channel_limit: env_u64("SCAN_CHANNEL_LIMIT", defaults.scan_channel_limit as u64)
                as usize,
            page_delay: Duration::from_millis(env_u64(
                "PAGE_DELAY_MS",
                defaults.page_delay.as_millis() as u64,
            )),
            notice_ttl: env_duration("NOTICE_TTL", defaults.notice_ttl),
            log_channel_name: env::var("LOG_CHANNEL_NAME")
                .ok()
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            flag_emoji: env::var("FLAG_EMOJI")
                .ok()
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            window_idle_eviction: env_duration(
                "WINDOW_IDLE_EVICTION",
                defaults.window_idle_eviction,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.message_threshold == 0 {
            bail!("SPAM_MESSAGE_THRESHOLD must be positive");
        }
        if self.window.is_zero() {
            bail!("SPAM_WINDOW must be positive");
        }
        if self.mute_duration.is_zero() {
            bail!("MUTE_DURATION must be positive");
        }
        if self.scan_message_limit == 0 || self.scan_channel_limit == 0 {
            bail!("scan limits must be positive");
        }
        Ok(())
    }

    /// The active embed rule under the configured policy.
    pub fn embed_rule(&self) -> EmbedRule {
        self.embed_policy.rule()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Read a duration env var accepting compact tokens (`30s`, `10m`, `24h`)
/// or plain seconds.
fn env_duration(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(value) => parse_duration_seconds(&value)
            .map(Duration::from_secs)
            .unwrap_or(default),
        Err(_) => default,
    }
}
