use std::time::Duration;

use warden_core::{EmbedRule, MessageEvent};

/// Count URL-like substrings: a scheme prefix opening a non-whitespace run.
/// Independent of the embed count.
pub fn count_links(text: &str) -> usize {
    const SCHEMES: [&str; 2] = ["http://", "https://"];

    let lower = text.to_lowercase();
    SCHEMES
        .iter()
        .map(|scheme| {
            lower
                .match_indices(scheme)
                .filter(|(start, _)| {
                    lower[start + scheme.len()..]
                        .chars()
                        .next()
                        .is_some_and(|ch| !ch.is_whitespace())
                })
                .count()
        })
        .sum()
}

/// True when the message satisfies the active embed rule: at least
/// `min_embeds` embeds and at least `min_links` links.
pub fn exceeds_embed_rule(event: &MessageEvent, rule: EmbedRule) -> bool {
    event.embed_count >= rule.min_embeds && event.link_count >= rule.min_links
}

/// True when the author joined within `content_window` and the message
/// carries a suspicious pattern: any URL, or any configured keyword
/// (case-insensitive).
pub fn is_new_account_risky_content(
    event: &MessageEvent,
    now_secs: u64,
    content_window: Duration,
    keywords: &[String],
) -> bool {
    let joined_recently = event
        .account_age_secs(now_secs)
        .is_some_and(|age| age <= content_window.as_secs());
    if !joined_recently {
        return false;
    }

    if event.link_count > 0 {
        return true;
    }

    let content_lower = event.content.to_lowercase();
    keywords
        .iter()
        .any(|keyword| content_lower.contains(keyword.as_str()))
}
