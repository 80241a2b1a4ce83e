//! Detection half of the engine: event normalization, per-user sliding
//! windows, and stateless content risk rules, composed into one `Detector`
//! that turns a message event into at most one [`Incident`].

/// Stateless content risk predicates.
pub mod content;
/// Raw-event to canonical-event conversion.
pub mod normalize;
/// Per-user sliding-window burst tracking.
pub mod tracker;

use std::sync::Arc;

use tracing::info;

use warden_core::{MessageEvent, RemediationConfig};

pub use normalize::normalize;
pub use tracker::SlidingWindowTracker;

/// Why a message was flagged on content alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentReason {
    /// The active embed rule matched.
    ExcessiveEmbeds { embeds: usize, links: usize },
    /// Suspicious content from a newly-joined account.
    NewAccountRiskyContent,
}

/// Rate signal details for a flagged burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStats {
    pub count: usize,
    pub threshold: u64,
}

/// One detected violation for one user at one point in time. Content and
/// rate are independent signals; either alone is enough for an incident.
#[derive(Debug, Clone)]
pub struct Incident {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub detected_at_secs: u64,
    pub content: Option<ContentReason>,
    pub rate: Option<RateStats>,
}

/// Canonical detection pipeline: content evaluator + sliding-window tracker
/// behind one `assess` call. Owns all per-user window state.
#[derive(Debug)]
pub struct Detector {
    config: Arc<RemediationConfig>,
    tracker: SlidingWindowTracker,
}

impl Detector {
    pub fn new(config: Arc<RemediationConfig>) -> Self {
        Self {
            config,
            tracker: SlidingWindowTracker::new(),
        }
    }

    /// Feed one event through both signals and report an incident when either
    /// fires. Every event counts toward its author's rate window, including
    /// messages that will be suppressed for content.
    pub async fn assess(&self, event: &MessageEvent, now_secs: u64) -> Option<Incident> {
        let content = self.content_signal(event, now_secs);
        let rate = self.rate_signal(event, now_secs).await;

        if content.is_none() && rate.is_none() {
            return None;
        }

        Some(Incident {
            guild_id: event.guild_id,
            channel_id: event.channel_id,
            message_id: event.message_id,
            user_id: event.user_id,
            detected_at_secs: now_secs,
            content,
            rate,
        })
    }

    fn content_signal(&self, event: &MessageEvent, now_secs: u64) -> Option<ContentReason> {
        if content::exceeds_embed_rule(event, self.config.embed_rule()) {
            return Some(ContentReason::ExcessiveEmbeds {
                embeds: event.embed_count,
                links: event.link_count,
            });
        }

        if content::is_new_account_risky_content(
            event,
            now_secs,
            self.config.new_account_content_window,
            &self.config.suspicious_keywords,
        ) {
            return Some(ContentReason::NewAccountRiskyContent);
        }

        None
    }

    async fn rate_signal(&self, event: &MessageEvent, now_secs: u64) -> Option<RateStats> {
        let (over_threshold, count) = self
            .tracker
            .record_and_check(
                event.user_id,
                event.timestamp_secs,
                self.config.message_threshold,
                self.config.window,
            )
            .await;

        if !over_threshold {
            return None;
        }

        // Rate remediation targets new-account spam only; established
        // accounts get an operator log line and nothing else.
        let within_gate = event
            .account_age_secs(now_secs)
            .is_some_and(|age| age <= self.config.new_account_rate_window.as_secs());
        if !within_gate {
            info!(
                user_id = event.user_id,
                guild_id = event.guild_id,
                count,
                "burst over threshold from established account; log only"
            );
            return None;
        }

        Some(RateStats {
            count,
            threshold: self.config.message_threshold,
        })
    }

    /// Evict idle user windows. Called from a background sweep.
    pub async fn sweep_idle(&self, now_secs: u64) -> usize {
        self.tracker
            .sweep_idle(now_secs, self.config.window_idle_eviction)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentReason, Detector};
    use std::sync::Arc;
    use warden_core::{MessageEvent, RemediationConfig};

    const NOW: u64 = 100_000;

    fn detector() -> Detector {
        Detector::new(Arc::new(RemediationConfig::default()))
    }

    fn event(timestamp_secs: u64, joined_at: Option<u64>) -> MessageEvent {
        MessageEvent {
            message_id: 1,
            channel_id: 2,
            guild_id: 3,
            user_id: 4,
            timestamp_secs,
            content: "hi".to_owned(),
            embed_count: 0,
            link_count: 0,
            author_joined_at_secs: joined_at,
        }
    }

    #[tokio::test]
    async fn burst_from_new_account_raises_rate_incident() {
        let detector = detector();
        let joined = Some(NOW - 600);

        for t in 0..4 {
            assert!(detector.assess(&event(NOW + t, joined), NOW).await.is_none());
        }

        let incident = detector
            .assess(&event(NOW + 4, joined), NOW)
            .await
            .expect("fifth message in window should flag");
        let rate = incident.rate.expect("rate signal expected");
        assert_eq!(rate.count, 5);
        assert!(incident.content.is_none());
    }

    #[tokio::test]
    async fn burst_from_established_account_is_log_only() {
        let detector = detector();
        let joined = Some(NOW - 7_200); // two hours old, outside the gate

        for t in 0..5 {
            let incident = detector.assess(&event(NOW + t, joined), NOW).await;
            assert!(incident.is_none());
        }
    }

    #[tokio::test]
    async fn embed_violation_flags_without_a_burst() {
        let detector = detector();
        let mut message = event(NOW, Some(NOW - 600));
        message.embed_count = 3;

        let incident = detector
            .assess(&message, NOW)
            .await
            .expect("embed rule should flag");
        assert!(matches!(
            incident.content,
            Some(ContentReason::ExcessiveEmbeds { embeds: 3, .. })
        ));
        assert!(incident.rate.is_none());
    }

    #[tokio::test]
    async fn suppressed_content_still_counts_toward_rate_window() {
        let detector = detector();
        let joined = Some(NOW - 600);

        for t in 0..4 {
            let mut message = event(NOW + t, joined);
            message.embed_count = 3;
            let incident = detector.assess(&message, NOW).await.expect("content flag");
            assert!(incident.rate.is_none());
        }

        // Fifth message is clean, but the four suppressed ones already count.
        let incident = detector
            .assess(&event(NOW + 4, joined), NOW)
            .await
            .expect("burst should flag");
        assert!(incident.rate.is_some());
    }

    #[tokio::test]
    async fn risky_content_from_new_account_flags() {
        let detector = detector();
        let mut message = event(NOW, Some(NOW - 60));
        message.content = "claim your free nitro".to_owned();

        let incident = detector.assess(&message, NOW).await.expect("should flag");
        assert_eq!(
            incident.content,
            Some(ContentReason::NewAccountRiskyContent)
        );
    }
}
