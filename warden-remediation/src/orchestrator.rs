use std::sync::Arc;

use tracing::{error, info, warn};

use warden_core::RemediationConfig;
use warden_detector::{ContentReason, Incident};
use warden_gateway::{Gateway, MessageRef, ReactionGlyph};
use warden_utils::formatting::format_compact_duration;

use crate::cooldown::CooldownLedger;
use crate::outcome::{RemediationAction, RemediationOutcome};

/// Drives one incident through its fixed stage order:
/// suppress (content flags) → delete → mute (rate flags) → terminal outcome.
///
/// Stages are independent remediations; an error in one is captured into the
/// outcome and never forfeits the others. Every incident reaches a terminal
/// outcome.
pub struct Orchestrator {
    config: Arc<RemediationConfig>,
    cooldowns: CooldownLedger,
}

impl Orchestrator {
    pub fn new(config: Arc<RemediationConfig>) -> Self {
        Self {
            config,
            cooldowns: CooldownLedger::new(),
        }
    }

    pub async fn remediate(&self, gateway: &dyn Gateway, incident: &Incident) -> RemediationOutcome {
        let mut outcome = RemediationOutcome::new(incident.user_id);
        let now_secs = incident.detected_at_secs;

        if let Some(reason) = incident.content {
            self.suppress_stage(gateway, incident, reason, &mut outcome)
                .await;
        }

        if incident.rate.is_some() {
            if self.cooldowns.try_begin(incident.user_id, now_secs).await {
                self.delete_stage(gateway, incident, &mut outcome).await;
                self.mute_stage(gateway, incident, &mut outcome).await;
                self.cooldowns
                    .complete(incident.user_id, now_secs, self.config.remediation_cooldown)
                    .await;
            } else {
                info!(
                    user_id = incident.user_id,
                    "repeat detection within cooldown; skipping remediation"
                );
            }
        }

        self.report(gateway, incident, &outcome).await;
        outcome
    }

    /// Drop expired cooldown entries. Called from a background sweep so the
    /// ledger never grows unbounded across a long-lived process.
    pub async fn sweep_expired(&self, now_secs: u64) -> usize {
        self.cooldowns.sweep_expired(now_secs).await
    }

    /// Hide the offending content, tell the channel, and mark the message.
    /// Every failure here is non-fatal to the later stages.
    async fn suppress_stage(
        &self,
        gateway: &dyn Gateway,
        incident: &Incident,
        reason: ContentReason,
        outcome: &mut RemediationOutcome,
    ) {
        let message = MessageRef::new(incident.channel_id, incident.message_id);

        match gateway.suppress_embeds(message).await {
            Ok(()) => outcome.suppressed = true,
            // The message vanished before we got to it; nothing left to hide.
            Err(cause) if cause.is_not_found() => outcome.suppressed = true,
            Err(cause) => {
                warn!(?cause, message_id = incident.message_id, "embed suppression failed");
                outcome.record(RemediationAction::SuppressEmbeds, cause);
            }
        }

        let notice = notice_text(reason, incident.user_id);
        if let Err(cause) = gateway
            .send_notice(incident.channel_id, &notice, Some(self.config.notice_ttl))
            .await
        {
            if !cause.is_not_found() {
                warn!(?cause, channel_id = incident.channel_id, "notice failed");
                outcome.record(RemediationAction::SendNotice, cause);
            }
        }

        let glyph = self.flag_glyph(gateway, incident.guild_id).await;
        if let Err(cause) = gateway.react_to_message(message, &glyph).await {
            if !cause.is_not_found() {
                outcome.record(RemediationAction::React, cause);
            }
        }
    }

    async fn flag_glyph(&self, gateway: &dyn Gateway, guild_id: u64) -> ReactionGlyph {
        let Some(name) = &self.config.flag_emoji else {
            return ReactionGlyph::fallback();
        };

        match gateway.find_emoji(guild_id, name).await {
            Ok(Some(glyph)) => glyph,
            Ok(None) => ReactionGlyph::fallback(),
            Err(cause) => {
                warn!(?cause, emoji = %name, "emoji lookup failed; using fallback glyph");
                ReactionGlyph::fallback()
            }
        }
    }

    /// Bounded best-effort deletion across the guild's channels. Per-channel
    /// failures are recorded and never abort the scan of the rest.
    async fn delete_stage(
        &self,
        gateway: &dyn Gateway,
        incident: &Incident,
        outcome: &mut RemediationOutcome,
    ) {
        let channels = match gateway.list_channels(incident.guild_id).await {
            Ok(channels) => channels,
            Err(cause) => {
                error!(?cause, guild_id = incident.guild_id, "channel listing failed");
                outcome.record(RemediationAction::ListChannels, cause);
                return;
            }
        };

        for channel in channels.iter().take(self.config.scan_channel_limit) {
            let messages = match gateway
                .list_recent_messages(channel.channel_id, self.config.scan_message_limit)
                .await
            {
                Ok(messages) => messages,
                Err(cause) => {
                    if !cause.is_not_found() {
                        warn!(?cause, channel_id = channel.channel_id, "channel scan failed");
                        outcome.record(RemediationAction::ScanChannel, cause);
                    }
                    continue;
                }
            };

            for meta in messages
                .iter()
                .filter(|meta| meta.author_id == incident.user_id)
            {
                match gateway.delete_message(meta.message).await {
                    Ok(()) => outcome.deleted_count += 1,
                    // Already gone counts for nothing either way.
                    Err(cause) if cause.is_not_found() => {}
                    Err(cause) if cause.is_permission_denied() => {
                        warn!(
                            channel_id = channel.channel_id,
                            "missing permission to delete in channel; skipping its remaining messages"
                        );
                        outcome.record(RemediationAction::DeleteMessage, cause);
                        break;
                    }
                    Err(cause) => {
                        outcome.record(RemediationAction::DeleteMessage, cause);
                    }
                }
            }
        }
    }

    /// Apply the fixed-duration mute. Permission failure is terminal and
    /// reported, never retried: muting needs a privilege the bot may
    /// legitimately lack.
    async fn mute_stage(
        &self,
        gateway: &dyn Gateway,
        incident: &Incident,
        outcome: &mut RemediationOutcome,
    ) {
        let until_secs = incident
            .detected_at_secs
            .saturating_add(self.config.mute_duration.as_secs());

        match gateway
            .mute_user(incident.guild_id, incident.user_id, until_secs)
            .await
        {
            Ok(()) => {
                outcome.mute_applied = true;
                info!(
                    user_id = incident.user_id,
                    duration = %format_compact_duration(self.config.mute_duration.as_secs()),
                    "muted user for spam"
                );
            }
            Err(cause) if cause.is_permission_denied() => {
                warn!(
                    user_id = incident.user_id,
                    "missing permission to mute (check role hierarchy)"
                );
                outcome.record(RemediationAction::MuteUser, cause);
            }
            // The user left before the mute landed.
            Err(cause) if cause.is_not_found() => {}
            Err(cause) => {
                error!(?cause, user_id = incident.user_id, "mute request failed");
                outcome.record(RemediationAction::MuteUser, cause);
            }
        }
    }

    /// Operator-facing log line per outcome, plus a post to the configured
    /// log channel when there is one.
    async fn report(&self, gateway: &dyn Gateway, incident: &Incident, outcome: &RemediationOutcome) {
        info!(
            user_id = outcome.user_id,
            guild_id = incident.guild_id,
            suppressed = outcome.suppressed,
            deleted = outcome.deleted_count,
            muted = outcome.mute_applied,
            errors = outcome.errors.len(),
            "incident outcome"
        );

        if !outcome.is_noteworthy() {
            return;
        }

        let Some(log_channel_name) = &self.config.log_channel_name else {
            return;
        };

        let channels = match gateway.list_channels(incident.guild_id).await {
            Ok(channels) => channels,
            Err(cause) => {
                warn!(?cause, "could not resolve log channel");
                return;
            }
        };

        let Some(channel) = channels
            .iter()
            .find(|channel| channel.name == *log_channel_name)
        else {
            warn!(channel = %log_channel_name, "log channel not found in guild");
            return;
        };

        let text = format!("Remediation outcome: {}", outcome.summary());
        if let Err(cause) = gateway.send_notice(channel.channel_id, &text, None).await {
            warn!(?cause, "failed to post outcome to log channel");
        }
    }
}

fn notice_text(reason: ContentReason, user_id: u64) -> String {
    match reason {
        ContentReason::ExcessiveEmbeds { .. } => format!(
            "<@{user_id}>, multiple embeds aren't allowed. They've been removed."
        ),
        ContentReason::NewAccountRiskyContent => format!(
            "<@{user_id}>, links and giveaways from brand-new accounts are restricted here."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::Orchestrator;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use warden_core::RemediationConfig;
    use warden_detector::{ContentReason, Incident, RateStats};
    use warden_gateway::{
        ChannelInfo, Gateway, GatewayError, MessageMeta, MessageRef, ReactionGlyph,
    };

    use crate::outcome::RemediationAction;

    const NOW: u64 = 50_000;
    const USER: u64 = 42;
    const GUILD: u64 = 9;

    /// Scripted gateway double: per-channel message fixtures plus switchable
    /// failure injection, recording every destructive call.
    #[derive(Default)]
    struct MockGateway {
        channels: Vec<ChannelInfo>,
        messages: HashMap<u64, Vec<MessageMeta>>,
        deny_scan: HashSet<u64>,
        deny_delete: HashSet<u64>,
        vanished: HashSet<u64>,
        deny_suppress: bool,
        deny_mute: bool,
        deleted: Mutex<Vec<MessageRef>>,
        suppressed: Mutex<Vec<MessageRef>>,
        mute_calls: Mutex<Vec<(u64, u64)>>,
        notices: Mutex<Vec<(u64, String)>>,
        reactions: Mutex<Vec<(MessageRef, ReactionGlyph)>>,
    }

    impl MockGateway {
        fn with_channels(channel_ids: &[u64]) -> Self {
            Self {
                channels: channel_ids
                    .iter()
                    .map(|&id| ChannelInfo {
                        channel_id: id,
                        name: format!("channel-{id}"),
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn seed_messages(&mut self, channel_id: u64, authored: &[(u64, u64)]) {
            self.messages.insert(
                channel_id,
                authored
                    .iter()
                    .map(|&(message_id, author_id)| MessageMeta {
                        message: MessageRef::new(channel_id, message_id),
                        author_id,
                    })
                    .collect(),
            );
        }

        fn deleted_count(&self) -> usize {
            self.deleted.lock().unwrap().len()
        }

        fn mute_count(&self) -> usize {
            self.mute_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn suppress_embeds(&self, message: MessageRef) -> Result<(), GatewayError> {
            if self.deny_suppress {
                return Err(GatewayError::PermissionDenied("suppress".to_owned()));
            }
            self.suppressed.lock().unwrap().push(message);
            Ok(())
        }

        async fn send_notice(
            &self,
            channel_id: u64,
            text: &str,
            _ttl: Option<Duration>,
        ) -> Result<(), GatewayError> {
            self.notices
                .lock()
                .unwrap()
                .push((channel_id, text.to_owned()));
            Ok(())
        }

        async fn delete_message(&self, message: MessageRef) -> Result<(), GatewayError> {
            if self.deny_delete.contains(&message.channel_id) {
                return Err(GatewayError::PermissionDenied("delete".to_owned()));
            }
            if self.vanished.contains(&message.message_id) {
                return Err(GatewayError::NotFound("delete".to_owned()));
            }
            self.deleted.lock().unwrap().push(message);
            Ok(())
        }

        async fn list_recent_messages(
            &self,
            channel_id: u64,
            _limit: u16,
        ) -> Result<Vec<MessageMeta>, GatewayError> {
            if self.deny_scan.contains(&channel_id) {
                return Err(GatewayError::PermissionDenied("scan".to_owned()));
            }
            Ok(self.messages.get(&channel_id).cloned().unwrap_or_default())
        }

        async fn list_channels(&self, _guild_id: u64) -> Result<Vec<ChannelInfo>, GatewayError> {
            Ok(self.channels.clone())
        }

        async fn mute_user(
            &self,
            _guild_id: u64,
            user_id: u64,
            until_unix_secs: u64,
        ) -> Result<(), GatewayError> {
            self.mute_calls
                .lock()
                .unwrap()
                .push((user_id, until_unix_secs));
            if self.deny_mute {
                return Err(GatewayError::PermissionDenied("mute".to_owned()));
            }
            Ok(())
        }

        async fn find_emoji(
            &self,
            _guild_id: u64,
            _name: &str,
        ) -> Result<Option<ReactionGlyph>, GatewayError> {
            Ok(None)
        }

        async fn react_to_message(
            &self,
            message: MessageRef,
            glyph: &ReactionGlyph,
        ) -> Result<(), GatewayError> {
            self.reactions
                .lock()
                .unwrap()
                .push((message, glyph.clone()));
            Ok(())
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Arc::new(RemediationConfig::default()))
    }

    fn rate_incident(detected_at_secs: u64) -> Incident {
        Incident {
            guild_id: GUILD,
            channel_id: 100,
            message_id: 1_000,
            user_id: USER,
            detected_at_secs,
            content: None,
            rate: Some(RateStats {
                count: 5,
                threshold: 5,
            }),
        }
    }

    fn content_incident() -> Incident {
        Incident {
            content: Some(ContentReason::ExcessiveEmbeds { embeds: 2, links: 0 }),
            rate: None,
            ..rate_incident(NOW)
        }
    }

    #[tokio::test]
    async fn partial_delete_failure_still_mutes_and_reports_both() {
        let mut gateway = MockGateway::with_channels(&[100, 200]);
        gateway.seed_messages(100, &[(1, USER), (2, USER)]);
        gateway.seed_messages(200, &[(3, USER), (4, 777), (5, USER)]);
        gateway.deny_delete.insert(100);

        let outcome = orchestrator()
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        // Channel 200's deletions land even though channel 100 was denied.
        assert_eq!(outcome.deleted_count, 2);
        assert_eq!(gateway.deleted_count(), 2);
        assert!(outcome.errors.iter().any(|error| {
            error.action == RemediationAction::DeleteMessage
                && error.cause.is_permission_denied()
        }));
        // Mute is still attempted after the delete stage reported errors.
        assert_eq!(gateway.mute_count(), 1);
        assert!(outcome.mute_applied);
    }

    #[tokio::test]
    async fn scan_failure_in_one_channel_does_not_abort_the_rest() {
        let mut gateway = MockGateway::with_channels(&[100, 200]);
        gateway.deny_scan.insert(100);
        gateway.seed_messages(200, &[(3, USER)]);

        let outcome = orchestrator()
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        assert_eq!(outcome.deleted_count, 1);
        assert!(outcome
            .errors
            .iter()
            .any(|error| error.action == RemediationAction::ScanChannel));
    }

    #[tokio::test]
    async fn vanished_messages_are_success_equivalent() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER), (2, USER)]);
        gateway.vanished.insert(1);

        let outcome = orchestrator()
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        assert_eq!(outcome.deleted_count, 1);
        assert!(outcome
            .errors
            .iter()
            .all(|error| error.action != RemediationAction::DeleteMessage));
    }

    #[tokio::test]
    async fn repeat_detection_within_cooldown_is_suppressed() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);

        let orchestrator = orchestrator();
        let first = orchestrator.remediate(&gateway, &rate_incident(NOW)).await;
        assert_eq!(first.deleted_count, 1);
        assert_eq!(gateway.mute_count(), 1);

        // Seed a fresh message; the repeat detection must not touch it.
        gateway.seed_messages(100, &[(9, USER)]);
        let second = orchestrator
            .remediate(&gateway, &rate_incident(NOW + 60))
            .await;

        assert_eq!(second.deleted_count, 0);
        assert!(!second.mute_applied);
        assert_eq!(gateway.deleted_count(), 1);
        assert_eq!(gateway.mute_count(), 1);
    }

    #[tokio::test]
    async fn detection_after_cooldown_expiry_runs_again() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);

        let orchestrator = orchestrator();
        orchestrator.remediate(&gateway, &rate_incident(NOW)).await;

        let later = NOW + RemediationConfig::default().remediation_cooldown.as_secs() + 1;
        let outcome = orchestrator
            .remediate(&gateway, &rate_incident(later))
            .await;

        assert!(outcome.mute_applied);
        assert_eq!(gateway.mute_count(), 2);
    }

    #[tokio::test]
    async fn completed_incident_cooldown_is_swept_after_expiry() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);

        let orchestrator = orchestrator();
        orchestrator.remediate(&gateway, &rate_incident(NOW)).await;

        let cooldown = RemediationConfig::default().remediation_cooldown.as_secs();
        assert_eq!(orchestrator.sweep_expired(NOW + cooldown - 1).await, 0);
        assert_eq!(orchestrator.sweep_expired(NOW + cooldown).await, 1);

        // The swept user can be remediated again immediately.
        let outcome = orchestrator
            .remediate(&gateway, &rate_incident(NOW + cooldown))
            .await;
        assert!(outcome.mute_applied);
    }

    #[tokio::test]
    async fn content_only_incident_suppresses_without_deleting_or_muting() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);

        let outcome = orchestrator().remediate(&gateway, &content_incident()).await;

        assert!(outcome.suppressed);
        assert_eq!(gateway.suppressed.lock().unwrap().len(), 1);
        assert_eq!(gateway.notices.lock().unwrap().len(), 1);
        assert_eq!(gateway.reactions.lock().unwrap().len(), 1);
        assert_eq!(gateway.deleted_count(), 0);
        assert_eq!(gateway.mute_count(), 0);
    }

    #[tokio::test]
    async fn suppression_failure_does_not_block_later_stages() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);
        gateway.deny_suppress = true;

        let incident = Incident {
            content: Some(ContentReason::NewAccountRiskyContent),
            ..rate_incident(NOW)
        };
        let outcome = orchestrator().remediate(&gateway, &incident).await;

        assert!(!outcome.suppressed);
        assert!(outcome
            .errors
            .iter()
            .any(|error| error.action == RemediationAction::SuppressEmbeds));
        assert_eq!(outcome.deleted_count, 1);
        assert!(outcome.mute_applied);
    }

    #[tokio::test]
    async fn mute_permission_failure_is_reported_not_retried() {
        let mut gateway = MockGateway::with_channels(&[100]);
        gateway.seed_messages(100, &[(1, USER)]);
        gateway.deny_mute = true;

        let outcome = orchestrator()
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        assert!(!outcome.mute_applied);
        assert_eq!(gateway.mute_count(), 1);
        assert!(outcome.errors.iter().any(|error| {
            error.action == RemediationAction::MuteUser && error.cause.is_permission_denied()
        }));
        // Deletion still counted despite the failed mute.
        assert_eq!(outcome.deleted_count, 1);
    }

    #[tokio::test]
    async fn channel_scan_respects_the_configured_cap() {
        let config = RemediationConfig {
            scan_channel_limit: 1,
            ..RemediationConfig::default()
        };
        let mut gateway = MockGateway::with_channels(&[100, 200]);
        gateway.seed_messages(100, &[(1, USER)]);
        gateway.seed_messages(200, &[(2, USER)]);

        let outcome = Orchestrator::new(Arc::new(config))
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        assert_eq!(outcome.deleted_count, 1);
    }

    #[tokio::test]
    async fn outcome_is_posted_to_the_log_channel_when_configured() {
        let config = RemediationConfig {
            log_channel_name: Some("channel-200".to_owned()),
            ..RemediationConfig::default()
        };
        let mut gateway = MockGateway::with_channels(&[100, 200]);
        gateway.seed_messages(100, &[(1, USER)]);

        Orchestrator::new(Arc::new(config))
            .remediate(&gateway, &rate_incident(NOW))
            .await;

        let notices = gateway.notices.lock().unwrap();
        assert!(notices
            .iter()
            .any(|(channel_id, text)| *channel_id == 200 && text.contains("deleted=1")));
    }
}
