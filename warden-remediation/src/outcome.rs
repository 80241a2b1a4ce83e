use warden_gateway::GatewayError;

/// Remediation actions an error can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationAction {
    SuppressEmbeds,
    SendNotice,
    React,
    ListChannels,
    ScanChannel,
    DeleteMessage,
    MuteUser,
}

impl RemediationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RemediationAction::SuppressEmbeds => "suppress_embeds",
            RemediationAction::SendNotice => "send_notice",
            RemediationAction::React => "react",
            RemediationAction::ListChannels => "list_channels",
            RemediationAction::ScanChannel => "scan_channel",
            RemediationAction::DeleteMessage => "delete_message",
            RemediationAction::MuteUser => "mute_user",
        }
    }
}

/// One captured failure: which action failed and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationError {
    pub action: RemediationAction,
    pub cause: GatewayError,
}

/// Terminal report of one incident. Accumulated across stages; errors never
/// short-circuit, so a partial outcome still carries every count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub user_id: u64,
    pub suppressed: bool,
    pub deleted_count: u64,
    pub mute_applied: bool,
    pub errors: Vec<RemediationError>,
}

impl RemediationOutcome {
    pub(crate) fn new(user_id: u64) -> Self {
        Self {
            user_id,
            suppressed: false,
            deleted_count: 0,
            mute_applied: false,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, action: RemediationAction, cause: GatewayError) {
        self.errors.push(RemediationError { action, cause });
    }

    /// Whether any stage reported an error.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any remediation was attempted or failed; quiet outcomes are
    /// not worth an operator report.
    pub fn is_noteworthy(&self) -> bool {
        self.suppressed || self.deleted_count > 0 || self.mute_applied || self.is_partial()
    }

    /// One-line operator summary.
    pub fn summary(&self) -> String {
        format!(
            "user {}: suppressed={} deleted={} muted={} errors={}",
            self.user_id,
            self.suppressed,
            self.deleted_count,
            self.mute_applied,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{RemediationAction, RemediationOutcome};
    use warden_gateway::GatewayError;

    #[test]
    fn summary_reflects_counts() {
        let mut outcome = RemediationOutcome::new(7);
        outcome.deleted_count = 3;
        outcome.mute_applied = true;
        outcome.record(
            RemediationAction::DeleteMessage,
            GatewayError::PermissionDenied("delete message".to_owned()),
        );

        assert!(outcome.is_partial());
        assert!(outcome.is_noteworthy());
        assert_eq!(
            outcome.summary(),
            "user 7: suppressed=false deleted=3 muted=true errors=1"
        );
    }

    #[test]
    fn quiet_outcome_is_not_noteworthy() {
        assert!(!RemediationOutcome::new(7).is_noteworthy());
    }
}
