use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

/// Sentinel marking an incident still in flight.
const IN_FLIGHT: u64 = u64::MAX;

/// Per-user ledger preventing duplicate remediation: one entry per user,
/// either in-flight or cooling down until a deadline.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    entries: RwLock<HashMap<u64, u64>>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the user for a new incident. Returns `false` while an incident
    /// for the same user is in flight or within its cooldown.
    pub async fn try_begin(&self, user_id: u64, now_secs: u64) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&user_id) {
            Some(&until) if until > now_secs => false,
            _ => {
                entries.insert(user_id, IN_FLIGHT);
                true
            }
        }
    }

    /// Mark the user's incident complete and start the cooldown clock.
    pub async fn complete(&self, user_id: u64, now_secs: u64, cooldown: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(user_id, now_secs.saturating_add(cooldown.as_secs()));
    }

    /// Drop expired entries. Returns the number removed.
    pub async fn sweep_expired(&self, now_secs: u64) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, &mut until| until > now_secs);
        before - entries.len()
    }
}
