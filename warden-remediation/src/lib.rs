//! Remediation half of the engine: the per-incident state machine driving
//! suppression, bounded bulk deletion, and timed muting through the platform
//! gateway, with duplicate-incident cooldown and accumulated outcomes.

/// Duplicate-incident suppression ledger.
pub mod cooldown;
/// The incident state machine.
pub mod orchestrator;
/// Terminal incident reports.
pub mod outcome;

pub use cooldown::CooldownLedger;
pub use orchestrator::Orchestrator;
pub use outcome::{RemediationAction, RemediationError, RemediationOutcome};
