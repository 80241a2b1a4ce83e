/// Static remediation policy loaded from the environment.
pub mod config;
/// Canonical message-event model.
pub mod event;

pub use config::{EmbedPolicy, EmbedRule, RemediationConfig};
pub use event::{MessageEvent, RawMessageEvent};
