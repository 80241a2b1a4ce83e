mod events;

use std::env;
use std::sync::Arc;

use serenity::all::{Client, Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use tracing::{debug, info};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use warden_core::RemediationConfig;
use warden_detector::Detector;
use warden_remediation::Orchestrator;
use warden_utils::formatting::format_compact_duration;
use warden_utils::time::now_unix_secs;

/// Shared engine state: immutable policy plus the detection and remediation
/// halves of the pipeline.
pub struct EngineState {
    pub config: Arc<RemediationConfig>,
    pub detector: Detector,
    pub orchestrator: Orchestrator,
}

struct Handler {
    state: Arc<EngineState>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "warden connected");
    }

    async fn message(&self, ctx: Context, message: Message) {
        events::moderation::handle_message(&ctx, &self.state, &message).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Load the .env file
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN")?;
    let config = Arc::new(RemediationConfig::from_env()?);

    info!(
        threshold = config.message_threshold,
        window = %format_compact_duration(config.window.as_secs()),
        mute = %format_compact_duration(config.mute_duration.as_secs()),
        "remediation policy loaded"
    );

    let state = Arc::new(EngineState {
        config: config.clone(),
        detector: Detector::new(config.clone()),
        orchestrator: Orchestrator::new(config.clone()),
    });

    // Periodically evict idle user windows and expired cooldown entries;
    // all detector state is process-memory only and resets on restart.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_state.config.window_idle_eviction);
        loop {
            ticker.tick().await;
            let now_secs = now_unix_secs();
            let evicted = sweep_state.detector.sweep_idle(now_secs).await;
            let expired = sweep_state.orchestrator.sweep_expired(now_secs).await;
            if evicted > 0 || expired > 0 {
                debug!(evicted, expired, "swept idle windows and expired cooldowns");
            }
        }
    });

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    info!("warden is connecting...");

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler { state })
        .await?;

    client.start().await?;
    Ok(())
}
