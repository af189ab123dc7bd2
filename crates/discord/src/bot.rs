//! Bot assembly and gateway lifecycle.

use std::{sync::Arc, time::Duration};

use {
    hinata_channels::RoutingPolicy,
    hinata_chat::ConversationSession,
    hinata_common::{AuditEvent, AuditRegistry},
    hinata_config::{HinataConfig, secret_value},
    hinata_media::{GenerationDispatcher, QuickImageProvider},
    serenity::{Client, all::ChannelId},
    tokio::task::JoinHandle,
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    handler::{BotState, HinataHandler},
    log_sink::{ChannelTarget, DiscordLogSink, LogForwarder},
};

/// How long shutdown waits for queued log embeds to drain.
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A configured bot, ready to connect.
pub struct Bot {
    token: String,
    state: Arc<BotState>,
    log: Option<(ChannelId, LogForwarder)>,
}

impl Bot {
    /// Wire providers, conversation state and audit sinks from configuration.
    pub fn build(config: &HinataConfig) -> Result<Self> {
        let token = secret_value(config.discord.token.as_ref())
            .ok_or(Error::MissingToken)?
            .to_string();

        let mut registry = AuditRegistry::tracing();
        let mut log = None;
        if let Some(channel_id) = config.discord.log_channel_id.filter(|id| *id != 0) {
            let (sink, forwarder) = DiscordLogSink::new();
            registry = registry.with_sink(Arc::new(sink));
            log = Some((ChannelId::new(channel_id), forwarder));
        }
        let audit = Arc::new(registry);

        let dispatcher =
            GenerationDispatcher::from_config(&config.generation)?.with_audit(Arc::clone(&audit));
        let session = ConversationSession::from_config(&config.chat).with_audit(Arc::clone(&audit));

        let state = BotState {
            prefix: config.discord.command_prefix.clone(),
            dispatcher: Arc::new(dispatcher),
            quick: QuickImageProvider::from_config(&config.generation),
            session: Arc::new(session),
            policy: RoutingPolicy::from(&config.routing),
            audit,
            video_enabled: config.generation.video_enabled,
        };

        Ok(Self {
            token,
            state: Arc::new(state),
            log,
        })
    }

    #[must_use]
    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Connect to the gateway and serve until the client stops or Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let Self { token, state, log } = self;
        let audit = Arc::clone(&state.audit);

        let mut client = Client::builder(&token, HinataHandler::intents())
            .event_handler(HinataHandler::new(state))
            .await?;

        let forwarder: Option<JoinHandle<()>> = log.map(|(channel, forwarder)| {
            info!(channel_id = channel.get(), "mirroring audit events to log channel");
            let target = ChannelTarget {
                http: Arc::clone(&client.http),
                channel,
            };
            tokio::spawn(forwarder.run(target))
        });

        let shard_manager = Arc::clone(&client.shard_manager);
        let outcome = tokio::select! {
            result = client.start() => result.map_err(Error::from),
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                audit
                    .deliver(&AuditEvent::Lifecycle {
                        started: false,
                        guilds: 0,
                    })
                    .await;
                shard_manager.shutdown_all().await;
                Ok(())
            },
        };

        // Dropping the client and registry closes the log queue.
        drop(client);
        drop(audit);
        if let Some(handle) = forwarder
            && tokio::time::timeout(LOG_DRAIN_TIMEOUT, handle).await.is_err()
        {
            warn!("log forwarder did not drain before shutdown");
        }
        outcome
    }
}
