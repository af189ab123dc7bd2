//! Mirrors audit events into a Discord log channel.
//!
//! [`DiscordLogSink::record`] only enqueues; a [`LogForwarder`] task owns the
//! HTTP side and drains the queue in order. Send failures are logged and
//! dropped.

use std::sync::Arc;

use {
    async_trait::async_trait,
    hinata_common::{AuditEvent, AuditSink},
    serenity::all::{ChannelId, CreateEmbed, CreateMessage, Http},
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use crate::embeds;

/// Whether an event is worth a log-channel message. Per-attempt dispatch
/// records stay in tracing only.
#[must_use]
pub fn mirrors(event: &AuditEvent) -> bool {
    !matches!(event, AuditEvent::DispatchAttempt { .. })
}

pub struct DiscordLogSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl DiscordLogSink {
    /// Sink plus the forwarder that must be spawned to deliver its events.
    #[must_use]
    pub fn new() -> (Self, LogForwarder) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, LogForwarder { rx })
    }
}

#[async_trait]
impl AuditSink for DiscordLogSink {
    fn name(&self) -> &str {
        "discord-log"
    }

    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        if mirrors(event) {
            self.tx
                .send(event.clone())
                .map_err(|_| anyhow::anyhow!("discord log forwarder has stopped"))?;
        }
        Ok(())
    }
}

/// Where rendered log embeds go.
#[async_trait]
pub trait LogTarget: Send + Sync {
    async fn send(&self, embed: CreateEmbed) -> anyhow::Result<()>;
}

/// A text channel reached through the bot's HTTP client.
pub struct ChannelTarget {
    pub http: Arc<Http>,
    pub channel: ChannelId,
}

#[async_trait]
impl LogTarget for ChannelTarget {
    async fn send(&self, embed: CreateEmbed) -> anyhow::Result<()> {
        self.channel
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

pub struct LogForwarder {
    rx: mpsc::UnboundedReceiver<AuditEvent>,
}

impl LogForwarder {
    /// Drain until every sink handle is dropped.
    pub async fn run(mut self, target: impl LogTarget) {
        while let Some(event) = self.rx.recv().await {
            debug!(label = event.label(), "mirroring audit event");
            if let Err(e) = target.send(embeds::audit(&event)).await {
                warn!(error = %e, label = event.label(), "failed to send log message");
            }
        }
        debug!("discord log forwarder stopped");
    }
}
