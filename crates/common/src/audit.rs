//! Audit event fan-out.
//!
//! The generation and conversation cores publish an [`AuditEvent`] for every
//! dispatch attempt and every chat turn. Sinks (tracing, a Discord log
//! channel, ...) are fire-and-forget: a failing sink is logged and eventually
//! circuit-broken, and never affects the caller.

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
};

// ── AuditEvent ──────────────────────────────────────────────────────────────

/// Something the core did that external logging may want to mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// One network attempt against a media provider endpoint.
    DispatchAttempt {
        kind: String,
        endpoint: String,
        tier: String,
        success: bool,
        error: Option<String>,
        elapsed_ms: u64,
    },
    /// Final outcome of a media generation request.
    GenerationFinished {
        kind: String,
        prompt: String,
        success: bool,
        attempts: usize,
    },
    /// A user turn and the reply it produced.
    ChatTurn {
        channel_id: u64,
        user_name: String,
        message: String,
        response_length: usize,
        upstream_ok: bool,
    },
    /// A channel switched between always-respond and mention-only.
    ChannelActivation {
        channel_id: u64,
        activated: bool,
        user_name: Option<String>,
    },
    /// A prefix command was handled.
    Command {
        channel_id: u64,
        user_name: String,
        command: String,
        success: bool,
    },
    /// The gateway connection came up or is going down.
    Lifecycle { started: bool, guilds: usize },
}

impl AuditEvent {
    /// Short label, used as a log title.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::DispatchAttempt { .. } => "Dispatch Attempt",
            Self::GenerationFinished { .. } => "Media Generation",
            Self::ChatTurn { .. } => "Chat Response",
            Self::ChannelActivation { .. } => "Channel Activation",
            Self::Command { .. } => "Command Used",
            Self::Lifecycle { started: true, .. } => "Bot Started",
            Self::Lifecycle { started: false, .. } => "Bot Shutdown",
        }
    }

    /// Whether the event describes a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self {
            Self::DispatchAttempt { success, .. }
            | Self::GenerationFinished { success, .. }
            | Self::Command { success, .. } => !success,
            Self::ChatTurn { upstream_ok, .. } => !upstream_ok,
            Self::ChannelActivation { .. } | Self::Lifecycle { .. } => false,
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DispatchAttempt {
                kind,
                endpoint,
                tier,
                success,
                error,
                elapsed_ms,
            } => {
                write!(f, "{kind} {tier} attempt on {endpoint} ")?;
                match (success, error) {
                    (true, _) => write!(f, "succeeded in {elapsed_ms}ms"),
                    (false, Some(e)) => write!(f, "failed in {elapsed_ms}ms: {e}"),
                    (false, None) => write!(f, "failed in {elapsed_ms}ms"),
                }
            },
            Self::GenerationFinished {
                kind,
                prompt,
                success,
                attempts,
            } => {
                let status = if *success {
                    "Success"
                } else {
                    "Failed"
                };
                write!(
                    f,
                    "{kind} generation {status} after {attempts} attempt(s): {}",
                    truncate(prompt, 200)
                )
            },
            Self::ChatTurn {
                channel_id,
                user_name,
                message,
                response_length,
                ..
            } => write!(
                f,
                "{user_name} in {channel_id}: {} ({response_length} chars replied)",
                truncate(message, 100)
            ),
            Self::ChannelActivation {
                channel_id,
                activated,
                ..
            } => {
                let action = if *activated {
                    "activated"
                } else {
                    "deactivated"
                };
                write!(f, "channel {channel_id} {action}")
            },
            Self::Command {
                user_name,
                command,
                success,
                ..
            } => {
                let status = if *success {
                    "ok"
                } else {
                    "failed"
                };
                write!(f, "{user_name} ran `{}` ({status})", truncate(command, 100))
            },
            Self::Lifecycle { started: true, guilds } => {
                write!(f, "ready in {guilds} server(s)")
            },
            Self::Lifecycle { started: false, .. } => f.write_str("shutting down"),
        }
    }
}

/// Cut `text` to at most `max` characters, appending `...` when shortened.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

// ── AuditSink trait ─────────────────────────────────────────────────────────

/// Receiver of audit events. Errors are swallowed by the registry.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// A human-readable name for this sink.
    fn name(&self) -> &str;

    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Sink that writes every event to `tracing`.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        if event.is_failure() {
            warn!(label = event.label(), "{event}");
        } else {
            info!(label = event.label(), "{event}");
        }
        Ok(())
    }
}

// ── SinkStats ───────────────────────────────────────────────────────────────

/// Per-sink health counters backing the circuit breaker.
#[derive(Default)]
pub struct SinkStats {
    pub delivered: AtomicU64,
    pub failed: AtomicU64,
    pub consecutive_failures: AtomicU64,
    pub disabled: AtomicBool,
    disabled_at: Mutex<Option<Instant>>,
}

impl SinkStats {
    fn record_success(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }
}

struct SinkEntry {
    sink: Arc<dyn AuditSink>,
    stats: Arc<SinkStats>,
}

// ── AuditRegistry ───────────────────────────────────────────────────────────

/// Fans audit events out to every registered sink.
pub struct AuditRegistry {
    entries: Vec<SinkEntry>,
    /// Consecutive failures before a sink is skipped.
    breaker_threshold: u64,
    /// How long a tripped sink stays skipped.
    breaker_cooldown: Duration,
}

impl AuditRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            breaker_threshold: 3,
            breaker_cooldown: Duration::from_secs(60),
        }
    }

    /// Registry with only the tracing sink.
    pub fn tracing() -> Self {
        Self::new().with_sink(Arc::new(TracingAuditSink))
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        debug!(sink = sink.name(), "audit sink registered");
        self.entries.push(SinkEntry {
            sink,
            stats: Arc::new(SinkStats::default()),
        });
        self
    }

    pub fn with_circuit_breaker(mut self, threshold: u64, cooldown: Duration) -> Self {
        self.breaker_threshold = threshold;
        self.breaker_cooldown = cooldown;
        self
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.sink.name()).collect()
    }

    pub fn stats(&self, name: &str) -> Option<Arc<SinkStats>> {
        self.entries
            .iter()
            .find(|e| e.sink.name() == name)
            .map(|e| Arc::clone(&e.stats))
    }

    /// Publish without waiting. Delivery happens on a spawned task.
    pub fn publish(self: &Arc<Self>, event: AuditEvent) {
        if self.entries.is_empty() {
            return;
        }
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.deliver(&event).await;
        });
    }

    /// Deliver to every sink in registration order, absorbing failures.
    pub async fn deliver(&self, event: &AuditEvent) {
        for entry in &self.entries {
            if self.is_tripped(entry) {
                continue;
            }
            match entry.sink.record(event).await {
                Ok(()) => entry.stats.record_success(),
                Err(e) => {
                    entry.stats.record_failure();
                    warn!(sink = entry.sink.name(), error = %e, "audit sink failed");
                },
            }
        }
    }

    fn is_tripped(&self, entry: &SinkEntry) -> bool {
        let stats = &entry.stats;
        if !stats.disabled.load(Ordering::Relaxed) {
            if stats.consecutive_failures.load(Ordering::Relaxed) < self.breaker_threshold {
                return false;
            }
            stats.disabled.store(true, Ordering::Relaxed);
            *stats.disabled_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            warn!(
                sink = entry.sink.name(),
                "audit sink disabled after {} consecutive failures", self.breaker_threshold
            );
            return true;
        }

        let cooled_down = stats
            .disabled_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none_or(|at| at.elapsed() >= self.breaker_cooldown);
        if cooled_down {
            stats.disabled.store(false, Ordering::Relaxed);
            stats.consecutive_failures.store(0, Ordering::Relaxed);
            info!(sink = entry.sink.name(), "audit sink re-enabled");
            return false;
        }
        true
    }
}

impl Default for AuditRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct Recording {
        seen: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Broken {
        calls: AtomicU64,
    }

    #[async_trait]
    impl AuditSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn record(&self, _event: &AuditEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("log channel unreachable")
        }
    }

    fn activation(channel_id: u64) -> AuditEvent {
        AuditEvent::ChannelActivation {
            channel_id,
            activated: true,
            user_name: None,
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_others() {
        let recording = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let registry = AuditRegistry::new()
            .with_sink(Arc::new(Broken {
                calls: AtomicU64::new(0),
            }))
            .with_sink(recording.clone());

        registry.deliver(&activation(7)).await;

        assert_eq!(recording.seen.lock().unwrap().as_slice(), &[activation(7)]);
        let broken = registry.stats("broken").unwrap();
        assert_eq!(broken.failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn circuit_breaker_skips_after_threshold() {
        let broken = Arc::new(Broken {
            calls: AtomicU64::new(0),
        });
        let registry = AuditRegistry::new()
            .with_sink(broken.clone())
            .with_circuit_breaker(2, Duration::from_secs(3600));

        for _ in 0..5 {
            registry.deliver(&activation(1)).await;
        }

        assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
        assert!(registry.stats("broken").unwrap().disabled.load(Ordering::Relaxed));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn failure_classification() {
        let failed = AuditEvent::GenerationFinished {
            kind: "image".into(),
            prompt: "a cat".into(),
            success: false,
            attempts: 4,
        };
        assert!(failed.is_failure());
        assert!(!activation(1).is_failure());
        assert_eq!(
            failed.to_string(),
            "image generation Failed after 4 attempt(s): a cat"
        );
    }
}
