//! Per-channel activation flags and bounded conversation history.
//!
//! Every channel is either inactive (the bot answers mentions only) or
//! active (it answers every message). History is kept independently of
//! activation and trimmed oldest-first to the configured limit after every
//! append.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use {
    hinata_common::{AuditEvent, AuditRegistry},
    hinata_config::ChatConfig,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    model::ConversationTurn,
    openai_compat::OpenAiCompatProvider,
    provider::{ChatCompletionProvider, CompletionRequest},
};

#[derive(Debug, Default)]
struct ChannelState {
    active: bool,
    history: VecDeque<ConversationTurn>,
}

/// Activation map and transcripts for every channel the bot has seen.
pub struct SessionStore {
    channels: Mutex<HashMap<u64, ChannelState>>,
    limit: usize,
}

impl SessionStore {
    /// `limit` is clamped to at least one turn.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn is_active(&self, channel_id: u64) -> bool {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.get(&channel_id).is_some_and(|c| c.active)
    }

    /// Returns `true` if the channel was inactive before.
    pub fn activate(&self, channel_id: u64) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let state = channels.entry(channel_id).or_default();
        !std::mem::replace(&mut state.active, true)
    }

    /// Marks an active channel inactive and drops its history.
    ///
    /// Returns `true` if the channel was active before. An inactive channel,
    /// including its history, is left unchanged.
    pub fn deactivate(&self, channel_id: u64) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if !channels.get(&channel_id).is_some_and(|c| c.active) {
            return false;
        }
        channels.remove(&channel_id);
        true
    }

    pub fn append_turn(&self, channel_id: u64, turn: ConversationTurn) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let history = &mut channels.entry(channel_id).or_default().history;
        history.push_back(turn);
        while history.len() > self.limit {
            history.pop_front();
        }
    }

    /// Oldest first.
    #[must_use]
    pub fn history(&self, channel_id: u64) -> Vec<ConversationTurn> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .get(&channel_id)
            .map(|c| c.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_channels(&self) -> Vec<u64> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<u64> = channels
            .iter()
            .filter(|(_, c)| c.active)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Model parameters and canned replies for [`ConversationSession`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
    pub unconfigured_reply: String,
    pub failure_reply: String,
}

impl From<&ChatConfig> for ChatSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            unconfigured_reply: config.unconfigured_reply.clone(),
            failure_reply: config.failure_reply.clone(),
        }
    }
}

/// Conversation state plus the upstream provider that answers it.
pub struct ConversationSession {
    store: SessionStore,
    settings: ChatSettings,
    provider: Option<Arc<dyn ChatCompletionProvider>>,
    /// Serialises `respond` per channel so turns land in arrival order.
    turn_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    audit: Option<Arc<AuditRegistry>>,
}

impl ConversationSession {
    /// `provider: None` means chat is not configured; `respond` then
    /// returns [`Error::Configuration`].
    #[must_use]
    pub fn new(
        settings: ChatSettings,
        history_limit: usize,
        provider: Option<Arc<dyn ChatCompletionProvider>>,
    ) -> Self {
        Self {
            store: SessionStore::new(history_limit),
            settings,
            provider,
            turn_locks: Mutex::new(HashMap::new()),
            audit: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Self {
        let provider = OpenAiCompatProvider::from_config(config)
            .map(|p| Arc::new(p) as Arc<dyn ChatCompletionProvider>);
        if provider.is_none() {
            warn!("chat API key not set, chat replies will report missing configuration");
        }
        Self::new(ChatSettings::from(config), config.history_limit, provider)
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditRegistry>) -> Self {
        self.audit = Some(audit);
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn is_active(&self, channel_id: u64) -> bool {
        self.store.is_active(channel_id)
    }

    pub fn activate(&self, channel_id: u64) -> bool {
        let changed = self.store.activate(channel_id);
        if changed {
            info!(channel_id, "channel activated");
        }
        changed
    }

    pub fn deactivate(&self, channel_id: u64) -> bool {
        let changed = self.store.deactivate(channel_id);
        if changed {
            info!(channel_id, "channel deactivated, history cleared");
        }
        changed
    }

    pub fn append_turn(&self, channel_id: u64, turn: ConversationTurn) {
        self.store.append_turn(channel_id, turn);
    }

    #[must_use]
    pub fn history(&self, channel_id: u64) -> Vec<ConversationTurn> {
        self.store.history(channel_id)
    }

    /// System preamble followed by the channel history, oldest first.
    #[must_use]
    pub fn build_context(&self, channel_id: u64) -> Vec<ConversationTurn> {
        std::iter::once(ConversationTurn::system(&self.settings.system_prompt))
            .chain(self.store.history(channel_id))
            .collect()
    }

    /// Record `user_text` from `user_name`, ask the provider once, and
    /// record the reply.
    ///
    /// Upstream failures become the configured failure reply. Only a missing
    /// provider is returned as an error.
    pub async fn respond(&self, user_text: &str, channel_id: u64, user_name: &str) -> Result<String> {
        let Some(provider) = &self.provider else {
            return Err(Error::configuration(&self.settings.unconfigured_reply));
        };

        let lock = self.turn_lock(channel_id);
        let _guard = lock.lock().await;

        self.store
            .append_turn(channel_id, ConversationTurn::user(format!("{user_name}: {user_text}")));
        let context = self.build_context(channel_id);
        debug!(channel_id, turns = context.len(), provider = provider.name(), "requesting chat reply");

        let outcome = provider
            .complete(CompletionRequest {
                model: &self.settings.model,
                messages: &context,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await;

        let (reply, upstream_ok) = match outcome {
            Ok(reply) => {
                self.store
                    .append_turn(channel_id, ConversationTurn::assistant(&reply));
                (reply, true)
            },
            Err(e) => {
                warn!(channel_id, error = %e, "chat completion failed");
                (self.settings.failure_reply.clone(), false)
            },
        };

        if let Some(audit) = &self.audit {
            audit.publish(AuditEvent::ChatTurn {
                channel_id,
                user_name: user_name.to_string(),
                message: user_text.to_string(),
                response_length: reply.chars().count(),
                upstream_ok,
            });
        }
        Ok(reply)
    }

    fn turn_lock(&self, channel_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.turn_locks.lock().unwrap_or_else(|e| e.into_inner());
        // An entry only the map holds has no turn running or waiting.
        locks.retain(|id, lock| *id == channel_id || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(channel_id).or_default())
    }
}
