//! Config schema types (discord, generation pipelines, chat, routing).
use std::collections::BTreeMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
};

/// Hugging Face inference base, used to expand bare model ids.
pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HinataConfig {
    pub discord: DiscordConfig,
    pub generation: GenerationConfig,
    pub chat: ChatConfig,
    pub routing: RoutingConfig,
}

/// Gateway connection and log mirroring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Required by `hinata run`.
    pub token: Option<Secret<String>>,
    /// Prefix for text commands, e.g. `%generate`.
    pub command_prefix: String,
    /// Channel that receives audit events. `None` disables mirroring.
    pub log_channel_id: Option<u64>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            command_prefix: "%".into(),
            log_channel_id: None,
        }
    }
}

/// Media generation providers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Bearer token for the inference API. Missing ⇒ configuration error
    /// on every advanced generation request.
    pub huggingface_token: Option<Secret<String>>,
    /// Base URL prepended to endpoint entries that are bare model ids.
    pub inference_base_url: String,
    #[serde(deserialize_with = "image_pipeline")]
    pub image: PipelineConfig,
    #[serde(deserialize_with = "video_pipeline")]
    pub video: PipelineConfig,
    /// Video generation is answered with a premium notice unless enabled.
    pub video_enabled: bool,
    /// Keyless image-by-URL service behind the basic `generate` command.
    pub quick_image_base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            huggingface_token: None,
            inference_base_url: DEFAULT_INFERENCE_BASE_URL.into(),
            image: PipelineConfig::image(),
            video: PipelineConfig::video(),
            video_enabled: false,
            quick_image_base_url: "https://image.pollinations.ai".into(),
        }
    }
}

/// One media pipeline: ordered endpoints plus timing and default parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Primary first, then fallbacks in attempt order.
    pub endpoints: Vec<String>,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    /// Wait before re-trying the primary after a "model loading" response.
    pub retry_backoff_secs: u64,
    /// Parameters sent with every request unless the request overrides them.
    pub defaults: BTreeMap<String, Value>,
}

impl PipelineConfig {
    #[must_use]
    pub fn image() -> Self {
        Self {
            endpoints: vec![
                "black-forest-labs/FLUX.1-dev".into(),
                "stabilityai/stable-diffusion-xl-base-1.0".into(),
                "runwayml/stable-diffusion-v1-5".into(),
                "CompVis/stable-diffusion-v1-4".into(),
            ],
            timeout_secs: 60,
            retry_backoff_secs: 10,
            defaults: BTreeMap::from([
                ("width".into(), Value::from(1024)),
                ("height".into(), Value::from(1024)),
                ("num_inference_steps".into(), Value::from(20)),
                ("guidance_scale".into(), Value::from(7.5)),
            ]),
        }
    }

    #[must_use]
    pub fn video() -> Self {
        Self {
            endpoints: vec![
                "ali-vilab/text-to-video-ms-1.7b".into(),
                "damo-vilab/text-to-video-ms-1.7b".into(),
                "modelscope/text-to-video-synthesis".into(),
            ],
            timeout_secs: 120,
            retry_backoff_secs: 10,
            defaults: BTreeMap::from([
                ("num_frames".into(), Value::from(16)),
                ("num_inference_steps".into(), Value::from(25)),
            ]),
        }
    }
}

/// Pipeline section as written in the file; absent fields fall back to the
/// kind-specific defaults rather than to a shared `Default`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineOverrides {
    endpoints: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    retry_backoff_secs: Option<u64>,
    defaults: Option<BTreeMap<String, Value>>,
}

impl PipelineOverrides {
    fn apply(self, mut base: PipelineConfig) -> PipelineConfig {
        if let Some(endpoints) = self.endpoints {
            base.endpoints = endpoints;
        }
        if let Some(timeout) = self.timeout_secs {
            base.timeout_secs = timeout;
        }
        if let Some(backoff) = self.retry_backoff_secs {
            base.retry_backoff_secs = backoff;
        }
        // Parameter defaults merge key by key.
        if let Some(defaults) = self.defaults {
            base.defaults.extend(defaults);
        }
        base
    }
}

fn image_pipeline<'de, D: serde::Deserializer<'de>>(d: D) -> Result<PipelineConfig, D::Error> {
    Ok(PipelineOverrides::deserialize(d)?.apply(PipelineConfig::image()))
}

fn video_pipeline<'de, D: serde::Deserializer<'de>>(d: D) -> Result<PipelineConfig, D::Error> {
    Ok(PipelineOverrides::deserialize(d)?.apply(PipelineConfig::video()))
}

/// Chat-completion backend and conversation bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub api_key: Option<Secret<String>>,
    /// OpenAI-compatible API root (`/chat/completions` is appended).
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Turns kept per channel.
    pub history_limit: usize,
    pub timeout_secs: u64,
    pub system_prompt: String,
    /// Sent as `HTTP-Referer` for provider attribution.
    pub referer: Option<String>,
    /// Sent as `X-Title` for provider attribution.
    pub title: Option<String>,
    /// Reply used when no API key is configured.
    pub unconfigured_reply: String,
    /// Reply used when the upstream call fails.
    pub failure_reply: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".into(),
            model: "google/gemma-3n-e4b-it:free".into(),
            max_tokens: 500,
            temperature: 0.7,
            history_limit: 10,
            timeout_secs: 60,
            system_prompt: "You are Hinata, a friendly and helpful Discord bot. You are cheerful, \
                            supportive, and love to help users. You can generate images and chat \
                            with users. Keep your responses conversational and engaging, but not \
                            too long. Use emojis occasionally to show personality. You are in a \
                            Discord server, so keep responses appropriate for a community setting."
                .into(),
            referer: Some("https://discord.com".into()),
            title: Some("Hinata Discord Bot".into()),
            unconfigured_reply:
                "Sorry, I'm not configured for chat yet. Please set up the OpenRouter API key!"
                    .into(),
            failure_reply: "Sorry, I'm having trouble thinking right now. Please try again later! 😅"
                .into(),
        }
    }
}

/// How a bot mention is classified as an image request or a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// When false, every mention is a chat turn.
    pub classify_mentions: bool,
    /// Any of these words marks a mention as an image request.
    pub generation_keywords: Vec<String>,
    /// Mentions longer than this many words are treated as image prompts.
    /// `0` disables the length rule.
    pub min_prompt_words: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            classify_mentions: true,
            generation_keywords: [
                "generate", "draw", "create", "make", "image", "picture", "paint",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_prompt_words: 10,
        }
    }
}

/// Expose a configured secret, treating an empty value as absent.
#[must_use]
pub fn secret_value(secret: Option<&Secret<String>>) -> Option<&str> {
    secret
        .map(|s| s.expose_secret().as_str())
        .filter(|s| !s.trim().is_empty())
}
