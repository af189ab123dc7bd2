//! Discord event handler for serenity.
//!
//! Turns gateway messages into commands, image requests and chat turns.
//! All provider work goes through the shared [`BotState`].

use std::sync::{Arc, OnceLock};

use {
    hinata_channels::{Inbound, Route, RoutingPolicy, strip_mentions},
    hinata_chat::ConversationSession,
    hinata_common::{AuditEvent, AuditRegistry},
    hinata_media::{
        FailureReason, GenerationDispatcher, GenerationResult, MediaKind, MediaRequest,
        QuickImageProvider, VideoLength,
    },
    serenity::{
        all::{
            Context, CreateAttachment, CreateEmbed, CreateMessage, EditMessage, EventHandler,
            GatewayIntents, Message, Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use crate::{
    commands::{Command, ImageOptions, parse_command},
    embeds,
};

/// Discord caps message content at 2000 characters.
const MAX_MESSAGE_CHARS: usize = 2000;

const HF_NOT_CONFIGURED: &str =
    "Hugging Face token is not configured. Please set HUGGINGFACE_TOKEN in environment variables.";

/// Everything the handler needs, built once at startup.
pub struct BotState {
    pub prefix: String,
    pub dispatcher: Arc<GenerationDispatcher>,
    pub quick: QuickImageProvider,
    pub session: Arc<ConversationSession>,
    pub policy: RoutingPolicy,
    pub audit: Arc<AuditRegistry>,
    pub video_enabled: bool,
}

struct BotUser {
    id: u64,
    name: String,
}

/// Handler for Discord gateway events.
pub struct HinataHandler {
    state: Arc<BotState>,
    bot_user: OnceLock<BotUser>,
}

impl HinataHandler {
    #[must_use]
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            state,
            bot_user: OnceLock::new(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn run_command(&self, ctx: &Context, msg: &Message, command: Command) -> bool {
        let channel_id = msg.channel_id.get();
        let prefix = &self.state.prefix;
        match command {
            Command::Generate { prompt } => self.quick_image(ctx, msg, &prompt).await,
            Command::AdvancedImage(options) => self.advanced_image(ctx, msg, options).await,
            Command::Video { prompt, length } => self.video(ctx, msg, &prompt, length).await,
            Command::Activate => {
                let changed = self.state.session.activate(channel_id);
                self.record_activation(msg, true, changed);
                reply(ctx, msg, embeds::activation(true, changed, prefix))
                    .await
                    .is_some()
            },
            Command::Deactivate => {
                let changed = self.state.session.deactivate(channel_id);
                self.record_activation(msg, false, changed);
                reply(ctx, msg, embeds::activation(false, changed, prefix))
                    .await
                    .is_some()
            },
            Command::Status => {
                let active = self.state.session.is_active(channel_id);
                reply(ctx, msg, embeds::status(active)).await.is_some()
            },
            Command::Help => reply(ctx, msg, embeds::help(prefix)).await.is_some(),
        }
    }

    fn record_activation(&self, msg: &Message, activated: bool, changed: bool) {
        if changed {
            self.state.audit.publish(AuditEvent::ChannelActivation {
                channel_id: msg.channel_id.get(),
                activated,
                user_name: Some(msg.author.display_name().to_string()),
            });
        }
    }

    async fn quick_image(&self, ctx: &Context, msg: &Message, prompt: &str) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            let usage = format!("{}generate <prompt>", self.state.prefix);
            reply(ctx, msg, embeds::missing_prompt(&usage)).await;
            return false;
        }

        let loading = reply(ctx, msg, embeds::quick_loading(prompt)).await;
        let outcome = self.state.quick.generate(prompt).await;
        let success = outcome.is_ok();
        let embed = match outcome {
            Ok(url) => embeds::quick_success(prompt, &url),
            Err(e) => {
                warn!(error = %e, "quick image failed");
                embeds::generation_failed(prompt)
            },
        };
        finish(ctx, msg, loading, embed, None).await;

        self.state.audit.publish(AuditEvent::GenerationFinished {
            kind: "quick image".into(),
            prompt: prompt.to_string(),
            success,
            attempts: 1,
        });
        success
    }

    async fn advanced_image(&self, ctx: &Context, msg: &Message, options: ImageOptions) -> bool {
        let ImageOptions {
            prompt,
            negative_prompt,
            size,
        } = options;
        if prompt.is_empty() {
            let usage = format!("{}imgen <prompt>", self.state.prefix);
            reply(ctx, msg, embeds::missing_prompt(&usage)).await;
            return false;
        }
        if !self.state.dispatcher.is_configured() {
            reply(ctx, msg, embeds::configuration_error(HF_NOT_CONFIGURED)).await;
            return false;
        }

        let loading = reply(
            ctx,
            msg,
            embeds::advanced_loading(&prompt, size, negative_prompt.as_deref()),
        )
        .await;
        let _ = msg.channel_id.broadcast_typing(&ctx.http).await;

        let mut request = MediaRequest::image(&prompt).with_size(size);
        if let Some(negative) = negative_prompt {
            request = request.with_negative_prompt(negative);
        }
        let filename = media_filename(MediaKind::Image, msg.id.get());
        let (embed, attachment) = match self.state.dispatcher.generate(&request).await {
            GenerationResult::Success(bytes) => (
                embeds::advanced_success(&prompt, size, &filename),
                Some(CreateAttachment::bytes(bytes.to_vec(), filename)),
            ),
            GenerationResult::Failure(FailureReason::NotConfigured) => {
                (embeds::configuration_error(HF_NOT_CONFIGURED), None)
            },
            GenerationResult::Failure(reason) => {
                debug!(%reason, "advanced image failed");
                (embeds::generation_failed(&prompt), None)
            },
        };
        let success = attachment.is_some();
        finish(ctx, msg, loading, embed, attachment).await;
        success
    }

    async fn video(&self, ctx: &Context, msg: &Message, prompt: &str, length: VideoLength) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            let usage = format!("{}vidgen <prompt>", self.state.prefix);
            reply(ctx, msg, embeds::missing_prompt(&usage)).await;
            return false;
        }
        if !self.state.video_enabled {
            reply(ctx, msg, embeds::premium_notice(&self.state.prefix)).await;
            return true;
        }
        if !self.state.dispatcher.is_configured() {
            reply(ctx, msg, embeds::configuration_error(HF_NOT_CONFIGURED)).await;
            return false;
        }

        let loading = reply(ctx, msg, embeds::video_loading(prompt, length)).await;
        let _ = msg.channel_id.broadcast_typing(&ctx.http).await;

        let request = MediaRequest::video(prompt).with_length(length);
        let (embed, attachment) = match self.state.dispatcher.generate(&request).await {
            GenerationResult::Success(bytes) => (
                embeds::video_success(prompt, length),
                Some(CreateAttachment::bytes(
                    bytes.to_vec(),
                    media_filename(MediaKind::Video, msg.id.get()),
                )),
            ),
            GenerationResult::Failure(FailureReason::NotConfigured) => {
                (embeds::configuration_error(HF_NOT_CONFIGURED), None)
            },
            GenerationResult::Failure(_) => (embeds::generation_failed(prompt), None),
        };
        let success = attachment.is_some();
        finish(ctx, msg, loading, embed, attachment).await;
        success
    }

    async fn chat(&self, ctx: &Context, msg: &Message, text: &str) {
        let _ = msg.channel_id.broadcast_typing(&ctx.http).await;
        let reply_text = match self
            .state
            .session
            .respond(text, msg.channel_id.get(), msg.author.display_name())
            .await
        {
            Ok(reply_text) => reply_text,
            Err(e) => e.to_string(),
        };
        for chunk in chunk_message(&reply_text, MAX_MESSAGE_CHARS) {
            if let Err(e) = msg.reply(&ctx.http, chunk).await {
                warn!(error = %e, "failed to send chat reply");
                break;
            }
        }
    }
}

#[async_trait]
impl EventHandler for HinataHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
        let _ = self.bot_user.set(BotUser {
            id: ready.user.id.get(),
            name: ready.user.name.clone(),
        });
        self.state.audit.publish(AuditEvent::Lifecycle {
            started: true,
            guilds: ready.guilds.len(),
        });
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages to prevent loops
        if msg.author.bot {
            return;
        }

        let bot_id = self.bot_user.get().map(|b| b.id);
        let is_mention =
            bot_id.is_some_and(|id| msg.mentions.iter().any(|u| u.id.get() == id));

        if !is_mention && let Some(parsed) = parse_command(&msg.content, &self.state.prefix) {
            let success = match parsed {
                Ok(command) => {
                    debug!(command = command.name(), "prefix command");
                    self.run_command(&ctx, &msg, command).await
                },
                Err(e) => {
                    reply(&ctx, &msg, embeds::invalid_option(&e.to_string())).await;
                    false
                },
            };
            self.state.audit.publish(AuditEvent::Command {
                channel_id: msg.channel_id.get(),
                user_name: msg.author.display_name().to_string(),
                command: msg.content.clone(),
                success,
            });
            return;
        }

        let channel_id = msg.channel_id.get();
        let text = strip_mentions(&msg.content, bot_id);
        let route = self.state.policy.route(&Inbound {
            from_bot: false,
            is_mention,
            channel_active: self.state.session.is_active(channel_id),
            text: &text,
        });

        match route {
            Route::Generate => {
                self.quick_image(&ctx, &msg, &text).await;
            },
            Route::Chat => self.chat(&ctx, &msg, &text).await,
            Route::Ignore if is_mention => {
                let name = self
                    .bot_user
                    .get()
                    .map_or("Hinata", |b| b.name.as_str());
                reply(&ctx, &msg, embeds::greeting(name, &self.state.prefix)).await;
            },
            Route::Ignore => {},
        }
    }
}

/// Reply to `msg` with an embed, logging send failures.
async fn reply(ctx: &Context, msg: &Message, embed: CreateEmbed) -> Option<Message> {
    let builder = CreateMessage::new().embed(embed).reference_message(msg);
    match msg.channel_id.send_message(&ctx.http, builder).await {
        Ok(sent) => Some(sent),
        Err(e) => {
            warn!(error = %e, channel_id = msg.channel_id.get(), "failed to send reply");
            None
        },
    }
}

/// Replace the loading message with the final embed, or send a fresh reply
/// if the loading message never went out.
async fn finish(
    ctx: &Context,
    msg: &Message,
    loading: Option<Message>,
    embed: CreateEmbed,
    attachment: Option<CreateAttachment>,
) {
    if let Some(mut loading) = loading {
        let mut edit = EditMessage::new().embed(embed);
        if let Some(file) = attachment {
            edit = edit.new_attachment(file);
        }
        if let Err(e) = loading.edit(&ctx.http, edit).await {
            warn!(error = %e, "failed to update loading message");
        }
        return;
    }

    let mut builder = CreateMessage::new().embed(embed).reference_message(msg);
    if let Some(file) = attachment {
        builder = builder.add_file(file);
    }
    if let Err(e) = msg.channel_id.send_message(&ctx.http, builder).await {
        warn!(error = %e, "failed to send generation result");
    }
}

/// Upload name for generated media, keyed by the triggering message.
#[must_use]
pub fn media_filename(kind: MediaKind, message_id: u64) -> String {
    let stem = match kind {
        MediaKind::Image => "imgen",
        MediaKind::Video => "vidgen",
    };
    format!("hinata_{stem}_{message_id}.{}", kind.extension())
}

/// Split `text` into pieces of at most `max` characters, preferring line
/// breaks.
#[must_use]
pub fn chunk_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        for ch in line.chars() {
            if current_len == max {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += 1;
        }
        // Start a new chunk at the line break if the next line would not fit.
        if current_len > max / 2 && line.ends_with('\n') {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}
