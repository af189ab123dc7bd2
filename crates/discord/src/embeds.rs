//! Embed builders for every reply the bot sends.

use {
    hinata_common::AuditEvent,
    hinata_media::{SizePreset, VideoLength},
    serenity::all::{CreateEmbed, CreateEmbedFooter, Timestamp},
};

pub const FOOTER: &str = "©️ 2025 Hinata. All rights reserved";
const LOG_FOOTER: &str = "Hinata Bot Logs";

pub const GOLD: u32 = 0xFFD700;
pub const GREEN: u32 = 0x00FF00;
pub const RED: u32 = 0xFF0000;
pub const PURPLE: u32 = 0x9B59B6;
pub const BLURPLE: u32 = 0x7289DA;
pub const ROSE: u32 = 0xFF6B6B;

fn base(title: impl Into<String>, description: impl Into<String>, colour: u32) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(colour)
        .footer(CreateEmbedFooter::new(FOOTER))
}

pub fn greeting(bot_name: &str, prefix: &str) -> CreateEmbed {
    base(
        "Hi there! 👋",
        format!(
            "I'm Hinata, your image generation assistant!\n\n\
             **How to use me:**\n\
             • Mention me with a prompt: `@{bot_name} a cute cat`\n\
             • Use prefix command: `{prefix}generate a cute cat`"
        ),
        BLURPLE,
    )
}

pub fn help(prefix: &str) -> CreateEmbed {
    base(
        "🌸 Hinata Commands",
        "Image generation and chat, right here in Discord.",
        BLURPLE,
    )
    .field(
        "🎨 Images",
        format!(
            "`{prefix}generate <prompt>`: quick image\n\
             `{prefix}imgen <prompt> [size:square|portrait|landscape|wide] [--no <negative>]`: advanced image"
        ),
        false,
    )
    .field(
        "🎬 Video",
        format!("`{prefix}vidgen <prompt> [length:short|medium|long]`"),
        false,
    )
    .field(
        "💬 Chat",
        format!(
            "Mention me to talk.\n\
             `{prefix}activate` / `{prefix}deactivate`: answer every message here\n\
             `{prefix}status`: show whether I'm active"
        ),
        false,
    )
}

pub fn missing_prompt(usage: &str) -> CreateEmbed {
    base(
        "❌ Error",
        format!("Please provide a prompt!\n\n**Usage:** `{usage}`"),
        RED,
    )
}

pub fn invalid_option(message: &str) -> CreateEmbed {
    base("❌ Error", message, RED)
}

pub fn quick_loading(prompt: &str) -> CreateEmbed {
    base(
        "🎨 Generating Image...",
        format!("**Prompt:** {prompt}\n\nPlease wait while I create your image..."),
        GOLD,
    )
}

pub fn quick_success(prompt: &str, url: &str) -> CreateEmbed {
    base("🎨 Image Generated!", format!("**Prompt:** {prompt}"), GREEN).image(url)
}

pub fn advanced_loading(prompt: &str, size: SizePreset, negative: Option<&str>) -> CreateEmbed {
    base(
        "🎨 Generating Advanced Image...",
        format!(
            "**Prompt:** {prompt}\n**Size:** {size}\n**Negative Prompt:** {}\n\n\
             Using advanced AI models... This may take a moment.",
            negative.unwrap_or("None")
        ),
        PURPLE,
    )
}

/// `attachment` is the uploaded file name shown inline.
pub fn advanced_success(prompt: &str, size: SizePreset, attachment: &str) -> CreateEmbed {
    base(
        "✨ Advanced Image Generated!",
        format!("**Prompt:** {prompt}\n**Size:** {size}"),
        GREEN,
    )
    .image(format!("attachment://{attachment}"))
}

pub fn video_loading(prompt: &str, length: VideoLength) -> CreateEmbed {
    base(
        "🎬 Generating Video...",
        format!("**Prompt:** {prompt}\n**Length:** {length}\n\nThis can take a couple of minutes."),
        PURPLE,
    )
}

pub fn video_success(prompt: &str, length: VideoLength) -> CreateEmbed {
    base(
        "🎬 Video Generated!",
        format!("**Prompt:** {prompt}\n**Length:** {length}"),
        GREEN,
    )
}

pub fn generation_failed(prompt: &str) -> CreateEmbed {
    base(
        "❌ Generation Failed",
        format!(
            "Sorry, I couldn't generate that for: **{prompt}**\n\n\
             The AI models might be busy. Please try again later."
        ),
        RED,
    )
}

pub fn configuration_error(what: &str) -> CreateEmbed {
    base("❌ Configuration Error", what, RED)
}

pub fn premium_notice(prefix: &str) -> CreateEmbed {
    base(
        "🎬 Video Generation - Premium Feature",
        "Video generation is a premium feature that requires an upgraded subscription.\n\n\
         **What you get with video generation:**\n\
         • AI-powered text-to-video creation\n\
         • Multiple duration options\n\
         • High-quality video output\n\
         • Advanced AI models\n\n\
         Please upgrade your subscription to unlock this feature!",
        GOLD,
    )
    .field(
        "Alternative",
        format!(
            "You can still use our free image generation features:\n\
             • `{prefix}generate` - Basic image generation\n\
             • `{prefix}imgen` - Advanced image generation"
        ),
        false,
    )
}

/// `changed` is false when the channel was already in the requested state.
pub fn activation(activated: bool, changed: bool, prefix: &str) -> CreateEmbed {
    match (activated, changed) {
        (true, true) => base(
            "🌸 Hinata Activated!",
            format!(
                "I'm now active in this channel! I'll respond to all messages here.\n\n\
                 Use `{prefix}deactivate` to turn off automatic responses."
            ),
            GREEN,
        ),
        (true, false) => base(
            "🌸 Already Active!",
            "I'm already active in this channel! I'll respond to all messages here.",
            GOLD,
        ),
        (false, true) => base(
            "🌸 Hinata Deactivated",
            format!(
                "I'm no longer active in this channel. I'll only respond when mentioned.\n\n\
                 Use `{prefix}activate` to turn on automatic responses again."
            ),
            ROSE,
        ),
        (false, false) => base(
            "🌸 Already Inactive",
            "I'm not active in this channel. I only respond when mentioned.",
            GOLD,
        ),
    }
}

pub fn status(active: bool) -> CreateEmbed {
    if active {
        base(
            "🌸 Channel Status: Active",
            "I'm currently active in this channel and will respond to all messages!",
            GREEN,
        )
    } else {
        base(
            "🌸 Channel Status: Inactive",
            "I'm currently inactive in this channel. I only respond when mentioned.",
            ROSE,
        )
    }
}

/// Log-channel rendering of an audit event.
pub fn audit(event: &AuditEvent) -> CreateEmbed {
    let colour = if event.is_failure() {
        RED
    } else {
        match event {
            AuditEvent::ChatTurn { .. } | AuditEvent::ChannelActivation { .. } => BLURPLE,
            _ => GREEN,
        }
    };
    let mut embed = CreateEmbed::new()
        .title(format!("🌸 {}", event.label()))
        .description(event.to_string())
        .colour(colour)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(LOG_FOOTER));

    match event {
        AuditEvent::ChatTurn {
            channel_id,
            user_name,
            ..
        }
        | AuditEvent::Command {
            channel_id,
            user_name,
            ..
        } => {
            embed = embed
                .field("👤 User", user_name, true)
                .field("📝 Channel", format!("<#{channel_id}>"), true);
        },
        AuditEvent::ChannelActivation {
            channel_id,
            user_name,
            ..
        } => {
            if let Some(user) = user_name {
                embed = embed.field("👤 User", user, true);
            }
            embed = embed.field("📝 Channel", format!("<#{channel_id}>"), true);
        },
        _ => {},
    }
    embed
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::Value};

    fn json(embed: &CreateEmbed) -> Value {
        serde_json::to_value(embed).unwrap()
    }

    #[test]
    fn replies_carry_footer_and_colour() {
        let v = json(&generation_failed("a fox"));
        assert_eq!(v["footer"]["text"], FOOTER);
        assert_eq!(v["color"], RED);
        assert!(v["description"].as_str().unwrap().contains("**a fox**"));
    }

    #[test]
    fn advanced_success_points_at_attachment() {
        let v = json(&advanced_success("koi", SizePreset::Portrait, "hinata_imgen_7.png"));
        assert_eq!(v["image"]["url"], "attachment://hinata_imgen_7.png");
        assert!(v["description"].as_str().unwrap().contains("768x1024"));
    }

    #[test]
    fn activation_variants() {
        assert_eq!(json(&activation(true, true, "%"))["title"], "🌸 Hinata Activated!");
        assert_eq!(json(&activation(true, false, "%"))["title"], "🌸 Already Active!");
        assert_eq!(json(&activation(false, true, "%"))["title"], "🌸 Hinata Deactivated");
        assert_eq!(json(&activation(false, false, "%"))["title"], "🌸 Already Inactive");
    }

    #[test]
    fn audit_embed_marks_failures_red() {
        let failed = AuditEvent::Command {
            channel_id: 9,
            user_name: "Ino".into(),
            command: "%imgen cat".into(),
            success: false,
        };
        let v = json(&audit(&failed));
        assert_eq!(v["color"], RED);
        assert_eq!(v["title"], "🌸 Command Used");
        assert_eq!(v["fields"][0]["value"], "Ino");
        assert_eq!(v["fields"][1]["value"], "<#9>");
    }

    #[test]
    fn help_uses_prefix() {
        let v = json(&help("!"));
        assert!(v["fields"][0]["value"].as_str().unwrap().contains("`!generate <prompt>`"));
    }
}
