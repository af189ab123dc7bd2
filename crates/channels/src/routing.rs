use {
    hinata_config::RoutingConfig,
    serde::{Deserialize, Serialize},
    tracing::trace,
};

/// What to do with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Treat the text as an image prompt.
    Generate,
    /// Treat the text as a conversation turn.
    Chat,
    /// Not for us (bot author, not addressed, nothing left after mentions).
    Ignore,
}

/// Remove `<@id>` and `<@!id>` tokens for `bot_id` and collapse the
/// remaining whitespace.
///
/// With no bot id every user mention is removed.
pub fn strip_mentions(text: &str, bot_id: Option<u64>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<@") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('>') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let id = tail[..end].strip_prefix('!').unwrap_or(&tail[..end]);
        let is_target = match (id.parse::<u64>(), bot_id) {
            (Ok(parsed), Some(bot)) => parsed == bot,
            (Ok(_), None) => true,
            (Err(_), _) => false,
        };
        if !is_target {
            out.push_str(&rest[start..start + 2 + end + 1]);
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Respond when addressed directly or when the channel is active.
#[must_use]
pub fn should_respond(is_mention: bool, channel_active: bool) -> bool {
    is_mention || channel_active
}

/// Facts about an inbound message needed to route it.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub from_bot: bool,
    pub is_mention: bool,
    pub channel_active: bool,
    /// Message text with mentions already stripped.
    pub text: &'a str,
}

/// Decides whether a mention is an image request or a chat turn.
///
/// The heuristic (keyword hit, or a long prompt) is configurable because it
/// misroutes long chat messages; `enabled = false` sends every mention to
/// chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub enabled: bool,
    /// Lower-cased keywords matched against whole words.
    pub generation_keywords: Vec<String>,
    /// More words than this marks a prompt. `0` disables the rule.
    pub min_prompt_words: usize,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::from(&RoutingConfig::default())
    }
}

impl From<&RoutingConfig> for RoutingPolicy {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            enabled: config.classify_mentions,
            generation_keywords: config
                .generation_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            min_prompt_words: config.min_prompt_words,
        }
    }
}

impl RoutingPolicy {
    /// Classify mention text. Empty text is ignored.
    #[must_use]
    pub fn classify(&self, text: &str) -> Route {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .collect();
        if words.is_empty() {
            return Route::Ignore;
        }
        if !self.enabled {
            return Route::Chat;
        }

        let keyword_hit = words
            .iter()
            .any(|w| self.generation_keywords.iter().any(|k| k == w));
        let long_prompt = self.min_prompt_words > 0 && words.len() > self.min_prompt_words;
        trace!(keyword_hit, long_prompt, words = words.len(), "classified mention");

        if keyword_hit || long_prompt {
            Route::Generate
        } else {
            Route::Chat
        }
    }

    /// Full routing decision for a non-command message.
    ///
    /// Mentions are classified; messages in an active channel that do not
    /// mention the bot are always chat turns.
    #[must_use]
    pub fn route(&self, inbound: &Inbound<'_>) -> Route {
        if inbound.from_bot || !should_respond(inbound.is_mention, inbound.channel_active) {
            return Route::Ignore;
        }
        if inbound.is_mention {
            return self.classify(inbound.text);
        }
        if inbound.text.trim().is_empty() {
            Route::Ignore
        } else {
            Route::Chat
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    const BOT: u64 = 1_234_567_890;

    #[rstest]
    #[case("<@1234567890> draw a cat", "draw a cat")]
    #[case("hey <@!1234567890>   there", "hey there")]
    #[case("<@1234567890>", "")]
    #[case("<@42> and <@1234567890> hi", "<@42> and hi")]
    #[case("broken <@123", "broken <@123")]
    #[case("<@&555> role ping", "<@&555> role ping")]
    fn strips_only_the_bot(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_mentions(input, Some(BOT)), expected);
    }

    #[test]
    fn strips_every_user_mention_without_bot_id() {
        assert_eq!(strip_mentions("<@1> <@!2> yo", None), "yo");
    }

    #[rstest]
    #[case(false, false, false)]
    #[case(true, false, true)]
    #[case(false, true, true)]
    #[case(true, true, true)]
    fn respond_gate(#[case] mention: bool, #[case] active: bool, #[case] expected: bool) {
        assert_eq!(should_respond(mention, active), expected);
    }

    #[rstest]
    #[case("draw me a sunset", Route::Generate)]
    #[case("Can you PAINT a fox?", Route::Generate)]
    #[case("how are you today?", Route::Chat)]
    #[case("remaking the dinner plan", Route::Chat)]
    #[case("tell me a long story about the quiet village near the mountain lake please", Route::Generate)]
    #[case("   ", Route::Ignore)]
    fn default_classification(#[case] text: &str, #[case] expected: Route) {
        assert_eq!(RoutingPolicy::default().classify(text), expected);
    }

    #[test]
    fn disabled_policy_always_chats() {
        let policy = RoutingPolicy {
            enabled: false,
            ..RoutingPolicy::default()
        };
        assert_eq!(policy.classify("draw a cat"), Route::Chat);
        assert_eq!(policy.classify(""), Route::Ignore);
    }

    #[test]
    fn length_rule_can_be_disabled() {
        let policy = RoutingPolicy {
            min_prompt_words: 0,
            ..RoutingPolicy::default()
        };
        let long = "one two three four five six seven eight nine ten eleven twelve";
        assert_eq!(policy.classify(long), Route::Chat);
    }

    #[test]
    fn keywords_from_config_are_normalised() {
        let cfg = RoutingConfig {
            generation_keywords: vec![" Sketch ".into(), "".into()],
            ..RoutingConfig::default()
        };
        let policy = RoutingPolicy::from(&cfg);
        assert_eq!(policy.generation_keywords, vec!["sketch"]);
        assert_eq!(policy.classify("sketch a dog"), Route::Generate);
    }

    #[test]
    fn route_combines_gate_and_classifier() {
        let policy = RoutingPolicy::default();
        let msg = |from_bot, is_mention, channel_active, text| Inbound {
            from_bot,
            is_mention,
            channel_active,
            text,
        };

        assert_eq!(policy.route(&msg(true, true, true, "draw")), Route::Ignore);
        assert_eq!(policy.route(&msg(false, false, false, "draw")), Route::Ignore);
        assert_eq!(policy.route(&msg(false, true, false, "draw a cat")), Route::Generate);
        // Active channel, no mention: always chat, even with keywords.
        assert_eq!(policy.route(&msg(false, false, true, "draw a cat")), Route::Chat);
        assert_eq!(policy.route(&msg(false, false, true, " ")), Route::Ignore);
    }
}
