//! Prefix command parsing (`%generate a cat`).

use hinata_media::{SizePreset, VideoLength};

use crate::error::{Error, Result};

/// Options for the advanced image command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageOptions {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub size: SizePreset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Quick keyless image by URL.
    Generate { prompt: String },
    /// Image through the inference dispatcher.
    AdvancedImage(ImageOptions),
    Video { prompt: String, length: VideoLength },
    Activate,
    Deactivate,
    Status,
    Help,
}

impl Command {
    /// Canonical name, used for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::AdvancedImage(_) => "imgen",
            Self::Video { .. } => "vidgen",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Status => "status",
            Self::Help => "help",
        }
    }
}

/// Parse `content` as a prefix command.
///
/// Returns `None` when the message does not start with `prefix` or names an
/// unknown command. Names are case-insensitive; the prompt keeps its case.
///
/// `imgen` accepts `size:<preset>` anywhere in the prompt and treats text
/// after `--no` as the negative prompt. `vidgen` accepts `length:<preset>`.
pub fn parse_command(content: &str, prefix: &str) -> Option<Result<Command>> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }

    let command = match name.to_lowercase().as_str() {
        "generate" | "gen" | "img" | "image" => Ok(Command::Generate {
            prompt: args.to_string(),
        }),
        "imgen" | "advimg" | "hqimg" => parse_image_options(args).map(Command::AdvancedImage),
        "vidgen" | "video" | "genvid" => parse_video(args),
        "activate" | "active" | "on" => Ok(Command::Activate),
        "deactivate" | "inactive" | "off" => Ok(Command::Deactivate),
        "status" | "state" => Ok(Command::Status),
        "help" | "h" | "commands" => Ok(Command::Help),
        _ => return None,
    };
    Some(command)
}

fn parse_image_options(args: &str) -> Result<ImageOptions> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    let (main, negative) = match tokens.iter().position(|t| *t == "--no") {
        Some(i) => (&tokens[..i], Some(tokens[i + 1..].join(" "))),
        None => (&tokens[..], None),
    };
    let mut options = ImageOptions {
        negative_prompt: negative.filter(|n| !n.is_empty()),
        ..ImageOptions::default()
    };
    let mut words = Vec::new();
    for &word in main {
        match word.strip_prefix("size:") {
            Some(size) => options.size = size.parse().map_err(invalid_option)?,
            None => words.push(word),
        }
    }
    options.prompt = words.join(" ");
    Ok(options)
}

fn parse_video(args: &str) -> Result<Command> {
    let mut length = VideoLength::default();
    let mut words = Vec::new();
    for word in args.split_whitespace() {
        match word.strip_prefix("length:") {
            Some(value) => {
                length = value.parse().map_err(invalid_option)?;
            },
            None => words.push(word),
        }
    }
    Ok(Command::Video {
        prompt: words.join(" "),
        length,
    })
}

fn invalid_option(e: hinata_media::Error) -> Error {
    Error::invalid_option(e.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn parse(content: &str) -> Command {
        parse_command(content, "%").unwrap().unwrap()
    }

    #[rstest]
    #[case("%generate a cute cat", "a cute cat")]
    #[case("%GEN  Misty Forest ", "Misty Forest")]
    #[case("%img", "")]
    #[case("%image sunset", "sunset")]
    fn generate_aliases(#[case] content: &str, #[case] prompt: &str) {
        assert_eq!(parse(content), Command::Generate {
            prompt: prompt.into()
        });
    }

    #[rstest]
    #[case("%activate", Command::Activate)]
    #[case("%on", Command::Activate)]
    #[case("%Active", Command::Activate)]
    #[case("%off", Command::Deactivate)]
    #[case("%inactive", Command::Deactivate)]
    #[case("%state", Command::Status)]
    #[case("%h", Command::Help)]
    #[case("%commands", Command::Help)]
    fn simple_commands(#[case] content: &str, #[case] expected: Command) {
        assert_eq!(parse(content), expected);
    }

    #[test]
    fn not_commands() {
        assert!(parse_command("hello %generate", "%").is_none());
        assert!(parse_command("%", "%").is_none());
        assert!(parse_command("% generate", "%").is_none());
        assert!(parse_command("%dance", "%").is_none());
        assert!(parse_command("!generate cat", "%").is_none());
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(parse_command("!!help", "!!").unwrap().unwrap(), Command::Help);
    }

    #[test]
    fn imgen_with_size_and_negative() {
        let Command::AdvancedImage(opts) =
            parse("%hqimg a castle size:wide at dawn --no blurry, low quality")
        else {
            panic!("expected imgen");
        };
        assert_eq!(opts.prompt, "a castle at dawn");
        assert_eq!(opts.size, SizePreset::Wide);
        assert_eq!(opts.negative_prompt.as_deref(), Some("blurry, low quality"));
    }

    #[rstest]
    #[case("%imgen --noise texture", "--noise texture", None)]
    #[case("%imgen cat --nothing else --no blur", "cat --nothing else", Some("blur"))]
    #[case("%imgen fox --no", "fox", None)]
    fn negative_marker_is_a_whole_token(
        #[case] content: &str,
        #[case] prompt: &str,
        #[case] negative: Option<&str>,
    ) {
        let Command::AdvancedImage(opts) = parse(content) else {
            panic!("expected imgen");
        };
        assert_eq!(opts.prompt, prompt);
        assert_eq!(opts.negative_prompt.as_deref(), negative);
    }

    #[test]
    fn imgen_defaults() {
        assert_eq!(
            parse("%imgen koi pond"),
            Command::AdvancedImage(ImageOptions {
                prompt: "koi pond".into(),
                negative_prompt: None,
                size: SizePreset::Square,
            })
        );
    }

    #[test]
    fn bad_option_is_an_error() {
        let err = parse_command("%imgen cat size:huge", "%").unwrap().unwrap_err();
        assert!(err.to_string().contains("unknown size"));
        assert!(parse_command("%vidgen waves length:9", "%").unwrap().is_err());
    }

    #[test]
    fn vidgen_length() {
        assert_eq!(parse("%genvid ocean waves length:24"), Command::Video {
            prompt: "ocean waves".into(),
            length: VideoLength::Medium,
        });
    }
}
