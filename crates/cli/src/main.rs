mod config_commands;
mod generate_commands;

use std::path::{Path, PathBuf};

use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    hinata_chat::ConversationSession,
    hinata_config::Severity,
    hinata_discord::Bot,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "hinata", about = "Hinata: image, video and chat bot for Discord")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/hinata/).
    #[arg(long, global = true, env = "HINATA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve (default when no subcommand is provided).
    Run,
    /// Generate one image or video and write it to disk.
    Generate(generate_commands::GenerateArgs),
    /// Send one chat message and print the reply.
    Chat {
        #[arg(long, default_value_t = 0)]
        channel: u64,
        #[arg(long, default_value = "cli")]
        user: String,
        message: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let validation = config_commands::load_and_validate(config_path);
    for d in &validation.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => {},
        }
    }
    if validation.has_errors() {
        bail!(
            "configuration has {} error(s); run `hinata config check`",
            validation.count(Severity::Error)
        );
    }

    let config = hinata_config::load(config_path)?;
    let bot = Bot::build(&config)?;
    bot.run().await?;
    info!("hinata stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "hinata starting");

    match cli.command {
        None | Some(Commands::Run) => run(cli.config.as_deref()).await,
        Some(Commands::Generate(args)) => {
            let config = hinata_config::load(cli.config.as_deref())?;
            generate_commands::handle_generate(&config, args).await
        },
        Some(Commands::Chat {
            channel,
            ref user,
            ref message,
        }) => {
            let config = hinata_config::load(cli.config.as_deref())?;
            let session = ConversationSession::from_config(&config.chat);
            let reply = session.respond(message, channel, user).await?;
            println!("{reply}");
            Ok(())
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["hinata", "--log-level", "debug"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn generate_parses_video_options() {
        let cli = Cli::try_parse_from([
            "hinata", "generate", "--kind", "video", "--prompt", "waves", "--frames", "24",
        ])
        .unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert!(matches!(args.kind, generate_commands::KindArg::Video));
        assert_eq!(args.frames, Some(24));
    }
}
