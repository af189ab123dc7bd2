//! Configuration loading, validation and env substitution.
//!
//! Config files: `hinata.toml`, `hinata.yaml`, `hinata.yml` or `hinata.json`,
//! searched in `./` then `~/.config/hinata/`. `${ENV_VAR}` placeholders are
//! substituted before parsing and the bot's environment variables
//! (`DISCORD_TOKEN`, `HUGGINGFACE_TOKEN`, ...) override file values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load},
    schema::{
        ChatConfig, DiscordConfig, GenerationConfig, HinataConfig, PipelineConfig, RoutingConfig,
        secret_value,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
