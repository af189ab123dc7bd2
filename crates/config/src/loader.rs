use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::HinataConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["hinata.toml", "hinata.yaml", "hinata.yml", "hinata.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HinataConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load configuration for the process.
///
/// An explicit path must load cleanly. Without one, standard locations are
/// searched and a broken or missing file falls back to defaults. Environment
/// overrides are applied last in both cases.
pub fn load(explicit: Option<&Path>) -> Result<HinataConfig> {
    let mut config = match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./hinata.{toml,yaml,yml,json}`
/// 2. `~/.config/hinata/hinata.{toml,yaml,yml,json}`
pub fn discover_and_load() -> HinataConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return HinataConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            HinataConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/hinata/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hinata").map(|d| d.config_dir().to_path_buf())
}

/// Apply the process environment on top of file configuration.
pub fn apply_env_overrides(config: &mut HinataConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut HinataConfig, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = lookup("DISCORD_TOKEN") {
        config.discord.token = Some(Secret::new(token));
    }
    if let Some(prefix) = lookup("COMMAND_PREFIX") {
        config.discord.command_prefix = prefix;
    }
    if let Some(raw) = lookup("LOG_CHANNEL_ID") {
        match raw.trim().parse::<u64>() {
            Ok(id) => config.discord.log_channel_id = Some(id),
            Err(e) => warn!(value = %raw, error = %e, "ignoring invalid LOG_CHANNEL_ID"),
        }
    }
    if let Some(token) = lookup("HUGGINGFACE_TOKEN") {
        config.generation.huggingface_token = Some(Secret::new(token));
    }
    if let Some(key) = lookup("OPENROUTER_API_KEY") {
        config.chat.api_key = Some(Secret::new(key));
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<HinataConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
