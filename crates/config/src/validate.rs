//! Configuration validation.
//!
//! Structural problems (empty endpoint lists, zero timeouts, out-of-range
//! sampling parameters) are errors. Missing credentials are only warnings:
//! they surface per request as a configuration error instead.

use std::path::{Path, PathBuf};

use crate::{
    error::Context,
    schema::{HinataConfig, PipelineConfig, secret_value},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "endpoints", "range", "credentials", "routing"
    pub category: &'static str,
    /// Dotted path, e.g. "generation.image.endpoints"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a config file: syntax first, then semantics.
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = match crate::loader::load_config(path)
        .with_context(|| format!("cannot load {}", path.display()))
    {
        Ok(config) => validate(&config),
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(Severity::Error, "syntax", "", e.to_string());
            result
        },
    };
    result.config_path = Some(path.to_path_buf());
    result
}

/// Validate an already-loaded configuration.
#[must_use]
pub fn validate(config: &HinataConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_pipeline(&config.generation.image, "generation.image", &mut result);
    check_pipeline(&config.generation.video, "generation.video", &mut result);

    let chat = &config.chat;
    if !(0.0..=2.0).contains(&chat.temperature) {
        result.push(
            Severity::Error,
            "range",
            "chat.temperature",
            format!("{} is outside 0.0..=2.0", chat.temperature),
        );
    }
    if chat.history_limit == 0 {
        result.push(
            Severity::Error,
            "range",
            "chat.history_limit",
            "must keep at least one turn",
        );
    }
    if chat.max_tokens == 0 {
        result.push(Severity::Error, "range", "chat.max_tokens", "must be > 0");
    }
    if !is_http_url(&chat.base_url) {
        result.push(
            Severity::Error,
            "endpoints",
            "chat.base_url",
            format!("`{}` is not an http(s) URL", chat.base_url),
        );
    }

    if secret_value(config.discord.token.as_ref()).is_none() {
        result.push(
            Severity::Warning,
            "credentials",
            "discord.token",
            "not set (DISCORD_TOKEN); the bot cannot connect",
        );
    }
    if secret_value(config.generation.huggingface_token.as_ref()).is_none() {
        result.push(
            Severity::Warning,
            "credentials",
            "generation.huggingface_token",
            "not set (HUGGINGFACE_TOKEN); advanced generation will report a configuration error",
        );
    }
    if secret_value(chat.api_key.as_ref()).is_none() {
        result.push(
            Severity::Warning,
            "credentials",
            "chat.api_key",
            "not set (OPENROUTER_API_KEY); chat replies with the unconfigured notice",
        );
    }

    let routing = &config.routing;
    if routing.classify_mentions
        && routing.generation_keywords.is_empty()
        && routing.min_prompt_words == 0
    {
        result.push(
            Severity::Info,
            "routing",
            "routing",
            "no keyword or length rule; every mention is treated as chat",
        );
    }

    result
}

fn check_pipeline(pipeline: &PipelineConfig, path: &str, result: &mut ValidationResult) {
    if pipeline.endpoints.is_empty() {
        result.push(
            Severity::Error,
            "endpoints",
            format!("{path}.endpoints"),
            "at least one endpoint (the primary) is required",
        );
    }
    for (i, endpoint) in pipeline.endpoints.iter().enumerate() {
        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            result.push(
                Severity::Error,
                "endpoints",
                format!("{path}.endpoints[{i}]"),
                "empty endpoint",
            );
        } else if trimmed.contains("://") && !is_http_url(trimmed) {
            result.push(
                Severity::Error,
                "endpoints",
                format!("{path}.endpoints[{i}]"),
                format!("`{trimmed}` must use http or https"),
            );
        }
    }
    if pipeline.timeout_secs == 0 {
        result.push(
            Severity::Error,
            "range",
            format!("{path}.timeout_secs"),
            "must be > 0",
        );
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn configured() -> HinataConfig {
        let mut cfg = HinataConfig::default();
        cfg.discord.token = Some(Secret::new("discord".into()));
        cfg.generation.huggingface_token = Some(Secret::new("hf".into()));
        cfg.chat.api_key = Some(Secret::new("sk".into()));
        cfg
    }

    #[test]
    fn fully_configured_defaults_are_clean() {
        let result = validate(&configured());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_credentials_are_warnings_only() {
        let result = validate(&HinataConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 3);
    }

    #[test]
    fn empty_endpoint_list_is_an_error() {
        let mut cfg = configured();
        cfg.generation.video.endpoints.clear();
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "generation.video.endpoints");
    }

    #[test]
    fn bad_ranges_and_schemes() {
        let mut cfg = configured();
        cfg.chat.temperature = 3.5;
        cfg.chat.history_limit = 0;
        cfg.generation.image.endpoints[1] = "ftp://models/x".into();
        cfg.generation.image.timeout_secs = 0;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 4);
    }

    #[test]
    fn syntax_error_reported_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hinata.toml");
        std::fs::write(&path, "[chat\nmodel = 1").unwrap();
        let result = validate_file(&path);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
        assert!(result.diagnostics[0].message.starts_with("cannot load"));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
