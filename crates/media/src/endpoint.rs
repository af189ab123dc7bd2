use std::{collections::BTreeMap, fmt, time::Duration};

use {hinata_config::PipelineConfig, serde_json::Value};

use crate::{
    error::{Error, Result},
    request::MediaKind,
};

/// A single generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// Short label for logs: the model id, or the URL when none was given.
    pub name: String,
    pub url: String,
}

impl ProviderEndpoint {
    /// Resolve a config entry. Bare model ids (`org/model`) are appended to
    /// `base_url`; anything containing a scheme is used as-is.
    #[must_use]
    pub fn resolve(entry: &str, base_url: &str) -> Self {
        let entry = entry.trim();
        if entry.contains("://") {
            return Self {
                name: entry.to_string(),
                url: entry.to_string(),
            };
        }
        let id = entry.trim_matches('/');
        Self {
            name: id.to_string(),
            url: format!("{}/{id}", base_url.trim_end_matches('/')),
        }
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Non-empty ordered endpoint list: the primary, then fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<ProviderEndpoint>,
}

impl EndpointSet {
    pub fn new(endpoints: Vec<ProviderEndpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::invalid_input(
                "endpoint list needs at least a primary endpoint",
            ));
        }
        Ok(Self { endpoints })
    }

    #[must_use]
    pub fn primary(&self) -> &ProviderEndpoint {
        &self.endpoints[0]
    }

    #[must_use]
    pub fn fallbacks(&self) -> &[ProviderEndpoint] {
        &self.endpoints[1..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderEndpoint> {
        self.endpoints.iter()
    }
}

/// Everything the dispatcher needs for one media kind.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub kind: MediaKind,
    pub endpoints: EndpointSet,
    /// Per-attempt limit.
    pub timeout: Duration,
    /// Pause before the single retry of the primary.
    pub retry_backoff: Duration,
    pub defaults: BTreeMap<String, Value>,
}

impl Pipeline {
    pub fn from_config(kind: MediaKind, config: &PipelineConfig, base_url: &str) -> Result<Self> {
        let endpoints = config
            .endpoints
            .iter()
            .filter(|e| !e.trim().is_empty())
            .map(|e| ProviderEndpoint::resolve(e, base_url))
            .collect();
        Ok(Self {
            kind,
            endpoints: EndpointSet::new(endpoints)?,
            timeout: Duration::from_secs(config.timeout_secs),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
            defaults: config.defaults.clone(),
        })
    }
}
