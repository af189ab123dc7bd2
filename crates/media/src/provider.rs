use {
    async_trait::async_trait,
    bytes::Bytes,
    hinata_config::{GenerationConfig, secret_value},
    reqwest::StatusCode,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, trace},
};

use crate::{endpoint::ProviderEndpoint, error::ProviderError};

/// One network attempt against one endpoint.
///
/// Implementations classify failures into [`ProviderError`]; deadlines and
/// the retry/fallback policy belong to the dispatcher.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// `false` when a required credential is missing. The dispatcher then
    /// skips the network entirely.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        endpoint: &ProviderEndpoint,
        payload: &Value,
    ) -> Result<Bytes, ProviderError>;
}

/// Hosted inference API: JSON in, raw media bytes out.
pub struct HttpMediaProvider {
    token: Option<Secret<String>>,
    client: &'static reqwest::Client,
}

impl HttpMediaProvider {
    #[must_use]
    pub fn new(token: Option<Secret<String>>) -> Self {
        Self {
            token,
            client: hinata_common::shared_http_client(),
        }
    }

    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            secret_value(config.huggingface_token.as_ref()).map(|t| Secret::new(t.to_string())),
        )
    }
}

#[async_trait]
impl MediaProvider for HttpMediaProvider {
    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    async fn generate(
        &self,
        endpoint: &ProviderEndpoint,
        payload: &Value,
    ) -> Result<Bytes, ProviderError> {
        debug!(endpoint = %endpoint, "media generation request");
        trace!(body = %payload, "media request body");

        let mut request = self.client.post(&endpoint.url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        let resp = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        classify_response(status, is_json, body)
    }
}

/// Map a finished response onto success or a failure kind.
///
/// 503 means the model is loading. A 200 that carries JSON or nothing at all
/// is not media and counts as a permanent failure.
fn classify_response(status: StatusCode, is_json: bool, body: Bytes) -> Result<Bytes, ProviderError> {
    match status {
        StatusCode::OK if body.is_empty() => {
            Err(ProviderError::permanent(Some(200), "empty response body"))
        },
        StatusCode::OK if is_json => Err(ProviderError::permanent(
            Some(200),
            format!("expected media, got JSON: {}", error_message(&body)),
        )),
        StatusCode::OK => Ok(body),
        StatusCode::SERVICE_UNAVAILABLE => {
            Err(ProviderError::transient(503, error_message(&body)))
        },
        other => Err(ProviderError::permanent(
            Some(other.as_u16()),
            error_message(&body),
        )),
    }
}

/// Pull `{"error": "..."}` out of a body, or fall back to its text.
fn error_message(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<Value>(body)
        && let Some(msg) = json.get("error").and_then(Value::as_str)
    {
        return msg.to_string();
    }
    let text = String::from_utf8_lossy(body);
    hinata_common::audit::truncate(text.trim(), 200)
}
