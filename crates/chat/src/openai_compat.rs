//! OpenAI-compatible `/chat/completions` client (OpenRouter by default).

use std::time::Duration;

use {
    async_trait::async_trait,
    hinata_config::{ChatConfig, secret_value},
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, trace, warn},
};

use crate::{
    error::{Error, Result},
    provider::{ChatCompletionProvider, CompletionRequest},
};

pub struct OpenAiCompatProvider {
    api_key: Secret<String>,
    base_url: String,
    referer: Option<String>,
    title: Option<String>,
    timeout: Duration,
    client: &'static reqwest::Client,
}

impl OpenAiCompatProvider {
    #[must_use]
    pub fn new(api_key: Secret<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            referer: None,
            title: None,
            timeout: Duration::from_secs(60),
            client: hinata_common::shared_http_client(),
        }
    }

    /// `None` when no API key is configured.
    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Option<Self> {
        let key = secret_value(config.api_key.as_ref())?;
        let mut provider = Self::new(Secret::new(key.to_string()), &config.base_url)
            .with_timeout(Duration::from_secs(config.timeout_secs));
        provider.referer = config.referer.clone();
        provider.title = config.title.clone();
        Some(provider)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attribution headers (`HTTP-Referer`, `X-Title`).
    #[must_use]
    pub fn with_attribution(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|turn| turn.to_openai_value())
            .collect();
        let body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        debug!(
            model = request.model,
            messages_count = messages.len(),
            "chat completion request"
        );
        trace!(body = %body, "chat request body");

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body);
        if let Some(referer) = &self.referer {
            http = http.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            http = http.header("X-Title", title);
        }

        let resp = http.send().await.map_err(|e| Error::upstream(None, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, model = request.model, body = %text, "chat API error");
            return Err(Error::upstream(Some(status.as_u16()), text));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| Error::upstream(Some(status.as_u16()), e))?;
        parse_reply(&json)
    }
}

/// `choices[0].message.content`, trimmed and non-empty.
fn parse_reply(json: &Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::upstream(None, "response has no message content"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::model::ConversationTurn,
        axum::{Router, http::HeaderMap, routing::post},
        std::sync::{Arc, Mutex},
    };

    struct CapturedRequest {
        headers: HeaderMap,
        body: Value,
    }

    async fn start_mock(
        status: u16,
        reply: Value,
    ) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
        let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::default();
        let captured_clone = Arc::clone(&captured);
        let app = Router::new().route(
            "/api/v1/chat/completions",
            post(move |headers: HeaderMap, body: axum::Json<Value>| {
                let cap = Arc::clone(&captured_clone);
                let reply = reply.clone();
                async move {
                    cap.lock().unwrap().push(CapturedRequest {
                        headers,
                        body: body.0,
                    });
                    (
                        axum::http::StatusCode::from_u16(status).unwrap(),
                        axum::Json(reply),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/api/v1"), captured)
    }

    fn completion(text: &str) -> Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        })
    }

    #[tokio::test]
    async fn sends_model_messages_and_attribution() {
        let (base, captured) = start_mock(200, completion(" Hello there! 🌸 ")).await;
        let provider = OpenAiCompatProvider::new(Secret::new("sk-or-test".into()), base)
            .with_attribution(
                Some("https://discord.com".into()),
                Some("Hinata Discord Bot".into()),
            );
        let turns = [
            ConversationTurn::system("be nice"),
            ConversationTurn::user("Sakura: hi"),
        ];

        let reply = provider
            .complete(CompletionRequest {
                model: "google/gemma-3n-e4b-it:free",
                messages: &turns,
                max_tokens: 500,
                temperature: 0.7,
            })
            .await
            .unwrap();

        assert_eq!(reply, "Hello there! 🌸");
        let captured = captured.lock().unwrap();
        let req = &captured[0];
        assert_eq!(req.body["model"], "google/gemma-3n-e4b-it:free");
        assert_eq!(req.body["max_tokens"], 500);
        assert_eq!(req.body["messages"][0]["role"], "system");
        assert_eq!(req.body["messages"][1]["content"], "Sakura: hi");
        assert_eq!(req.headers["authorization"], "Bearer sk-or-test");
        assert_eq!(req.headers["http-referer"], "https://discord.com");
        assert_eq!(req.headers["x-title"], "Hinata Discord Bot");
    }

    #[tokio::test]
    async fn error_status_is_upstream_error() {
        let (base, _) = start_mock(429, serde_json::json!({"error": "rate limited"})).await;
        let provider = OpenAiCompatProvider::new(Secret::new("k".into()), base);

        let err = provider
            .complete(CompletionRequest {
                model: "m",
                messages: &[ConversationTurn::user("x")],
                max_tokens: 10,
                temperature: 0.0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { status: Some(429), .. }));
    }

    #[test]
    fn empty_content_is_an_error() {
        assert!(parse_reply(&completion("   ")).is_err());
        assert!(parse_reply(&serde_json::json!({"choices": []})).is_err());
        assert_eq!(parse_reply(&completion("ok")).unwrap(), "ok");
    }

    #[test]
    fn from_config_requires_key() {
        assert!(OpenAiCompatProvider::from_config(&ChatConfig::default()).is_none());
        let cfg = ChatConfig {
            api_key: Some(Secret::new("sk".into())),
            ..ChatConfig::default()
        };
        assert!(OpenAiCompatProvider::from_config(&cfg).is_some());
    }
}
