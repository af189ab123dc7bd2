//! Keyless image-by-URL generation for the basic `generate` command.
//!
//! The service renders on GET, so the "result" is a URL. A probe request
//! confirms the URL resolves before it is handed to the user.

use std::time::Duration;

use {
    hinata_config::GenerationConfig,
    tracing::{debug, warn},
};

use crate::error::ProviderError;

pub struct QuickImageProvider {
    base_url: String,
    timeout: Duration,
    client: &'static reqwest::Client,
}

impl QuickImageProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            client: hinata_common::shared_http_client(),
        }
    }

    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            &config.quick_image_base_url,
            Duration::from_secs(config.image.timeout_secs),
        )
    }

    /// `<base>/prompt/<percent-encoded prompt>`.
    #[must_use]
    pub fn image_url(&self, prompt: &str) -> String {
        format!(
            "{}/prompt/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(prompt.trim())
        )
    }

    /// Probe the image URL and return it when the service answers 200.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = self.image_url(prompt);
        debug!(%url, "probing quick image");
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        after: self.timeout,
                    }
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK {
            return Ok(url);
        }
        warn!(%status, "quick image service refused prompt");
        Err(ProviderError::permanent(
            Some(status.as_u16()),
            "image service did not return an image",
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{Router, extract::Path, http::StatusCode, routing::get},
    };

    async fn start_mock() -> String {
        let app = Router::new().route(
            "/prompt/{prompt}",
            get(|Path(prompt): Path<String>| async move {
                if prompt.contains("forbidden") {
                    (StatusCode::BAD_REQUEST, Vec::new())
                } else {
                    (StatusCode::OK, b"jpeg".to_vec())
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn prompt_is_percent_encoded() {
        let quick = QuickImageProvider::new("https://image.pollinations.ai/", Duration::from_secs(5));
        assert_eq!(
            quick.image_url(" a cat & a dog "),
            "https://image.pollinations.ai/prompt/a%20cat%20%26%20a%20dog"
        );
    }

    #[tokio::test]
    async fn ok_probe_returns_url() {
        let base = start_mock().await;
        let quick = QuickImageProvider::new(&base, Duration::from_secs(5));
        let url = quick.generate("sunset over hills").await.unwrap();
        assert_eq!(url, format!("{base}/prompt/sunset%20over%20hills"));
    }

    #[tokio::test]
    async fn non_ok_probe_is_permanent_failure() {
        let base = start_mock().await;
        let quick = QuickImageProvider::new(&base, Duration::from_secs(5));
        let err = quick.generate("forbidden thing").await.unwrap_err();
        assert!(matches!(err, ProviderError::Permanent { status: Some(400), .. }));
    }
}
