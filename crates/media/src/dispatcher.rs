//! Primary → retry → fallback dispatch for media generation.
//!
//! Each request walks a small state machine:
//!
//! 1. `Primary`: first attempt on the primary endpoint.
//! 2. `Retry`: only after a "model loading" (503) or timeout on the primary,
//!    wait the pipeline backoff and try the primary once more.
//! 3. `Fallback(n)`: each fallback in order, exactly once, no retry.
//!
//! The first success wins. Every attempt is logged and published to the
//! audit registry; nothing here panics or returns `Err` to the caller.

use std::{fmt, sync::Arc, time::Duration};

use {
    bytes::Bytes,
    hinata_common::{AuditEvent, AuditRegistry},
    hinata_config::GenerationConfig,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    endpoint::{Pipeline, ProviderEndpoint},
    error::{ProviderError, Result},
    provider::{HttpMediaProvider, MediaProvider},
    request::{MediaKind, MediaRequest},
};

/// Position in the dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Retry,
    /// 1-based index into the fallback list.
    Fallback(usize),
}

impl Tier {
    /// Where to go after a failed attempt at this tier, if anywhere.
    #[must_use]
    pub fn next(self, error: &ProviderError, fallback_count: usize) -> Option<Self> {
        let next_fallback = match self {
            Self::Primary if error.is_retryable() => return Some(Self::Retry),
            Self::Primary | Self::Retry => 1,
            Self::Fallback(n) => n + 1,
        };
        (next_fallback <= fallback_count).then_some(Self::Fallback(next_fallback))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Retry => f.write_str("retry"),
            Self::Fallback(n) => write!(f, "fallback {n}"),
        }
    }
}

/// One attempt as it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub tier: Tier,
    pub endpoint: String,
    pub error: Option<ProviderError>,
    pub elapsed: Duration,
}

impl AttemptRecord {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Why no media came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The provider credential is missing. No attempt was made.
    NotConfigured,
    /// The request was rejected before any attempt (e.g. empty prompt).
    InvalidRequest(String),
    /// Every endpoint was tried and failed.
    Exhausted {
        attempts: usize,
        last_error: ProviderError,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("media generation is not configured"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "all endpoints failed after {attempts} attempt(s); last: {last_error}"),
        }
    }
}

/// Outcome of one generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success(Bytes),
    Failure(FailureReason),
}

impl GenerationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Success(bytes) => Some(bytes),
            Self::Failure(_) => None,
        }
    }
}

/// Result plus the attempt trail that produced it.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub result: GenerationResult,
    pub attempts: Vec<AttemptRecord>,
}

/// Stateless across requests; safe to share behind an `Arc` and call
/// concurrently.
pub struct GenerationDispatcher {
    provider: Arc<dyn MediaProvider>,
    image: Pipeline,
    video: Pipeline,
    audit: Option<Arc<AuditRegistry>>,
}

impl GenerationDispatcher {
    #[must_use]
    pub fn new(provider: Arc<dyn MediaProvider>, image: Pipeline, video: Pipeline) -> Self {
        Self {
            provider,
            image,
            video,
            audit: None,
        }
    }

    /// Dispatcher over the hosted inference API described by `config`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let base = &config.inference_base_url;
        Ok(Self::new(
            Arc::new(HttpMediaProvider::from_config(config)),
            Pipeline::from_config(MediaKind::Image, &config.image, base)?,
            Pipeline::from_config(MediaKind::Video, &config.video, base)?,
        ))
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditRegistry>) -> Self {
        self.audit = Some(audit);
        self
    }

    #[must_use]
    pub fn pipeline(&self, kind: MediaKind) -> &Pipeline {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn generate(&self, request: &MediaRequest) -> GenerationResult {
        self.dispatch(request).await.result
    }

    /// Run the full primary/retry/fallback sequence for `request`.
    pub async fn dispatch(&self, request: &MediaRequest) -> Dispatch {
        let pipeline = self.pipeline(request.kind);

        if let Err(e) = request.validate() {
            let reason = FailureReason::InvalidRequest(e.to_string());
            return self.finish(request, GenerationResult::Failure(reason), Vec::new());
        }
        if !self.provider.is_configured() {
            warn!(kind = %request.kind, "media provider credential missing");
            return self.finish(
                request,
                GenerationResult::Failure(FailureReason::NotConfigured),
                Vec::new(),
            );
        }

        let payload = request.payload(&pipeline.defaults);
        let fallbacks = pipeline.endpoints.fallbacks();
        let mut attempts = Vec::new();
        let mut tier = Tier::Primary;

        loop {
            let endpoint = match tier {
                Tier::Primary | Tier::Retry => pipeline.endpoints.primary(),
                Tier::Fallback(n) => &fallbacks[n - 1],
            };

            let started = Instant::now();
            let outcome = self.attempt(pipeline, endpoint, &payload).await;
            let elapsed = started.elapsed();

            let error = match outcome {
                Ok(bytes) => {
                    info!(
                        kind = %request.kind,
                        endpoint = %endpoint,
                        tier = %tier,
                        bytes = bytes.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "media generated"
                    );
                    attempts.push(self.record(pipeline, tier, endpoint, None, elapsed));
                    return self.finish(request, GenerationResult::Success(bytes), attempts);
                },
                Err(error) => error,
            };

            warn!(
                kind = %request.kind,
                endpoint = %endpoint,
                tier = %tier,
                error = %error,
                "media attempt failed"
            );
            let next = tier.next(&error, fallbacks.len());
            attempts.push(self.record(pipeline, tier, endpoint, Some(error.clone()), elapsed));

            let Some(next) = next else {
                let reason = FailureReason::Exhausted {
                    attempts: attempts.len(),
                    last_error: error,
                };
                return self.finish(request, GenerationResult::Failure(reason), attempts);
            };
            if next == Tier::Retry {
                info!(
                    kind = %pipeline.kind,
                    endpoint = %endpoint,
                    backoff_secs = pipeline.retry_backoff.as_secs(),
                    "model loading, retrying primary after backoff"
                );
                tokio::time::sleep(pipeline.retry_backoff).await;
            }
            tier = next;
        }
    }

    async fn attempt(
        &self,
        pipeline: &Pipeline,
        endpoint: &ProviderEndpoint,
        payload: &serde_json::Value,
    ) -> std::result::Result<Bytes, ProviderError> {
        match tokio::time::timeout(pipeline.timeout, self.provider.generate(endpoint, payload)).await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(
                    kind = %pipeline.kind,
                    endpoint = %endpoint,
                    timeout_secs = pipeline.timeout.as_secs(),
                    "media attempt timed out"
                );
                Err(ProviderError::Timeout {
                    after: pipeline.timeout,
                })
            },
        }
    }

    fn record(
        &self,
        pipeline: &Pipeline,
        tier: Tier,
        endpoint: &ProviderEndpoint,
        error: Option<ProviderError>,
        elapsed: Duration,
    ) -> AttemptRecord {
        if let Some(audit) = &self.audit {
            audit.publish(AuditEvent::DispatchAttempt {
                kind: pipeline.kind.to_string(),
                endpoint: endpoint.name.clone(),
                tier: tier.to_string(),
                success: error.is_none(),
                error: error.as_ref().map(ToString::to_string),
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        AttemptRecord {
            tier,
            endpoint: endpoint.name.clone(),
            error,
            elapsed,
        }
    }

    fn finish(
        &self,
        request: &MediaRequest,
        result: GenerationResult,
        attempts: Vec<AttemptRecord>,
    ) -> Dispatch {
        if let Some(audit) = &self.audit {
            audit.publish(AuditEvent::GenerationFinished {
                kind: request.kind.to_string(),
                prompt: request.prompt.clone(),
                success: result.is_success(),
                attempts: attempts.len(),
            });
        }
        Dispatch { result, attempts }
    }
}
