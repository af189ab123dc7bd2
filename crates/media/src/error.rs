use std::time::Duration;

/// Why a single provider attempt failed.
///
/// The dispatcher only looks at [`ProviderError::is_retryable`]; everything
/// else is carried through for logs and the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// 503-class response: the model is cold or still loading.
    #[error("provider not ready (HTTP {status}): {message}")]
    Transient { status: u16, message: String },

    /// Any other non-200 status, or a 200 without usable media.
    #[error("provider rejected request{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Permanent {
        status: Option<u16>,
        message: String,
    },

    /// The attempt exceeded the pipeline timeout.
    #[error("provider timed out after {}s", after.as_secs())]
    Timeout { after: Duration },

    /// Connection-level failure before a status was received.
    #[error("provider unreachable: {0}")]
    Transport(String),
}

impl ProviderError {
    #[must_use]
    pub fn transient(status: u16, message: impl Into<String>) -> Self {
        Self::Transient {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permanent(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Permanent {
            status,
            message: message.into(),
        }
    }

    /// Whether the primary endpoint earns its one retry after this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }
}

/// Errors raised outside the dispatch loop (bad input, bad config).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    InvalidInput { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ProviderError::transient(503, "loading").is_retryable());
        assert!(
            ProviderError::Timeout {
                after: Duration::from_secs(60)
            }
            .is_retryable()
        );
        assert!(!ProviderError::permanent(Some(404), "not found").is_retryable());
        assert!(!ProviderError::Transport("refused".into()).is_retryable());
    }

    #[test]
    fn permanent_display_with_and_without_status() {
        assert_eq!(
            ProviderError::permanent(Some(400), "bad").to_string(),
            "provider rejected request (HTTP 400): bad"
        );
        assert_eq!(
            ProviderError::permanent(None, "empty body").to_string(),
            "provider rejected request: empty body"
        );
    }
}
