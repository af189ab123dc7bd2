use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required credential is missing. Never retried; the message is
    /// meant to be shown to the user as-is.
    #[error("{message}")]
    Configuration { message: String },

    /// Any failure from the chat-completion provider.
    #[error("chat provider error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn upstream(status: Option<u16>, message: impl std::fmt::Display) -> Self {
        Self::Upstream {
            status,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
