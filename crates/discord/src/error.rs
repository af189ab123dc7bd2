use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("discord token is not configured (set DISCORD_TOKEN)")]
    MissingToken,

    #[error("{message}")]
    InvalidOption { message: String },

    #[error(transparent)]
    Media(#[from] hinata_media::Error),

    #[error(transparent)]
    Serenity(#[from] serenity::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
