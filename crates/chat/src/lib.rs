//! Conversation state and the chat-completion provider behind it.

pub mod error;
pub mod model;
pub mod openai_compat;
pub mod provider;
pub mod session;

pub use {
    error::{Error, Result},
    model::{ConversationTurn, Role},
    openai_compat::OpenAiCompatProvider,
    provider::{ChatCompletionProvider, CompletionRequest},
    session::{ChatSettings, ConversationSession, SessionStore},
};
