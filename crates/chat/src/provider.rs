use async_trait::async_trait;

use crate::{error::Result, model::ConversationTurn};

/// One chat-completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ConversationTurn],
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Single request/response chat backend. No streaming, no tools.
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Return the assistant's reply text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}
