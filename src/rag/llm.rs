//! Chat model abstraction and the OpenAI implementation.

use crate::config::Settings;
use crate::error::{GrunnError, Result, ServiceErrorKind};
use crate::openai::{classify_error, create_client};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token counts reported by the model service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A model reply.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// A chat model that produces one reply per request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion>;

    /// Model name, for logs.
    fn name(&self) -> &str;
}

/// Chat completions through the OpenAI API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    /// Create a chat model from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.api_key();
        let client = create_client(
            api_key.as_deref(),
            Duration::from_secs(settings.openai.timeout_secs),
        )?;
        Ok(Self::new(client, &settings.rag.model, settings.rag.temperature))
    }
}

fn malformed(e: impl std::fmt::Display) -> GrunnError {
    GrunnError::Generation {
        kind: ServiceErrorKind::MalformedRequest,
        message: e.to_string(),
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(malformed)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(malformed)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(malformed)?
            .into(),
    };
    Ok(built)
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(malformed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            GrunnError::Generation {
                kind: classify_error(&e),
                message: e.to_string(),
            }
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| GrunnError::Generation {
                kind: ServiceErrorKind::Unavailable,
                message: "Empty response from model".to_string(),
            })?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        debug!("Model replied with {} chars", content.len());

        Ok(Completion { content, usage })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        let reply = ChatMessage::assistant("a");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "a");
    }

    #[test]
    fn test_request_message_roles() {
        let built = to_request_message(&ChatMessage::assistant("earlier answer")).unwrap();
        assert!(matches!(built, ChatCompletionRequestMessage::Assistant(_)));

        let built = to_request_message(&ChatMessage::user("question")).unwrap();
        assert!(matches!(built, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_from_settings_uses_rag_model() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        settings.rag.model = "gpt-test".to_string();

        let model = OpenAIChatModel::from_settings(&settings).unwrap();
        assert_eq!(model.name(), "gpt-test");
    }
}
