//! Generation service client.
//!
//! This module provides the abstraction over the remote text generation
//! model. The [`GenerationService`] trait defines a single non-streaming
//! completion call; [`ChatCompletionsClient`] implements it against any
//! OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! The trait seam exists so that strategies, the classifier and the agent
//! loop can be exercised in tests with scripted doubles.

pub mod chat;

pub use chat::ChatCompletionsClient;

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`).
    pub model: String,
}

/// A message in a conversation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content. `None` for assistant messages that only carry tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional tool call ID (for tool responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Optional tool calls made by the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// A plain message with text content and no tool linkage.
    #[must_use]
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
    /// Tool response.
    Tool,
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call.
    pub id: String,
    /// Type of tool (always "function" for now).
    #[serde(rename = "type")]
    pub call_type: String,
    /// Function details.
    pub function: ToolCallFunction,
}

/// Function details in a tool call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCallFunction {
    /// Function name.
    pub name: String,
    /// Arguments as JSON string.
    pub arguments: String,
}

/// Request to the generation service.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Available tools in OpenAI function schema format.
    pub tools: Vec<serde_json::Value>,
}

impl ChatRequest {
    /// A single-turn request with no tools.
    #[must_use]
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::text(MessageRole::User, text)],
            tools: Vec::new(),
        }
    }
}

/// One completed model turn.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Assistant text, if any.
    pub content: Option<String>,
    /// Tool calls requested by the model, if any.
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// Non-empty assistant text, if present.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Trait for non-streaming generation backends.
///
/// # Errors
///
/// Implementations return an error when the remote service is unreachable
/// or responds with a non-success status after the bounded retry.
#[async_trait::async_trait]
pub trait GenerationService: Send + Sync + std::fmt::Debug {
    async fn complete(&self, req: ChatRequest) -> anyhow::Result<Completion>;
}
