//! Per-run conversation memory.
//!
//! Scoped to a single agent run and recreated fresh per request; never
//! persisted across process restarts.

use crate::llm::{Message, MessageRole, ToolCall};

/// Ordered transcript of one agent run.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with a system prompt.
    #[must_use]
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut memory = Self::new();
        memory.messages.push(Message::text(MessageRole::System, prompt));
        memory
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::text(MessageRole::User, content));
    }

    /// Record an assistant turn that requested tool calls.
    pub fn add_assistant_with_tool_calls(
        &mut self,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        self.messages.push(Message {
            role: MessageRole::Assistant,
            content,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        });
    }

    /// Record the observed result of one tool call.
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        });
    }

    /// The transcript so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
