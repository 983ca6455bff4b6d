//! Generation step: one provider call that yields a draft and/or capability calls.

use std::sync::Arc;

use serde::Serialize;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, CompletionRequest, LlmProvider, ToolCall, ToolCompletionRequest, ToolDefinition,
};

/// Messages and capability schemas for one generation call.
#[derive(Debug, Clone, Default)]
pub struct ReasoningContext {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

impl ReasoningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Tokens consumed, summed over any number of provider calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// What one generation call produced.
#[derive(Debug, Clone)]
pub struct Draft {
    /// Reply text, if the model wrote any. Blank text is normalized to `None`.
    pub content: Option<String>,
    /// Capability calls, in the order the model issued them.
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

impl Draft {
    /// No capability calls: the generation pass is over.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// Drives the generation model.
pub struct Reasoning {
    llm: Arc<dyn LlmProvider>,
}

impl Reasoning {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Ask for the next draft. With no capabilities on offer this is a
    /// plain completion, which is always final.
    pub async fn respond_with_tools(&self, context: &ReasoningContext) -> Result<Draft, LlmError> {
        if context.tools.is_empty() {
            let response = self
                .llm
                .complete(CompletionRequest::new(context.messages.clone()))
                .await?;
            return Ok(Draft {
                content: non_blank(Some(response.content)),
                tool_calls: Vec::new(),
                usage: TokenUsage::new(response.input_tokens, response.output_tokens),
            });
        }

        let response = self
            .llm
            .complete_with_tools(ToolCompletionRequest::new(
                context.messages.clone(),
                context.tools.clone(),
            ))
            .await?;
        Ok(Draft {
            content: non_blank(response.content),
            tool_calls: response.tool_calls,
            usage: TokenUsage::new(response.input_tokens, response.output_tokens),
        })
    }
}
