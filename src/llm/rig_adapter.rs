//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::OneOrMany;
use rig::completion::{CompletionModel, ToolDefinition as RigToolDefinition};
use rig::message::{AssistantContent, Message, ToolResultContent, UserContent};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role, ToolCall,
    ToolCompletionRequest, ToolCompletionResponse, ToolDefinition,
};

/// `LlmProvider` over any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<Reply, LlmError> {
        let (preamble, mut history) = to_rig_messages(messages);
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "conversation has no user or assistant turns".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if !tools.is_empty() {
            builder = builder.tools(tools.iter().map(to_rig_tool).collect());
        }
        if let Some(t) = temperature {
            builder = builder.temperature(f64::from(t));
        }
        if let Some(m) = max_tokens {
            builder = builder.max_tokens(u64::from(m));
        }

        let response = self
            .model
            .completion(builder.build())
            .await
            .map_err(|e| classify_error(self.provider, e.to_string()))?;

        let (content, tool_calls) = from_rig_choice(response.choice);
        let reply = Reply {
            content,
            tool_calls,
            input_tokens: clamp_tokens(response.usage.input_tokens),
            output_tokens: clamp_tokens(response.usage.output_tokens),
        };
        tracing::debug!(
            model = %self.model_name,
            tool_calls = reply.tool_calls.len(),
            input_tokens = reply.input_tokens,
            output_tokens = reply.output_tokens,
            "Completion received"
        );
        Ok(reply)
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        costs::model_cost(&self.model_name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let reply = self
            .send(&request.messages, &[], request.temperature, request.max_tokens)
            .await?;
        Ok(CompletionResponse {
            content: reply.content.unwrap_or_default(),
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let reply = self
            .send(
                &request.messages,
                &request.tools,
                request.temperature,
                request.max_tokens,
            )
            .await?;
        Ok(ToolCompletionResponse {
            finish_reason: FinishReason::for_response(!reply.tool_calls.is_empty()),
            content: reply.content,
            tool_calls: reply.tool_calls,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            response_id: None,
        })
    }
}

struct Reply {
    content: Option<String>,
    tool_calls: Vec<ToolCall>,
    input_tokens: u32,
    output_tokens: u32,
}

/// Split our transcript into rig's preamble plus message history.
/// System messages are joined into the preamble.
fn to_rig_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let mut system: Vec<&str> = Vec::new();
    let mut out = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => system.push(&msg.content),
            Role::User => out.push(Message::user(msg.content.clone())),
            Role::Assistant => {
                let mut content = Vec::new();
                if !msg.content.is_empty() {
                    content.push(AssistantContent::text(msg.content.clone()));
                }
                content.extend(msg.tool_calls.iter().map(|call| {
                    AssistantContent::tool_call(
                        call.id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    )
                }));
                // An assistant turn with neither text nor calls carries nothing.
                if let Ok(content) = OneOrMany::many(content) {
                    out.push(Message::Assistant { id: None, content });
                }
            }
            Role::Tool => {
                let id = msg.tool_call_id.clone().unwrap_or_default();
                out.push(Message::User {
                    content: OneOrMany::one(UserContent::tool_result(
                        id,
                        OneOrMany::one(ToolResultContent::text(msg.content.clone())),
                    )),
                });
            }
        }
    }

    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
    (preamble, out)
}

fn to_rig_tool(tool: &ToolDefinition) -> RigToolDefinition {
    RigToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    }
}

/// Collect reply text and tool calls. Calls without an id get a fresh one so
/// results in the same batch can still be paired.
fn from_rig_choice(choice: OneOrMany<AssistantContent>) -> (Option<String>, Vec<ToolCall>) {
    let mut text: Vec<String> = Vec::new();
    let mut tool_calls = Vec::new();

    for item in choice {
        match item {
            AssistantContent::Text(t) => text.push(t.text),
            AssistantContent::ToolCall(call) => {
                let id = if call.id.trim().is_empty() {
                    format!("call_{}", Uuid::new_v4().simple())
                } else {
                    call.id
                };
                tool_calls.push(ToolCall {
                    id,
                    name: call.function.name,
                    arguments: normalize_arguments(call.function.arguments),
                });
            }
            _ => {}
        }
    }

    let content = Some(text.join("")).filter(|t| !t.is_empty());
    (content, tool_calls)
}

/// Some backends hand arguments back as a JSON-encoded string.
fn normalize_arguments(arguments: serde_json::Value) -> serde_json::Value {
    match arguments {
        serde_json::Value::String(raw) if raw.trim().is_empty() => serde_json::json!({}),
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        }
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    }
}

fn clamp_tokens(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn classify_error(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else if lower.contains("401") || lower.contains("unauthorized") || lower.contains("api key")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        }
    }
}
