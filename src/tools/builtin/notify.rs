//! Notification tools the generation step may call while drafting a reply.
//!
//! - `notify_new_employer_message`: announce that a message arrived
//! - `notify_response_approved`: announce the final reply (its `response_text`
//!   argument is what the run returns)
//! - `flag_unknown_question`: escalate a question for human review

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::RunContext;
use crate::notify::{NotificationReceipt, Notifier};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_f64, require_str};

pub const NOTIFY_NEW_MESSAGE: &str = "notify_new_employer_message";
pub const NOTIFY_RESPONSE_APPROVED: &str = "notify_response_approved";
pub const FLAG_UNKNOWN_QUESTION: &str = "flag_unknown_question";

/// Maximum characters of the incoming message included in a notification.
const PREVIEW_CHARS: usize = 300;

fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn receipt_value(receipt: &NotificationReceipt) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(receipt)
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to encode receipt: {e}")))
}

/// Register the three notification tools as protected built-ins.
/// Returns false if any of them could not be registered.
pub fn register_builtin_tools(
    registry: &ToolRegistry,
    notifier: Arc<dyn Notifier>,
    candidate_name: &str,
) -> bool {
    let tools: [Arc<dyn Tool>; 3] = [
        Arc::new(NotifyNewMessageTool::new(Arc::clone(&notifier))),
        Arc::new(NotifyResponseApprovedTool::new(Arc::clone(&notifier))),
        Arc::new(FlagUnknownQuestionTool::new(notifier, candidate_name)),
    ];

    let mut all_registered = true;
    for tool in tools {
        let name = tool.name().to_string();
        if !registry.register_builtin(tool) {
            tracing::error!(tool = %name, "Built-in capability missing from registry");
            all_registered = false;
        }
    }
    all_registered
}

/// Tells the represented user a new employer message arrived.
pub struct NotifyNewMessageTool {
    notifier: Arc<dyn Notifier>,
}

impl NotifyNewMessageTool {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for NotifyNewMessageTool {
    fn name(&self) -> &str {
        NOTIFY_NEW_MESSAGE
    }

    fn description(&self) -> &str {
        "Use this tool to send a notification when a new employer message arrives. \
         Call this at the start of processing every new employer message."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "employer_name": {
                    "type": "string",
                    "description": "The name of the employer or company that sent the message"
                },
                "message_preview": {
                    "type": "string",
                    "description": "A brief preview of the employer's message"
                }
            },
            "required": ["employer_name", "message_preview"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let employer = require_str(&params, "employer_name")?;
        let message_preview = require_str(&params, "message_preview")?;

        let subject = format!("New message from {employer}");
        let body = format!(
            "You received a new message from {employer}.\n\nPreview:\n{}",
            preview(message_preview)
        );
        let receipt = self.notifier.notify(&subject, &body).await;
        tracing::info!(employer = %employer, "New employer message notification");

        Ok(ToolOutput::success(receipt_value(&receipt)?, start.elapsed()))
    }
}

/// Tells the represented user a reply is ready. The `response_text` argument
/// is the authoritative final answer for the run.
pub struct NotifyResponseApprovedTool {
    notifier: Arc<dyn Notifier>,
}

impl NotifyResponseApprovedTool {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for NotifyResponseApprovedTool {
    fn name(&self) -> &str {
        NOTIFY_RESPONSE_APPROVED
    }

    fn description(&self) -> &str {
        "Use this tool to send a notification when the final response has been approved \
         by the evaluator and is ready to be sent to the employer."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "employer_name": {
                    "type": "string",
                    "description": "The name of the employer or company"
                },
                "response_text": {
                    "type": "string",
                    "description": "The full approved response text"
                },
                "evaluation_score": {
                    "type": "number",
                    "description": "The evaluation score out of 10"
                }
            },
            "required": ["employer_name", "response_text", "evaluation_score"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let employer = require_str(&params, "employer_name")?;
        let response_text = require_str(&params, "response_text")?;
        let score = require_f64(&params, "evaluation_score")?;

        let subject = format!("Response approved for {employer} (Score: {score}/10)");
        let body = format!(
            "Your response to {employer} has been approved by the evaluator.\n\n\
             Evaluation Score: {score}/10\n\n\
             Response:\n{response_text}"
        );
        let receipt = self.notifier.notify(&subject, &body).await;
        tracing::info!(employer = %employer, score, "Response approved notification");

        Ok(ToolOutput::success(receipt_value(&receipt)?, start.elapsed()))
    }
}

/// Escalates a question the assistant cannot answer confidently.
pub struct FlagUnknownQuestionTool {
    notifier: Arc<dyn Notifier>,
    description: String,
}

impl FlagUnknownQuestionTool {
    pub fn new(notifier: Arc<dyn Notifier>, candidate_name: &str) -> Self {
        let description = format!(
            "Use this tool when you encounter a question you cannot confidently answer. \
             This includes: salary negotiations, legal questions (non-compete, contracts), \
             deep technical questions outside {candidate_name}'s expertise, ambiguous job \
             offers, or any question where your confidence is low. Always use this tool \
             rather than making up an answer."
        );
        Self {
            notifier,
            description,
        }
    }
}

#[async_trait]
impl Tool for FlagUnknownQuestionTool {
    fn name(&self) -> &str {
        FLAG_UNKNOWN_QUESTION
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question that cannot be confidently answered"
                },
                "reason": {
                    "type": "string",
                    "description": "Why this question cannot be answered (e.g., 'salary_negotiation', 'legal_question', 'outside_expertise', 'ambiguous_offer', 'low_confidence')"
                },
                "confidence_score": {
                    "type": "number",
                    "description": "Your confidence in answering this question, from 0.0 to 1.0. Use this tool when confidence is below 0.5."
                }
            },
            "required": ["question", "reason", "confidence_score"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let question = require_str(&params, "question")?;
        let reason = require_str(&params, "reason")?;
        let confidence = require_f64(&params, "confidence_score")?;
        let percent = format!("{:.0}%", confidence * 100.0);

        let subject =
            format!("⚠️ Unknown Question — Human Intervention Needed (Confidence: {percent})");
        let body = format!(
            "The Career Agent encountered a question it cannot confidently answer.\n\n\
             Question: {question}\n\n\
             Reason: {reason}\n\n\
             Confidence Score: {percent}\n\n\
             Action Required: Please review and provide a manual response."
        );
        let receipt = self.notifier.notify(&subject, &body).await;
        tracing::warn!(
            question = %question,
            reason = %reason,
            confidence,
            "Unknown question flagged"
        );

        let mut result = receipt_value(&receipt)?;
        if let Some(obj) = result.as_object_mut() {
            obj.insert("flagged".into(), serde_json::Value::Bool(true));
            obj.insert("question".into(), question.into());
            obj.insert("reason".into(), reason.into());
            obj.insert("confidence_score".into(), confidence.into());
        }
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DeliveryStatus;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, subject: &str, body: &str) -> NotificationReceipt {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            NotificationReceipt {
                status: DeliveryStatus::LoggedToConsole,
                timestamp: "2024-01-01 00:00:00".into(),
                subject: subject.to_string(),
                error: None,
            }
        }
    }

    #[tokio::test]
    async fn new_message_preview_is_truncated() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tool = NotifyNewMessageTool::new(notifier.clone());
        let long = "é".repeat(500);
        let output = tool
            .execute(
                json!({ "employer_name": "Acme", "message_preview": long }),
                &RunContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(output.result["status"], "logged_to_console");
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].0, "New message from Acme");
        let preview_part = sent[0].1.split("Preview:\n").nth(1).unwrap();
        assert_eq!(preview_part.chars().count(), PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn approved_subject_includes_score() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tool = NotifyResponseApprovedTool::new(notifier.clone());
        tool.execute(
            json!({
                "employer_name": "Acme",
                "response_text": "Thanks for reaching out!",
                "evaluation_score": 8.5
            }),
            &RunContext::default(),
        )
        .await
        .unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].0, "Response approved for Acme (Score: 8.5/10)");
        assert!(sent[0].1.ends_with("Response:\nThanks for reaching out!"));
    }

    #[tokio::test]
    async fn flag_result_carries_question_details() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tool = FlagUnknownQuestionTool::new(notifier.clone(), "Ada");
        assert!(tool.description().contains("Ada's expertise"));

        let output = tool
            .execute(
                json!({
                    "question": "What is your salary expectation?",
                    "reason": "salary_negotiation",
                    "confidence_score": 0.2
                }),
                &RunContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(output.result["flagged"], true);
        assert_eq!(output.result["reason"], "salary_negotiation");
        assert_eq!(output.result["confidence_score"], 0.2);
        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].0.contains("(Confidence: 20%)"));
    }

    #[tokio::test]
    async fn missing_argument_is_invalid() {
        let tool = FlagUnknownQuestionTool::new(Arc::new(RecordingNotifier::default()), "Ada");
        let err = tool
            .execute(json!({ "question": "?" }), &RunContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn registers_three_protected_tools() {
        let registry = ToolRegistry::new();
        assert!(register_builtin_tools(
            &registry,
            Arc::new(RecordingNotifier::default()),
            "Ada"
        ));
        assert_eq!(
            registry.names().await,
            vec![
                FLAG_UNKNOWN_QUESTION.to_string(),
                NOTIFY_NEW_MESSAGE.to_string(),
                NOTIFY_RESPONSE_APPROVED.to_string(),
            ]
        );
    }
}
