//! Judgment step: scores a candidate reply against the incoming message.
//!
//! The `Judge` trait is the seam the orchestrator evaluates through; `LlmJudge`
//! is the production implementation that asks a model for a structured JSON
//! verdict.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::llm::reasoning::TokenUsage;

/// Max tokens for the judgment call.
const JUDGE_MAX_TOKENS: u32 = 800;

/// Temperature for judgment (deterministic-ish).
const JUDGE_TEMPERATURE: f32 = 0.0;

/// Structured quality judgment of one candidate reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    /// Overall quality score, nominally 1 to 10.
    pub score: f64,
    #[serde(default)]
    pub professional_tone: bool,
    #[serde(default)]
    pub clarity: bool,
    #[serde(default)]
    pub completeness: bool,
    #[serde(default)]
    pub safety: bool,
    #[serde(default)]
    pub relevance: bool,
    #[serde(default)]
    pub feedback: String,
    /// The judge's own approval claim. Advisory only: the orchestrator
    /// re-derives approval from `score`.
    #[serde(default, rename = "is_approved")]
    pub approved: bool,
}

/// A verdict together with the tokens spent producing it.
#[derive(Debug, Clone)]
pub struct Judgment {
    pub verdict: EvaluationVerdict,
    pub usage: TokenUsage,
}

/// Produces a structured verdict for a candidate reply.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        source_message: &str,
        candidate_response: &str,
    ) -> Result<Judgment, LlmError>;

    /// Cost per input/output token of the backing model, for run estimates.
    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }
}

/// Judge backed by an LLM returning a JSON object.
pub struct LlmJudge {
    llm: Arc<dyn LlmProvider>,
    approval_threshold: f64,
}

impl LlmJudge {
    pub fn new(llm: Arc<dyn LlmProvider>, approval_threshold: f64) -> Self {
        Self {
            llm,
            approval_threshold,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    fn cost_per_token(&self) -> (Decimal, Decimal) {
        self.llm.cost_per_token()
    }

    async fn judge(
        &self,
        source_message: &str,
        candidate_response: &str,
    ) -> Result<Judgment, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_judge_system_prompt()),
            ChatMessage::user(build_judge_user_prompt(
                source_message,
                candidate_response,
                self.approval_threshold,
            )),
        ])
        .with_temperature(JUDGE_TEMPERATURE)
        .with_max_tokens(JUDGE_MAX_TOKENS);

        let response = self.llm.complete(request).await?;

        let verdict = parse_verdict(&response.content).map_err(|reason| {
            warn!(
                raw_response = %response.content,
                error = %reason,
                "Failed to parse evaluation verdict"
            );
            LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason,
            }
        })?;

        Ok(Judgment {
            verdict,
            usage: TokenUsage {
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
            },
        })
    }
}

fn build_judge_system_prompt() -> String {
    "You are a strict but fair evaluator of professional correspondence. \
     You always answer with a single JSON object and nothing else."
        .to_string()
}

fn build_judge_user_prompt(source_message: &str, candidate: &str, threshold: f64) -> String {
    format!(
        "You are evaluating a Career Assistant AI Agent's response to an employer message.\n\n\
         EMPLOYER'S ORIGINAL MESSAGE:\n{source_message}\n\n\
         AGENT'S RESPONSE TO EVALUATE:\n{candidate}\n\n\
         Evaluate the response on these criteria:\n\
         1. Professional tone: is it professional, polite, and appropriate?\n\
         2. Clarity: is it clear and easy to understand?\n\
         3. Completeness: does it fully address the employer's message?\n\
         4. Safety: are there any hallucinations, false claims, or inappropriate commitments?\n\
         5. Relevance: is the response relevant to what the employer asked?\n\n\
         Score from 1 to 10. Approve if score >= {threshold}.\n\
         Provide detailed feedback for any areas that need improvement.\n\n\
         Respond with a JSON object with exactly these fields:\n\
         {{\"score\": number, \"professional_tone\": bool, \"clarity\": bool, \
         \"completeness\": bool, \"safety\": bool, \"relevance\": bool, \
         \"feedback\": string, \"is_approved\": bool}}"
    )
}

/// Parse the judge's reply into a verdict.
fn parse_verdict(raw: &str) -> Result<EvaluationVerdict, String> {
    let json = extract_json_object(raw);
    let verdict: EvaluationVerdict =
        serde_json::from_str(json).map_err(|e| format!("invalid verdict JSON: {e}"))?;
    if !verdict.score.is_finite() {
        return Err(format!("score is not a finite number: {}", verdict.score));
    }
    Ok(verdict)
}

/// Pull the verdict object out of a reply that may wrap it in a markdown
/// fence or surround it with prose.
fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();
    let body = fenced_body(trimmed).unwrap_or(trimmed);

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => body,
    }
}

/// Contents of the first ```json (or bare ```) fence, if closed.
fn fenced_body(text: &str) -> Option<&str> {
    let (open, skip) = match text.find("```json") {
        Some(i) => (i, "```json".len()),
        None => (text.find("```")?, "```".len()),
    };
    let after = &text[open + skip..];
    let close = after.find("```")?;
    Some(after[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{
        CompletionResponse, FinishReason, ToolCompletionRequest, ToolCompletionResponse,
    };
    use rust_decimal::Decimal;

    #[test]
    fn parse_full_verdict() {
        let raw = r#"{"score": 8.5, "professional_tone": true, "clarity": true,
            "completeness": false, "safety": true, "relevance": true,
            "feedback": "Mention availability.", "is_approved": true}"#;
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.score, 8.5);
        assert!(!v.completeness);
        assert!(v.approved);
        assert_eq!(v.feedback, "Mention availability.");
    }

    #[test]
    fn parse_verdict_in_markdown_fence() {
        let raw = "Here you go:\n```json\n{\"score\": 6, \"feedback\": \"too long\"}\n```";
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.score, 6.0);
        assert!(!v.approved);
        assert!(!v.safety);
    }

    #[test]
    fn parse_verdict_with_surrounding_prose() {
        let raw = "Verdict: {\"score\": 9, \"is_approved\": true} end";
        assert_eq!(parse_verdict(raw).unwrap().score, 9.0);
    }

    #[test]
    fn parse_verdict_followed_by_trailing_prose() {
        let v = parse_verdict(r#"{"score": 8, "is_approved": true} hope this helps"#).unwrap();
        assert_eq!(v.score, 8.0);
    }

    #[test]
    fn parse_verdict_in_bare_fence() {
        let raw = "```\n{\"score\": 4, \"feedback\": \"vague\"}\n```";
        assert_eq!(parse_verdict(raw).unwrap().feedback, "vague");
    }

    #[test]
    fn parse_rejects_missing_score() {
        assert!(parse_verdict(r#"{"feedback": "no score"}"#).is_err());
    }

    #[test]
    fn parse_rejects_prose_only() {
        assert!(parse_verdict("Looks great to me!").is_err());
    }

    #[test]
    fn user_prompt_mentions_threshold_and_both_texts() {
        let prompt = build_judge_user_prompt("Hi, interview?", "Yes, gladly.", 7.0);
        assert!(prompt.contains("Hi, interview?"));
        assert!(prompt.contains("Yes, gladly."));
        assert!(prompt.contains("score >= 7"));
    }

    struct FixedLlm {
        content: String,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed-judge"
        }
        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            assert_eq!(request.temperature, Some(JUDGE_TEMPERATURE));
            Ok(CompletionResponse {
                content: self.content.clone(),
                input_tokens: 40,
                output_tokens: 20,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            unimplemented!("judge never offers tools")
        }
    }

    #[tokio::test]
    async fn llm_judge_returns_verdict_and_usage() {
        let judge = LlmJudge::new(
            Arc::new(FixedLlm {
                content: r#"{"score": 7, "feedback": "ok", "is_approved": true}"#.into(),
            }),
            7.0,
        );
        let judgment = judge.judge("msg", "reply").await.unwrap();
        assert_eq!(judgment.verdict.score, 7.0);
        assert_eq!(judgment.usage.total(), 60);
    }

    #[tokio::test]
    async fn llm_judge_unparseable_is_invalid_response() {
        let judge = LlmJudge::new(
            Arc::new(FixedLlm {
                content: "I cannot comply".into(),
            }),
            7.0,
        );
        let err = judge.judge("msg", "reply").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
