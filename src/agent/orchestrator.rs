//! Orchestration loop: generate, dispatch, evaluate, revise.
//!
//! A run is a single sequential control flow over a [`RunState`]:
//!
//! ```text
//! Generating ──calls──▶ Dispatching ──▶ Generating
//!     │
//!     └─no calls─▶ Evaluating ──approved / budget spent──▶ Done
//!                      │
//!                      └─otherwise─▶ Revising ──▶ Generating
//! ```
//!
//! Provider failures propagate to the caller unretried. Capability failures
//! become error results on the transcript and the run continues.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::agent::dispatcher::ToolDispatcher;
use crate::agent::evaluation::Evaluation;
use crate::agent::prompts::{RevisionNote, generation_instruction};
use crate::agent::revision::{RevisionController, RevisionDecision};
use crate::agent::selection::ResponseSelector;
use crate::agent::state::{RunPhase, RunState, Termination};
use crate::config::OrchestratorConfig;
use crate::error::{Error, RunError};
use crate::llm::{Draft, Judge, LlmProvider, Reasoning, ReasoningContext, TokenUsage, ToolCall};
use crate::profile::Profile;
use crate::tools::ToolRegistry;
use crate::tools::builtin::notify::FLAG_UNKNOWN_QUESTION;

/// Result of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// Best-effort reply, returned whether or not it was approved.
    pub final_response: String,
    pub score: f64,
    pub feedback: String,
    pub approved: bool,
    pub needs_human_review: bool,
    pub revision_count: u32,
    pub termination: Termination,
    /// The last evaluation, as rendered onto the transcript.
    pub evaluation: Evaluation,
    /// Tokens across every provider call of the run.
    pub usage: TokenUsage,
    pub generation_usage: TokenUsage,
    pub judgment_usage: TokenUsage,
    pub estimated_cost: Decimal,
    /// Full run state, including the transcript and phase history.
    pub state: RunState,
}

impl RunOutcome {
    /// Text of the last evaluation entry.
    pub fn evaluation_report(&self) -> String {
        self.evaluation.report()
    }

    pub fn is_forced_acceptance(&self) -> bool {
        self.termination == Termination::ForcedAcceptance
    }
}

/// Drives runs against a generation provider and a judge.
pub struct Orchestrator {
    reasoning: Reasoning,
    judge: Arc<dyn Judge>,
    dispatcher: ToolDispatcher,
    selector: ResponseSelector,
    revisions: RevisionController,
    profile: Profile,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Fails with `ConfigError::InvalidValue` if `config` does not validate.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        judge: Arc<dyn Judge>,
        tools: Arc<ToolRegistry>,
        profile: Profile,
        config: OrchestratorConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            reasoning: Reasoning::new(llm),
            judge,
            dispatcher: ToolDispatcher::new(tools, FLAG_UNKNOWN_QUESTION),
            selector: ResponseSelector::new(&config.selection),
            revisions: RevisionController::new(config.max_revisions),
            profile,
            config,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process one incoming message to completion.
    ///
    /// Each call creates an independent run; nothing is shared between calls
    /// except the capability registry.
    pub async fn run(&self, incoming: &str) -> Result<RunOutcome, Error> {
        // Blank input is rejected; anything else is kept verbatim.
        if incoming.trim().is_empty() {
            return Err(RunError::EmptyMessage.into());
        }

        let mut state = RunState::new(self.instruction_for(None), incoming);
        tracing::info!(
            run_id = %state.run_id,
            chars = incoming.chars().count(),
            "Run started"
        );

        let mut generation_usage = TokenUsage::default();
        let mut judgment_usage = TokenUsage::default();
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut tool_rounds = 0usize;
        let mut last_evaluation: Option<Evaluation> = None;

        loop {
            match state.phase {
                RunPhase::Generating => {
                    let draft = self.generate(&state).await?;
                    generation_usage.add(draft.usage);
                    state.usage.add(draft.usage);

                    let revision = state.revision_count();
                    if draft.is_final() {
                        state.transcript.push_draft(draft.content, Vec::new(), revision);
                        state.transition_to(RunPhase::Evaluating, Some("final draft".into()))?;
                    } else {
                        tool_rounds += 1;
                        if tool_rounds > self.config.max_tool_rounds {
                            tracing::warn!(
                                run_id = %state.run_id,
                                rounds = tool_rounds,
                                "Generation keeps requesting capabilities, giving up"
                            );
                            return Err(RunError::ToolLoopExceeded {
                                rounds: self.config.max_tool_rounds,
                            }
                            .into());
                        }
                        pending = draft.tool_calls.clone();
                        state
                            .transcript
                            .push_draft(draft.content, draft.tool_calls, revision);
                        state.transition_to(
                            RunPhase::Dispatching,
                            Some(format!("{} capability call(s)", pending.len())),
                        )?;
                    }
                }
                RunPhase::Dispatching => {
                    let calls = std::mem::take(&mut pending);
                    let results = self.dispatcher.dispatch(&calls, &mut state).await;
                    let failed = results.iter().filter(|r| r.is_error()).count();
                    tracing::info!(
                        run_id = %state.run_id,
                        calls = results.len(),
                        failed,
                        "Capabilities dispatched"
                    );
                    state.transition_to(RunPhase::Generating, None)?;
                }
                RunPhase::Evaluating => {
                    tool_rounds = 0;
                    let candidate = self.selector.select(&state.transcript);
                    let judgment = self
                        .judge
                        .judge(state.source_message(), &candidate.text)
                        .await?;
                    judgment_usage.add(judgment.usage);
                    state.usage.add(judgment.usage);

                    let evaluation =
                        Evaluation::from_verdict(judgment.verdict, self.config.approval_threshold);
                    tracing::info!(
                        run_id = %state.run_id,
                        score = evaluation.score,
                        approved = evaluation.approved,
                        tone = evaluation.professional_tone,
                        clarity = evaluation.clarity,
                        completeness = evaluation.completeness,
                        safety = evaluation.safety,
                        relevance = evaluation.relevance,
                        source = ?candidate.source,
                        "Evaluation complete"
                    );
                    tracing::debug!(feedback = %evaluation.feedback, "Evaluator feedback");

                    let revision = state.revision_count();
                    state.transcript.push_evaluation(evaluation.report(), revision);
                    state.set_evaluation(evaluation.clone());
                    last_evaluation = Some(evaluation);

                    match self.revisions.decide(&state) {
                        RevisionDecision::Stop(termination) => {
                            state.termination = Some(termination);
                            state.transition_to(RunPhase::Done, Some(termination.to_string()))?;
                        }
                        RevisionDecision::Revise => {
                            state.transition_to(RunPhase::Revising, None)?;
                        }
                    }
                }
                RunPhase::Revising => {
                    self.revisions.advance(&mut state);
                    state.transition_to(RunPhase::Generating, Some("revision".into()))?;
                }
                RunPhase::Done => break,
            }
        }

        // Done is only reachable from Evaluating, which always sets both.
        let (Some(evaluation), Some(termination)) = (last_evaluation, state.termination) else {
            return Err(RunError::InvalidTransition {
                from: state.phase.to_string(),
                to: RunPhase::Done.to_string(),
            }
            .into());
        };

        let final_response = self.selector.select(&state.transcript).text;
        let estimated_cost = self.estimate_cost(generation_usage, judgment_usage);

        tracing::info!(
            run_id = %state.run_id,
            termination = %termination,
            score = evaluation.score,
            revisions = state.revision_count(),
            needs_human_review = state.needs_human_review(),
            input_tokens = state.usage.input_tokens,
            output_tokens = state.usage.output_tokens,
            cost = %estimated_cost,
            "Run finished"
        );

        Ok(RunOutcome {
            run_id: state.run_id,
            final_response,
            score: evaluation.score,
            feedback: evaluation.feedback.clone(),
            approved: state.approved(),
            needs_human_review: state.needs_human_review(),
            revision_count: state.revision_count(),
            termination,
            evaluation,
            usage: state.usage,
            generation_usage,
            judgment_usage,
            estimated_cost,
            state,
        })
    }

    /// Rebuild the instruction; only the latest feedback is carried.
    fn instruction_for(&self, state: Option<&RunState>) -> String {
        let note = state
            .filter(|s| s.revision_count() > 0)
            .and_then(|s| {
                s.feedback().map(|feedback| RevisionNote {
                    feedback,
                    attempt: s.revision_count(),
                    max_revisions: self.revisions.max_revisions(),
                })
            });
        generation_instruction(&self.config.candidate_name, &self.profile, note)
    }

    async fn generate(&self, state: &RunState) -> Result<Draft, Error> {
        let instruction = self.instruction_for(Some(state));
        let context = ReasoningContext::new()
            .with_messages(state.transcript.to_messages(&instruction))
            .with_tools(self.dispatcher.registry().definitions().await);

        let draft = self.reasoning.respond_with_tools(&context).await?;
        tracing::debug!(
            run_id = %state.run_id,
            revision = state.revision_count(),
            calls = draft.tool_calls.len(),
            has_content = draft.content.is_some(),
            "Generation step complete"
        );
        Ok(draft)
    }

    fn estimate_cost(&self, generation: TokenUsage, judgment: TokenUsage) -> Decimal {
        let (gen_in, gen_out) = self.reasoning.llm().cost_per_token();
        let (judge_in, judge_out) = self.judge.cost_per_token();
        gen_in * Decimal::from(generation.input_tokens)
            + gen_out * Decimal::from(generation.output_tokens)
            + judge_in * Decimal::from(judgment.input_tokens)
            + judge_out * Decimal::from(judgment.output_tokens)
    }
}
