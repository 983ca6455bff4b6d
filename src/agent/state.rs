//! Run state machine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::agent::evaluation::Evaluation;
use crate::agent::transcript::Transcript;
use crate::context::RunContext;
use crate::error::RunError;
use crate::llm::TokenUsage;

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Waiting on the generation provider.
    Generating,
    /// Resolving capability calls from the latest draft.
    Dispatching,
    /// Waiting on the judgment provider.
    Evaluating,
    /// Bumping the revision counter before regenerating.
    Revising,
    /// Terminal.
    Done,
}

impl RunPhase {
    /// Check if this phase allows transitioning to another phase.
    pub fn can_transition_to(&self, target: RunPhase) -> bool {
        use RunPhase::*;

        matches!(
            (self, target),
            (Generating, Dispatching)
                | (Generating, Evaluating)
                | (Dispatching, Generating)
                | (Evaluating, Done)
                | (Evaluating, Revising)
                | (Revising, Generating)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Generating => "generating",
            Self::Dispatching => "dispatching",
            Self::Evaluating => "evaluating",
            Self::Revising => "revising",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The latest evaluation met the approval threshold.
    Approved,
    /// The revision budget ran out without approval.
    ForcedAcceptance,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::ForcedAcceptance => write!(f, "forced_acceptance"),
        }
    }
}

/// A phase transition event.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransition {
    pub from: RunPhase,
    pub to: RunPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// State of one run: everything the orchestration loop reads and mutates.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub transcript: Transcript,
    source_message: String,
    /// The active evaluation; replaced on every pass.
    evaluation: Option<Evaluation>,
    approved: bool,
    needs_human_review: bool,
    revision_count: u32,
    /// Tokens spent across generation and judgment calls.
    pub usage: TokenUsage,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub termination: Option<Termination>,
    pub transitions: Vec<PhaseTransition>,
}

impl RunState {
    /// Create a run in the `Generating` phase with a seeded transcript.
    pub fn new(instruction: impl Into<String>, source_message: impl Into<String>) -> Self {
        let source_message = source_message.into();
        Self {
            run_id: Uuid::new_v4(),
            phase: RunPhase::Generating,
            transcript: Transcript::seeded(instruction, source_message.clone()),
            source_message,
            evaluation: None,
            approved: false,
            needs_human_review: false,
            revision_count: 0,
            usage: TokenUsage::default(),
            started_at: Utc::now(),
            completed_at: None,
            termination: None,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new phase.
    pub fn transition_to(
        &mut self,
        to: RunPhase,
        reason: Option<String>,
    ) -> Result<(), RunError> {
        if !self.phase.can_transition_to(to) {
            return Err(RunError::InvalidTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            });
        }

        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason,
        });
        self.phase = to;

        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn source_message(&self) -> &str {
        &self.source_message
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    pub fn score(&self) -> Option<f64> {
        self.evaluation.as_ref().map(|e| e.score)
    }

    pub fn feedback(&self) -> Option<&str> {
        self.evaluation.as_ref().map(|e| e.feedback.as_str())
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    pub fn needs_human_review(&self) -> bool {
        self.needs_human_review
    }

    pub fn revision_count(&self) -> u32 {
        self.revision_count
    }

    /// Replace the active evaluation. Approval follows the evaluation's
    /// derived flag.
    pub fn set_evaluation(&mut self, evaluation: Evaluation) {
        self.approved = evaluation.approved;
        self.evaluation = Some(evaluation);
    }

    /// Flag the run for human review. Never cleared.
    pub fn mark_needs_review(&mut self) {
        self.needs_human_review = true;
    }

    pub(crate) fn increment_revision(&mut self) -> u32 {
        self.revision_count += 1;
        self.revision_count
    }

    /// Context handed to capabilities executing for this run.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(self.run_id, self.revision_count, self.started_at)
    }
}
