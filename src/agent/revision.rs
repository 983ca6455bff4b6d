//! Revision controller: routes after an evaluation and owns the retry counter.

use crate::agent::state::{RunState, Termination};

/// What to do after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionDecision {
    /// Stop; the run ends with this termination.
    Stop(Termination),
    /// Regenerate with the latest feedback.
    Revise,
}

/// Bounds the number of revision passes.
#[derive(Debug, Clone, Copy)]
pub struct RevisionController {
    max_revisions: u32,
}

impl RevisionController {
    pub fn new(max_revisions: u32) -> Self {
        Self { max_revisions }
    }

    pub fn max_revisions(&self) -> u32 {
        self.max_revisions
    }

    /// Route after evaluation. Approval wins over an exhausted budget.
    pub fn decide(&self, state: &RunState) -> RevisionDecision {
        if state.approved() {
            RevisionDecision::Stop(Termination::Approved)
        } else if state.revision_count() >= self.max_revisions {
            tracing::warn!(
                max_revisions = self.max_revisions,
                "Max revisions reached, accepting response as-is"
            );
            RevisionDecision::Stop(Termination::ForcedAcceptance)
        } else {
            RevisionDecision::Revise
        }
    }

    /// Record that a revision occurred. The counter is the only thing touched.
    pub fn advance(&self, state: &mut RunState) -> u32 {
        let revision = state.increment_revision();
        tracing::info!(
            run_id = %state.run_id,
            revision,
            max_revisions = self.max_revisions,
            score = ?state.score(),
            "Revision requested"
        );
        revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::evaluation::Evaluation;
    use crate::llm::EvaluationVerdict;

    fn evaluated(score: f64) -> RunState {
        let mut state = RunState::new("sys", "hi");
        state.set_evaluation(Evaluation::from_verdict(
            EvaluationVerdict {
                score,
                professional_tone: true,
                clarity: true,
                completeness: true,
                safety: true,
                relevance: true,
                feedback: String::new(),
                approved: false,
            },
            7.0,
        ));
        state
    }

    #[test]
    fn approved_stops() {
        let controller = RevisionController::new(3);
        assert_eq!(
            controller.decide(&evaluated(8.0)),
            RevisionDecision::Stop(Termination::Approved)
        );
    }

    #[test]
    fn rejected_revises_until_budget() {
        let controller = RevisionController::new(2);
        let mut state = evaluated(4.0);
        assert_eq!(controller.decide(&state), RevisionDecision::Revise);
        assert_eq!(controller.advance(&mut state), 1);
        assert_eq!(controller.decide(&state), RevisionDecision::Revise);
        assert_eq!(controller.advance(&mut state), 2);
        assert_eq!(
            controller.decide(&state),
            RevisionDecision::Stop(Termination::ForcedAcceptance)
        );
    }

    #[test]
    fn zero_budget_forces_acceptance_immediately() {
        let controller = RevisionController::new(0);
        assert_eq!(
            controller.decide(&evaluated(2.0)),
            RevisionDecision::Stop(Termination::ForcedAcceptance)
        );
    }

    #[test]
    fn advance_touches_only_the_counter() {
        let controller = RevisionController::new(3);
        let mut state = evaluated(4.0);
        let before = state.transcript.len();
        controller.advance(&mut state);
        assert_eq!(state.transcript.len(), before);
        assert_eq!(state.score(), Some(4.0));
        assert!(!state.approved());
    }
}
