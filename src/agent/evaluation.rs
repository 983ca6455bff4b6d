//! Active evaluation of a draft, with approval derived from the score.

use serde::Serialize;

use crate::llm::EvaluationVerdict;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

/// Approval is a pure function of score and threshold.
pub fn is_approved(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Format a score exactly as judged, without a trailing `.0`.
pub fn format_score(score: f64) -> String {
    score.to_string()
}

/// A judged verdict after normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Score clamped to [1, 10].
    pub score: f64,
    pub professional_tone: bool,
    pub clarity: bool,
    pub completeness: bool,
    pub safety: bool,
    pub relevance: bool,
    pub feedback: String,
    /// `score >= threshold`, whatever the judge claimed.
    pub approved: bool,
    /// What the judge itself reported, kept for diagnostics.
    pub judge_approved: bool,
}

impl Evaluation {
    pub fn from_verdict(verdict: EvaluationVerdict, threshold: f64) -> Self {
        let score = if verdict.score.is_finite() {
            verdict.score.clamp(MIN_SCORE, MAX_SCORE)
        } else {
            MIN_SCORE
        };
        if score != verdict.score {
            tracing::warn!(raw = verdict.score, clamped = score, "Evaluation score out of range");
        }

        let approved = is_approved(score, threshold);
        if approved != verdict.approved {
            tracing::warn!(
                score,
                threshold,
                judge_approved = verdict.approved,
                "Judge approval flag disagrees with threshold, using threshold"
            );
        }

        Self {
            score,
            professional_tone: verdict.professional_tone,
            clarity: verdict.clarity,
            completeness: verdict.completeness,
            safety: verdict.safety,
            relevance: verdict.relevance,
            feedback: verdict.feedback,
            approved,
            judge_approved: verdict.approved,
        }
    }

    /// Markdown report appended to the transcript.
    pub fn report(&self) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        let status = if self.approved {
            "✅ Approved"
        } else {
            "🔄 Revision Required"
        };
        format!(
            "📊 **Evaluation Result**\n\
             - **Score:** {}/10\n\
             - **Professional Tone:** {}\n\
             - **Clarity:** {}\n\
             - **Completeness:** {}\n\
             - **Safety:** {}\n\
             - **Relevance:** {}\n\
             - **Feedback:** {}\n\
             - **Status:** {status}",
            format_score(self.score),
            mark(self.professional_tone),
            mark(self.clarity),
            mark(self.completeness),
            mark(self.safety),
            mark(self.relevance),
            self.feedback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(score: f64, approved: bool) -> EvaluationVerdict {
        EvaluationVerdict {
            score,
            professional_tone: true,
            clarity: true,
            completeness: false,
            safety: true,
            relevance: true,
            feedback: "Address the start date.".into(),
            approved,
        }
    }

    #[test]
    fn approval_follows_threshold_not_judge() {
        let e = Evaluation::from_verdict(verdict(6.0, true), 7.0);
        assert!(!e.approved);
        assert!(e.judge_approved);

        let e = Evaluation::from_verdict(verdict(7.0, false), 7.0);
        assert!(e.approved);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(Evaluation::from_verdict(verdict(14.0, true), 7.0).score, 10.0);
        assert_eq!(Evaluation::from_verdict(verdict(-3.0, false), 7.0).score, 1.0);
        assert_eq!(Evaluation::from_verdict(verdict(f64::NAN, true), 7.0).score, 1.0);
    }

    #[test]
    fn report_lists_criteria_and_status() {
        let report = Evaluation::from_verdict(verdict(5.0, false), 7.0).report();
        assert!(report.starts_with("📊 **Evaluation Result**"));
        assert!(report.contains("- **Score:** 5/10"));
        assert!(report.contains("- **Completeness:** ❌"));
        assert!(report.contains("- **Feedback:** Address the start date."));
        assert!(report.ends_with("🔄 Revision Required"));
    }

    #[test]
    fn format_score_drops_trailing_zero() {
        assert_eq!(format_score(8.0), "8");
        assert_eq!(format_score(7.5), "7.5");
    }

    #[test]
    fn format_score_is_not_rounded() {
        assert_eq!(format_score(7.25), "7.25");
        assert_eq!(format_score(6.95), "6.95");
    }
}
