//! System instruction for the generation step.

use chrono::Utc;

use crate::profile::Profile;
use crate::tools::builtin::notify::{
    FLAG_UNKNOWN_QUESTION, NOTIFY_NEW_MESSAGE, NOTIFY_RESPONSE_APPROVED,
};

/// Feedback from the immediately preceding evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RevisionNote<'a> {
    pub feedback: &'a str,
    pub attempt: u32,
    pub max_revisions: u32,
}

/// Build the generation instruction. Only the latest feedback is ever
/// included; earlier feedback is dropped when the instruction is rebuilt.
pub fn generation_instruction(
    candidate: &str,
    profile: &Profile,
    revision: Option<RevisionNote<'_>>,
) -> String {
    let today = Utc::now().format("%Y-%m-%d");
    let mut prompt = format!(
        "You are {candidate}'s Career Assistant. You reply to potential employers on behalf of {candidate}.\n\
         The current date is {today}.\n\
         \n\
         ## Role\n\
         - Answer interview invitations: express enthusiasm and confirm availability.\n\
         - Answer technical questions using only {candidate}'s actual skills and experience.\n\
         - Politely decline offers that do not match {candidate}'s interests or availability.\n\
         - Ask clarifying questions when the message is vague.\n\
         \n\
         ## Tools\n\
         - {NOTIFY_NEW_MESSAGE}: call this first for every new employer message.\n\
         - {NOTIFY_RESPONSE_APPROVED}: call this once your reply is final, passing the full reply text.\n\
         - {FLAG_UNKNOWN_QUESTION}: call this for salary negotiation, legal matters (contracts, \
         non-compete clauses, NDAs), topics outside {candidate}'s expertise, ambiguous offers, \
         or whenever your confidence is below 50%.\n\
         \n\
         ## Response format\n\
         - Write the FULL reply in your message content, then call tools.\n\
         - Never put the reply only inside tool arguments; the evaluator reads your message content.\n\
         \n\
         ## Rules\n\
         - Never invent skills, experience or qualifications that are not in the profile.\n\
         - Never commit to salary figures or legal agreements.\n\
         - Never share contact details beyond what the profile contains.\n\
         - When unsure, flag the question and tell the employer you will follow up.\n\
         - Reply in the language of the employer's message.\n"
    );

    if !profile.is_empty() {
        prompt.push_str(&format!("\n## {candidate}'s Profile\n{}\n", profile.text));
    }

    if let Some(note) = revision.filter(|n| !n.feedback.trim().is_empty()) {
        prompt.push_str(&format!(
            "\n## REVISION REQUIRED\n\
             Your previous response was evaluated and did NOT meet the quality threshold.\n\
             Evaluator Feedback: {}\n\
             Please revise your response addressing this feedback.\n\
             This is revision attempt {} of {}.\n",
            note.feedback, note.attempt, note.max_revisions
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            text: "Senior Rust engineer, 8 years.".into(),
        }
    }

    #[test]
    fn first_pass_has_no_revision_section() {
        let prompt = generation_instruction("Ada", &profile(), None);
        assert!(prompt.contains("Ada's Career Assistant"));
        assert!(prompt.contains("Senior Rust engineer"));
        assert!(prompt.contains(FLAG_UNKNOWN_QUESTION));
        assert!(!prompt.contains("REVISION REQUIRED"));
    }

    #[test]
    fn revision_section_carries_feedback_and_attempt() {
        let prompt = generation_instruction(
            "Ada",
            &profile(),
            Some(RevisionNote {
                feedback: "Mention availability.",
                attempt: 2,
                max_revisions: 3,
            }),
        );
        assert!(prompt.contains("Evaluator Feedback: Mention availability."));
        assert!(prompt.contains("revision attempt 2 of 3"));
    }

    #[test]
    fn empty_profile_is_omitted() {
        let prompt = generation_instruction("Ada", &Profile::default(), None);
        assert!(!prompt.contains("Ada's Profile"));
    }
}
