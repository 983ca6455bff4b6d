//! Plain-text rendering of a finished run, plus the built-in sample messages.

use crate::agent::RunOutcome;
use crate::agent::evaluation::format_score;

const BAR_CELLS: usize = 10;

/// Ten-cell score bar, e.g. `████████░░` for 8.
pub fn score_bar(score: f64) -> String {
    let filled = (score.round().max(0.0) as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Render the reply, score card and evaluation report.
pub fn render(outcome: &RunOutcome) -> String {
    let mut parts = Vec::new();

    if !outcome.final_response.is_empty() {
        parts.push(format!(
            "**📨 Response to Employer:**\n\n{}",
            outcome.final_response
        ));
    }

    let mut score_card = format!(
        "\n---\n**📊 Score:** `{}` **{}/10** | **Unknown:** {}",
        score_bar(outcome.score),
        format_score(outcome.score),
        if outcome.needs_human_review {
            "Yes ⚠️"
        } else {
            "No"
        },
    );
    if outcome.revision_count > 0 {
        score_card.push_str(&format!(" | **Revisions:** {}", outcome.revision_count));
    }
    if outcome.is_forced_acceptance() {
        score_card.push_str(" | **Not approved:** revision budget exhausted");
    }
    parts.push(score_card);

    parts.push(format!("\n{}", outcome.evaluation_report()));

    if outcome.needs_human_review {
        parts.push("\n⚠️ **Some questions were flagged for human review.**".to_string());
    }

    parts.join("\n")
}

/// Built-in sample messages for trying the binary without typing one.
pub mod samples {
    pub const INTERVIEW: &str = "Dear candidate,\n\n\
        We reviewed your profile and were impressed by your full-stack development experience. \
        We'd like to invite you for a technical interview for our Junior Full-Stack Developer \
        position. The role involves working with Angular and Spring Boot. Would you be available \
        next week for a 45-minute video call?\n\n\
        Best regards,\nHR Manager, TechCorp";

    pub const TECHNICAL: &str = "Hi,\n\n\
        We're evaluating candidates for our backend team. Could you describe your experience with \
        Spring Boot and RESTful API design? Specifically:\n\
        1. Have you worked with microservices architecture?\n\
        2. What database technologies have you used?\n\
        3. Do you have experience with Docker and CI/CD pipelines?\n\n\
        Thanks,\nTech Lead, InnovateTech";

    pub const UNKNOWN: &str = "Hello,\n\n\
        We have a senior position that might interest you. Before we proceed:\n\
        1. What is your minimum acceptable salary?\n\
        2. Are you willing to sign a 2-year non-compete clause?\n\
        3. Can you demonstrate expertise in Rust and low-level systems programming?\n\
        4. We need you to start within 2 weeks. Is that possible?\n\n\
        Regards,\nCTO, CryptoStartup";

    /// Look up a sample by name.
    pub fn by_name(name: &str) -> Option<&'static str> {
        match name.to_ascii_lowercase().as_str() {
            "interview" => Some(INTERVIEW),
            "technical" => Some(TECHNICAL),
            "unknown" => Some(UNKNOWN),
            _ => None,
        }
    }
}
