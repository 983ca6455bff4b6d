//! Picks the reply out of a transcript.
//!
//! Generation may interleave commentary about its own capability calls with
//! the actual reply. Selection walks the transcript in a fixed priority order
//! and always returns something:
//!
//! 1. the reply argument of the newest final-answer capability call
//! 2. the newest substantive draft (long enough, free of meta phrases)
//! 3. the newest non-empty draft
//! 4. the newest non-empty entry of any kind, else the last entry
//!
//! The meta-phrase filter is a heuristic. A genuine reply that happens to
//! contain one of the phrases is skipped in step 2 and can only be picked up
//! by step 3.

use regex::{Regex, RegexBuilder};

use crate::agent::transcript::{EntryKind, Transcript};
use crate::config::SelectionConfig;

/// Which rule produced the selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    FinalAnswerCall,
    SubstantiveDraft,
    AnyDraft,
    LastEntry,
}

/// Text chosen as the reply, and the rule that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    pub source: SelectionSource,
}

/// Deterministic reply selector.
#[derive(Debug, Clone)]
pub struct ResponseSelector {
    final_answer_tool: String,
    final_answer_arg: String,
    min_draft_chars: usize,
    /// One case-insensitive literal matcher per phrase.
    meta_phrases: Vec<Regex>,
}

impl ResponseSelector {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            final_answer_tool: config.final_answer_tool.clone(),
            final_answer_arg: config.final_answer_arg.clone(),
            min_draft_chars: config.min_draft_chars,
            meta_phrases: config
                .meta_phrases
                .iter()
                .filter(|p| !p.is_empty())
                .filter_map(|p| {
                    RegexBuilder::new(&regex::escape(p))
                        .case_insensitive(true)
                        .build()
                        .inspect_err(|e| {
                            tracing::warn!(phrase = %p, error = %e, "Skipping meta phrase");
                        })
                        .ok()
                })
                .collect(),
        }
    }

    /// Whether `text` contains any meta-commentary phrase.
    pub fn is_meta_commentary(&self, text: &str) -> bool {
        self.meta_phrases.iter().any(|p| p.is_match(text))
    }

    fn is_substantive(&self, text: &str) -> bool {
        text.chars().count() > self.min_draft_chars && !self.is_meta_commentary(text)
    }

    pub fn select(&self, transcript: &Transcript) -> Selection {
        // 1. Authoritative final answer carried in a capability call.
        for entry in transcript.iter_rev().filter(|e| e.kind == EntryKind::Draft) {
            let answer = entry
                .tool_calls()
                .iter()
                .rev()
                .filter(|call| call.name == self.final_answer_tool)
                .find_map(|call| {
                    call.arguments
                        .get(&self.final_answer_arg)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                });
            if let Some(text) = answer {
                return Selection {
                    text: text.to_string(),
                    source: SelectionSource::FinalAnswerCall,
                };
            }
        }

        let drafts = || {
            transcript
                .iter_rev()
                .filter(|e| e.kind == EntryKind::Draft)
                .map(|e| e.content())
                .filter(|c| !c.trim().is_empty())
        };

        // 2. Newest substantive draft.
        if let Some(text) = drafts().find(|c| self.is_substantive(c)) {
            return Selection {
                text: text.to_string(),
                source: SelectionSource::SubstantiveDraft,
            };
        }

        // 3. Newest draft with any content.
        if let Some(text) = drafts().next() {
            return Selection {
                text: text.to_string(),
                source: SelectionSource::AnyDraft,
            };
        }

        // 4. Whatever is left.
        let text = transcript
            .iter_rev()
            .map(|e| e.content())
            .find(|c| !c.trim().is_empty())
            .or_else(|| transcript.last().map(|e| e.content()))
            .unwrap_or_default();
        Selection {
            text: text.to_string(),
            source: SelectionSource::LastEntry,
        }
    }
}
