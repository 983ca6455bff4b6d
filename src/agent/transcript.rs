//! Append-only run transcript.
//!
//! Every entry records what kind of step produced it, so later passes can
//! tell drafts from evaluation reports without inspecting text.

use serde::Serialize;

use crate::llm::{ChatMessage, Role, ToolCall};

/// What produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The seeded system instruction.
    Instruction,
    /// The incoming message being answered.
    Incoming,
    /// Output of a generation step (text and/or capability calls).
    Draft,
    /// Result of one dispatched capability call.
    ToolResult,
    /// Rendered evaluation report.
    Evaluation,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub message: ChatMessage,
    /// Revision pass during which the entry was appended.
    pub revision: u32,
}

impl TranscriptEntry {
    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.message.tool_calls
    }
}

/// Ordered record of a run. Entries are only ever appended.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Seed a transcript with the system instruction and the incoming message.
    pub fn seeded(instruction: impl Into<String>, incoming: impl Into<String>) -> Self {
        let mut transcript = Self::default();
        transcript.push(EntryKind::Instruction, ChatMessage::system(instruction), 0);
        transcript.push(EntryKind::Incoming, ChatMessage::user(incoming), 0);
        transcript
    }

    fn push(&mut self, kind: EntryKind, message: ChatMessage, revision: u32) {
        self.entries.push(TranscriptEntry {
            kind,
            message,
            revision,
        });
    }

    pub fn push_draft(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>, revision: u32) {
        let message = if tool_calls.is_empty() {
            ChatMessage::assistant(content.unwrap_or_default())
        } else {
            ChatMessage::assistant_with_tool_calls(content, tool_calls)
        };
        self.push(EntryKind::Draft, message, revision);
    }

    pub fn push_tool_result(
        &mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        revision: u32,
    ) {
        self.push(
            EntryKind::ToolResult,
            ChatMessage::tool_result(call_id, name, content),
            revision,
        );
    }

    pub fn push_evaluation(&mut self, report: impl Into<String>, revision: u32) {
        self.push(EntryKind::Evaluation, ChatMessage::assistant(report), revision);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Entries newest first.
    pub fn iter_rev(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().rev()
    }

    /// Count entries of one kind.
    pub fn count(&self, kind: EntryKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Build provider messages, substituting `instruction` for the seeded
    /// system entry. The stored entry itself is left untouched.
    pub fn to_messages(&self, instruction: &str) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|entry| match entry.kind {
                EntryKind::Instruction => ChatMessage::system(instruction),
                _ => entry.message.clone(),
            })
            .collect()
    }

    /// Role sequence, handy for assertions.
    pub fn roles(&self) -> Vec<Role> {
        self.entries.iter().map(|e| e.message.role).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: json!({}),
        }
    }

    #[test]
    fn seeded_has_instruction_and_incoming() {
        let t = Transcript::seeded("be nice", "hello");
        assert_eq!(t.len(), 2);
        assert_eq!(t.roles(), vec![Role::System, Role::User]);
        assert_eq!(t.entries()[1].content(), "hello");
    }

    #[test]
    fn draft_with_calls_keeps_calls() {
        let mut t = Transcript::seeded("sys", "hi");
        t.push_draft(None, vec![call("c1", "notify")], 0);
        let last = t.last().unwrap();
        assert_eq!(last.kind, EntryKind::Draft);
        assert_eq!(last.tool_calls().len(), 1);
        assert_eq!(last.content(), "");
    }

    #[test]
    fn to_messages_substitutes_instruction_only() {
        let mut t = Transcript::seeded("original", "hi");
        t.push_draft(Some("draft".into()), vec![], 0);
        t.push_evaluation("report", 0);

        let messages = t.to_messages("rebuilt");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "rebuilt");
        assert_eq!(messages[2].content, "draft");
        assert_eq!(t.entries()[0].content(), "original");
    }

    #[test]
    fn count_by_kind() {
        let mut t = Transcript::seeded("sys", "hi");
        t.push_draft(None, vec![call("c1", "a"), call("c2", "b")], 0);
        t.push_tool_result("c1", "a", "ok", 0);
        t.push_tool_result("c2", "b", "ok", 0);
        assert_eq!(t.count(EntryKind::ToolResult), 2);
        assert_eq!(t.count(EntryKind::Draft), 1);
    }
}
