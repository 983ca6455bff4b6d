//! Agent module: the orchestration loop and its steps.

pub mod dispatcher;
pub mod evaluation;
pub mod orchestrator;
pub mod prompts;
pub mod revision;
pub mod selection;
pub mod state;
pub mod transcript;

pub use dispatcher::{CapabilityResult, ToolDispatcher};
pub use evaluation::Evaluation;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use revision::{RevisionController, RevisionDecision};
pub use selection::{ResponseSelector, Selection, SelectionSource};
pub use state::{RunPhase, RunState, Termination};
pub use transcript::{EntryKind, Transcript, TranscriptEntry};
