//! Run context handed to capabilities during dispatch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Read-only view of the run a capability executes for.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// Unique run ID.
    pub run_id: Uuid,
    /// Revision pass the call was issued in (0 for the first draft).
    pub revision: u32,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            revision: 0,
            started_at: Utc::now(),
        }
    }
}

impl RunContext {
    pub fn new(run_id: Uuid, revision: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            revision,
            started_at,
        }
    }
}
