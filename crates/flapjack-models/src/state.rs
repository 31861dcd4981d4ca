use crate::{Condition, Id};
use serde::{Deserialize, Serialize};

/// State is one immutable sample in a check's history. The state sequence
/// for a given check is strictly monotonic in `created_at` (spec.md §3
/// invariant v).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: Id,
    pub check_id: Id,
    pub condition: Condition,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub summary: String,
    pub details: Option<String>,
}

impl State {
    pub fn new(
        check_id: Id,
        condition: Condition,
        created_at: chrono::DateTime<chrono::Utc>,
        summary: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        State {
            id: Id::generate(),
            check_id,
            condition,
            created_at,
            summary: summary.into(),
            details,
        }
    }
}
