use crate::{Condition, Id, MediumType, NotificationType};
use serde::{Deserialize, Serialize};

/// A dispatchable work item targeting a single (contact, medium) pair.
/// Alerts are destroyed after terminal disposition: delivered,
/// permanently-failed, or suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Id,
    pub check_id: Id,
    pub contact_id: Id,
    pub medium_id: Id,
    pub medium_type: MediumType,
    pub notification_type: NotificationType,
    pub condition: Condition,
    pub summary: String,
    pub details: Option<String>,
    pub attempts: i32,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
    /// Set when this Alert represents a rollup digest rather than a single
    /// check, holding the ids of the checks it summarizes.
    pub rollup_check_ids: Option<Vec<Id>>,
}
