use crate::{Condition, Id};
use serde::{Deserialize, Serialize};

/// The kind of event a Notification or Alert represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Problem,
    Acknowledgement,
    Recovery,
    ScheduledMaintenance,
    Test,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationType::Problem => "problem",
            NotificationType::Acknowledgement => "acknowledgement",
            NotificationType::Recovery => "recovery",
            NotificationType::ScheduledMaintenance => "scheduled_maintenance",
            NotificationType::Test => "test",
        };
        f.write_str(s)
    }
}

/// An internal work item emitted by the Check Processor when a transition
/// warrants delivery. Consumed exactly once by the Route Resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Id,
    pub check_id: Id,
    pub state_id: Id,
    pub notification_type: NotificationType,
    pub condition: Condition,
    pub summary: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
