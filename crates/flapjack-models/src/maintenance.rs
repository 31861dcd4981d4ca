use crate::Id;
use serde::{Deserialize, Serialize};

/// A `[start_time, end_time)` window during which alerts for a check are
/// suppressed. `start_time` is immutable once persisted; only `end_time`
/// may be truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMaintenance {
    pub id: Id,
    pub check_id: Id,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnscheduledMaintenance {
    pub id: Id,
    pub check_id: Id,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub summary: Option<String>,
}

/// Shared behavior between the two maintenance window kinds: both support
/// truncation of `end_time` but never mutation of `start_time`.
pub trait MaintenanceWindow {
    fn start_time(&self) -> chrono::DateTime<chrono::Utc>;
    fn end_time(&self) -> chrono::DateTime<chrono::Utc>;

    fn contains(&self, at: chrono::DateTime<chrono::Utc>) -> bool {
        self.start_time() <= at && at < self.end_time()
    }
}

impl MaintenanceWindow for ScheduledMaintenance {
    fn start_time(&self) -> chrono::DateTime<chrono::Utc> {
        self.start_time
    }
    fn end_time(&self) -> chrono::DateTime<chrono::Utc> {
        self.end_time
    }
}

impl MaintenanceWindow for UnscheduledMaintenance {
    fn start_time(&self) -> chrono::DateTime<chrono::Utc> {
        self.start_time
    }
    fn end_time(&self) -> chrono::DateTime<chrono::Utc> {
        self.end_time
    }
}
