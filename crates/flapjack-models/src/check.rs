use crate::{Condition, Id};
use serde::{Deserialize, Serialize};

/// Check is the monitored entity that event processing and routing revolve
/// around. Relationships to States, Maintenances, Notifications, Alerts,
/// Tags, Contacts, and Routes are not embedded here — they're expressed as
/// index lookups against the store, per the "never embed" re-architecture
/// guidance for persistent graphs with cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub id: Id,
    pub name: String,
    pub enabled: bool,
    pub condition: Condition,
    pub failing: bool,
    pub notification_count: i64,
    pub initial_failure_delay_secs: i64,
    pub repeat_failure_delay_secs: i64,
    /// Set when `condition` first transitioned into an unhealthy state and
    /// cleared on recovery. Anchors the initial-failure-delay hold-down and
    /// is restarted on every healthy -> unhealthy transition (open question
    /// in spec.md §9, resolved that way).
    pub failing_since: Option<chrono::DateTime<chrono::Utc>>,
    /// Timestamp of the last `problem` notification emitted for the current
    /// failure episode, used to enforce `repeat_failure_delay_secs`.
    pub last_problem_notified_at: Option<chrono::DateTime<chrono::Utc>>,
    /// The most severe condition seen so far in the current failure
    /// episode; reset to `None` on recovery.
    pub most_severe: Option<Condition>,
    /// The (medium_id) set this check is currently alerting through, used
    /// for de-duplication and rollover (spec.md §4.D).
    pub alerting_media: Vec<Id>,
}

impl Check {
    pub fn new(name: impl Into<String>) -> Self {
        Check {
            id: Id::generate(),
            name: name.into(),
            enabled: true,
            condition: Condition::Ok,
            failing: false,
            notification_count: 0,
            initial_failure_delay_secs: 0,
            repeat_failure_delay_secs: 300,
            failing_since: None,
            last_problem_notified_at: None,
            most_severe: None,
            alerting_media: Vec::new(),
        }
    }

    /// Stable short token used in out-of-band ack channels (e.g. email
    /// reply-to addresses). Invariant across renames because it's derived
    /// from the immutable `id`, not the mutable `name`.
    pub fn ack_hash(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        hasher.update(self.id.as_uuid().as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_hash_is_eight_hex_chars() {
        let check = Check::new("web1");
        assert_eq!(check.ack_hash().len(), 8);
    }

    #[test]
    fn ack_hash_invariant_across_renames() {
        let mut check = Check::new("web1");
        let before = check.ack_hash();
        check.name = "web1-renamed".to_string();
        assert_eq!(before, check.ack_hash());
    }
}
