use crate::{Condition, Id};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One weekly window during which a Rule is considered active, evaluated
/// in the owning Contact's timezone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub weekday: chrono::Weekday,
    pub start: chrono::NaiveTime,
    pub end: chrono::NaiveTime,
}

impl WeeklyWindow {
    fn contains(&self, local: chrono::NaiveDateTime) -> bool {
        if local.weekday() != self.weekday {
            return false;
        }
        let t = local.time();
        if self.start <= self.end {
            self.start <= t && t < self.end
        } else {
            // A window that wraps past midnight, e.g. 22:00 -> 02:00.
            t >= self.start || t < self.end
        }
    }
}

/// A cron-like set of weekly windows, evaluated in a timezone. `None` means
/// "always active" (no time restriction configured).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeRestriction {
    pub windows: Vec<WeeklyWindow>,
}

impl TimeRestriction {
    pub fn is_active_at(&self, at: chrono::DateTime<chrono::Utc>, tz: chrono_tz::Tz) -> bool {
        if self.windows.is_empty() {
            return true;
        }
        let local = at.with_timezone(&tz).naive_local();
        self.windows.iter().any(|w| w.contains(local))
    }
}

/// A contact's routing policy: which conditions they want to hear about,
/// when, and for which tagged checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Id,
    pub contact_id: Id,
    /// Subset of conditions this rule matches, or `None` for "any
    /// unhealthy".
    pub conditions: Option<BTreeSet<Condition>>,
    pub time_restriction: TimeRestriction,
    pub tags: BTreeSet<String>,
    /// The Media (by id) that alerts generated from this rule are sent
    /// through.
    pub media: Vec<Id>,
}

impl Rule {
    pub fn is_generic(&self) -> bool {
        self.tags.is_empty()
    }

    /// A rule matches a check iff the rule's tag set is a subset of the
    /// check's tag set (spec.md §4.D). Generic rules match every check.
    pub fn matches_tags(&self, check_tags: &BTreeSet<String>) -> bool {
        self.tags.is_subset(check_tags)
    }

    /// Whether `condition` is one this rule wants to hear about.
    pub fn matches_condition(&self, condition: Condition) -> bool {
        match &self.conditions {
            None => condition.is_unhealthy(),
            Some(set) => set.contains(&condition),
        }
    }
}
