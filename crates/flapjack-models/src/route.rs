use crate::{Condition, Id};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The materialized join of a Rule with a matching Check, (re)computed on
/// any change to the check's tag set, the rule set, or a rule's tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Id,
    pub check_id: Id,
    pub rule_id: Id,
    pub is_alerting: bool,
    pub conditions: Option<BTreeSet<Condition>>,
}

impl Route {
    pub fn matches_condition(&self, condition: Condition) -> bool {
        match &self.conditions {
            None => condition.is_unhealthy(),
            Some(set) => set.contains(&condition),
        }
    }
}
