use serde::{Deserialize, Serialize};

/// Condition is a check's health token, drawn from the closed vocabulary
/// the wire protocol and state machine both reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Condition {
    pub fn is_healthy(self) -> bool {
        matches!(self, Condition::Ok)
    }

    pub fn is_unhealthy(self) -> bool {
        !self.is_healthy()
    }

    /// Total order used to decide whether a transition "escalated" or
    /// "softened". `unknown` sits below the named failure conditions but
    /// above `ok`, per spec: less severe than named failures, more severe
    /// than healthy.
    fn severity_rank(self) -> u8 {
        match self {
            Condition::Ok => 0,
            Condition::Unknown => 1,
            Condition::Warning => 2,
            Condition::Critical => 3,
        }
    }

    /// True iff `self` is strictly worse (more severe) than `other`.
    pub fn is_worse_than(self, other: Condition) -> bool {
        self.severity_rank() > other.severity_rank()
    }

    pub fn is_milder_than(self, other: Condition) -> bool {
        self.severity_rank() < other.severity_rank()
    }
}

impl std::str::FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Condition::Ok),
            "warning" => Ok(Condition::Warning),
            "critical" => Ok(Condition::Critical),
            "unknown" => Ok(Condition::Unknown),
            other => Err(UnknownCondition(other.to_string())),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Condition::Ok => "ok",
            Condition::Warning => "warning",
            Condition::Critical => "critical",
            Condition::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized condition {0:?}")]
pub struct UnknownCondition(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_spec() {
        assert!(Condition::Critical.is_worse_than(Condition::Warning));
        assert!(Condition::Warning.is_worse_than(Condition::Unknown));
        assert!(Condition::Unknown.is_worse_than(Condition::Ok));
        assert!(!Condition::Warning.is_worse_than(Condition::Critical));
        assert!(Condition::Warning.is_milder_than(Condition::Critical));
    }

    #[test]
    fn healthy_iff_ok() {
        assert!(Condition::Ok.is_healthy());
        assert!(!Condition::Ok.is_unhealthy());
        for c in [Condition::Warning, Condition::Critical, Condition::Unknown] {
            assert!(c.is_unhealthy());
        }
    }
}
