use crate::Id;
use serde::{Deserialize, Serialize};

/// A human recipient. Owns a set of Media (looked up by index, not
/// embedded) and a timezone used to evaluate its Rules' time restrictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Id,
    pub name: String,
    pub timezone: String,
}

impl Contact {
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}
