use crate::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediumType {
    Email,
    Sms,
    SmsNexmo,
    Sns,
    Pagerduty,
    Jabber,
    Slack,
}

impl std::fmt::Display for MediumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediumType::Email => "email",
            MediumType::Sms => "sms",
            MediumType::SmsNexmo => "sms_nexmo",
            MediumType::Sns => "sns",
            MediumType::Pagerduty => "pagerduty",
            MediumType::Jabber => "jabber",
            MediumType::Slack => "slack",
        };
        f.write_str(s)
    }
}

/// A delivery channel owned by a Contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medium {
    pub id: Id,
    pub contact_id: Id,
    pub medium_type: MediumType,
    pub address: String,
    /// Minimum interval between repeat deliveries of an identical alert
    /// through this medium.
    pub rollover_period_secs: i64,
    /// Switch to a digest once more than this many checks are
    /// simultaneously alerting through this medium. `None` disables
    /// rollup for this medium.
    pub rollup_threshold: Option<u32>,
}
