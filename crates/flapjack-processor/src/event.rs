use flapjack_models::Condition;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;

/// The wire shape of an inbound event (spec.md §6). `tags` is accepted only
/// on the first report of a check, matching Flapjack's convention that tags
/// describe the check itself rather than one report of it; later events
/// with a different tag set don't retag the check.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    pub entity: String,
    #[serde(default)]
    pub check: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: Option<String>,
    pub time: i64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub acknowledgement_id: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub initial_failure_delay: Option<i64>,
    #[serde(default)]
    pub repeat_failure_delay: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MalformedEvent {
    #[error("event is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("'entity' must be a non-empty string")]
    EmptyEntity,
    #[error("unrecognized type: {0}")]
    UnknownType(String),
    #[error("unrecognized state: {0}")]
    UnknownCondition(String),
    #[error("'state' is required for service and metric events")]
    MissingState,
    #[error("'duration' is required for action events")]
    MissingDuration,
    #[error("'time' is not a valid unix timestamp")]
    InvalidTime,
}

/// What kind of event this is, per spec.md §6's `type` field: a condition
/// report against a service/metric, or an out-of-band acknowledgement
/// action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Report { condition: Condition },
    Acknowledge {
        duration_secs: i64,
        #[allow(dead_code)]
        acknowledgement_id: Option<String>,
    },
}

pub struct NormalizedEvent {
    /// `entity`, or `entity:check` when the event names a sub-check
    /// (spec.md §6).
    pub check: String,
    pub time: chrono::DateTime<chrono::Utc>,
    pub kind: EventKind,
    pub summary: String,
    pub details: Option<String>,
    pub tags: BTreeSet<String>,
    pub initial_failure_delay: Option<i64>,
    pub repeat_failure_delay: Option<i64>,
}

/// Parses and validates a raw JSON payload into a [`NormalizedEvent`],
/// rejecting malformed input before it ever reaches the Check Processor
/// (spec.md §4.A).
pub fn normalize(payload: &serde_json::Value) -> Result<NormalizedEvent, MalformedEvent> {
    let raw: RawEvent = serde_json::from_value(payload.clone())?;

    if raw.entity.trim().is_empty() {
        return Err(MalformedEvent::EmptyEntity);
    }

    let check = match raw.check.as_deref().map(str::trim) {
        Some(sub) if !sub.is_empty() => format!("{}:{}", raw.entity, sub),
        _ => raw.entity.clone(),
    };

    let time = chrono::DateTime::<chrono::Utc>::from_timestamp(raw.time, 0)
        .ok_or(MalformedEvent::InvalidTime)?;

    let kind = match raw.event_type.as_str() {
        "service" | "metric" => {
            let state = raw.state.as_deref().ok_or(MalformedEvent::MissingState)?;
            let condition = Condition::from_str(&state.to_lowercase())
                .map_err(|_| MalformedEvent::UnknownCondition(state.to_string()))?;
            EventKind::Report { condition }
        }
        "action" => {
            let duration_secs = raw.duration.ok_or(MalformedEvent::MissingDuration)?;
            EventKind::Acknowledge {
                duration_secs,
                acknowledgement_id: raw.acknowledgement_id.clone(),
            }
        }
        other => return Err(MalformedEvent::UnknownType(other.to_string())),
    };

    Ok(NormalizedEvent {
        check,
        time,
        kind,
        summary: raw.summary,
        details: raw.details,
        tags: raw.tags,
        initial_failure_delay: raw.initial_failure_delay,
        repeat_failure_delay: raw.repeat_failure_delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_service_event() {
        let payload = serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "critical",
            "summary": "connection refused",
            "time": 1_700_000_000,
            "tags": ["db", "prod"],
        });
        let event = normalize(&payload).unwrap();
        assert_eq!(event.check, "web1");
        assert!(matches!(event.kind, EventKind::Report { condition: Condition::Critical }));
        assert_eq!(event.tags.len(), 2);
        assert_eq!(event.time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn combines_entity_and_check_into_a_sub_check_name() {
        let payload = serde_json::json!({
            "entity": "web1",
            "check": "SSH",
            "type": "service",
            "state": "ok",
            "time": 1_700_000_000,
        });
        let event = normalize(&payload).unwrap();
        assert_eq!(event.check, "web1:SSH");
    }

    #[test]
    fn rejects_empty_entity() {
        let payload = serde_json::json!({"entity": "  ", "type": "service", "state": "ok", "time": 1});
        assert!(matches!(normalize(&payload), Err(MalformedEvent::EmptyEntity)));
    }

    #[test]
    fn rejects_unknown_state() {
        let payload = serde_json::json!({"entity": "web1", "type": "service", "state": "on_fire", "time": 1});
        assert!(matches!(normalize(&payload), Err(MalformedEvent::UnknownCondition(_))));
    }

    #[test]
    fn state_is_case_insensitive() {
        let payload = serde_json::json!({"entity": "web1", "type": "service", "state": "CRITICAL", "time": 1});
        assert!(matches!(
            normalize(&payload).unwrap().kind,
            EventKind::Report { condition: Condition::Critical }
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        let payload = serde_json::json!({"entity": "web1", "type": "carrier_pigeon", "time": 1});
        assert!(matches!(normalize(&payload), Err(MalformedEvent::UnknownType(_))));
    }

    #[test]
    fn action_event_requires_duration() {
        let payload = serde_json::json!({"entity": "web1", "type": "action", "time": 1});
        assert!(matches!(normalize(&payload), Err(MalformedEvent::MissingDuration)));
    }

    #[test]
    fn accepts_well_formed_acknowledge_event() {
        let payload = serde_json::json!({
            "entity": "web1",
            "type": "action",
            "duration": 3600,
            "acknowledgement_id": "abc123",
            "time": 1_700_000_000,
        });
        let event = normalize(&payload).unwrap();
        assert!(matches!(
            event.kind,
            EventKind::Acknowledge { duration_secs: 3600, .. }
        ));
    }
}
