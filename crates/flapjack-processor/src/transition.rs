use flapjack_models::{Check, Condition, NotificationType};

/// The observable result of feeding one condition report into a check's
/// state machine (spec.md §4.B). `notify` is `None` when the report doesn't
/// warrant a notification (still within the initial failure delay, still
/// within the repeat failure delay and not an escalation, or a no-op
/// healthy-while-healthy report).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub condition: Condition,
    pub failing: bool,
    pub failing_since: Option<chrono::DateTime<chrono::Utc>>,
    pub last_problem_notified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub most_severe: Option<Condition>,
    pub notify: Option<NotificationType>,
}

/// Applies one reported `condition` to `check`'s current state at `now`.
/// Pure so the hold-down, repeat-delay, and escalation-bypass rules can be
/// tested without a database.
pub fn apply(check: &Check, condition: Condition, now: chrono::DateTime<chrono::Utc>) -> Decision {
    if condition.is_healthy() {
        return if check.failing {
            Decision {
                condition,
                failing: false,
                failing_since: None,
                last_problem_notified_at: None,
                most_severe: None,
                notify: Some(NotificationType::Recovery),
            }
        } else {
            Decision {
                condition,
                failing: false,
                failing_since: None,
                last_problem_notified_at: None,
                most_severe: None,
                notify: None,
            }
        };
    }

    // Unhealthy report. `failing_since` restarts on every healthy ->
    // unhealthy transition (spec.md §9 open question, resolved that way),
    // not merely set once.
    let failing_since = if check.failing {
        check.failing_since.unwrap_or(now)
    } else {
        now
    };

    let is_escalation = check
        .most_severe
        .map(|prev| condition.is_worse_than(prev))
        .unwrap_or(true);

    let past_initial_delay = now - failing_since
        >= chrono::Duration::seconds(check.initial_failure_delay_secs.max(0));

    let past_repeat_delay = match check.last_problem_notified_at {
        None => true,
        Some(last) => {
            now - last >= chrono::Duration::seconds(check.repeat_failure_delay_secs.max(0))
        }
    };

    // Escalation bypasses the repeat-failure-delay hold-down but not the
    // initial-failure-delay: a check that hasn't cleared its initial delay
    // yet doesn't notify just because it got worse.
    let should_notify = past_initial_delay && (past_repeat_delay || (check.failing && is_escalation));

    let most_severe = Some(match check.most_severe {
        Some(prev) if prev.is_worse_than(condition) => prev,
        _ => condition,
    });

    Decision {
        condition,
        failing: true,
        failing_since: Some(failing_since),
        last_problem_notified_at: if should_notify {
            Some(now)
        } else {
            check.last_problem_notified_at
        },
        most_severe,
        notify: should_notify.then_some(NotificationType::Problem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapjack_models::Id;

    fn check() -> Check {
        Check::new("web1")
    }

    fn at(secs: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::UNIX_EPOCH + chrono::Duration::seconds(secs)
    }

    #[test]
    fn first_failure_with_zero_delay_notifies_immediately() {
        let c = check();
        let d = apply(&c, Condition::Critical, at(0));
        assert_eq!(d.notify, Some(NotificationType::Problem));
        assert!(d.failing);
        assert_eq!(d.failing_since, Some(at(0)));
    }

    #[test]
    fn initial_failure_delay_holds_down_first_notification() {
        let mut c = check();
        c.initial_failure_delay_secs = 60;
        let d = apply(&c, Condition::Critical, at(0));
        assert_eq!(d.notify, None);
        assert!(d.failing, "check is failing even though no notification fired yet");
    }

    #[test]
    fn notification_fires_once_initial_delay_elapses() {
        let mut c = check();
        c.initial_failure_delay_secs = 60;
        c.failing = true;
        c.failing_since = Some(at(0));
        c.most_severe = Some(Condition::Critical);
        let d = apply(&c, Condition::Critical, at(60));
        assert_eq!(d.notify, Some(NotificationType::Problem));
    }

    #[test]
    fn repeat_delay_suppresses_duplicate_notifications() {
        let mut c = check();
        c.failing = true;
        c.failing_since = Some(at(0));
        c.last_problem_notified_at = Some(at(0));
        c.most_severe = Some(Condition::Critical);
        c.repeat_failure_delay_secs = 300;

        let d = apply(&c, Condition::Critical, at(100));
        assert_eq!(d.notify, None, "still within repeat delay");
    }

    #[test]
    fn repeat_delay_fires_once_elapsed() {
        let mut c = check();
        c.failing = true;
        c.failing_since = Some(at(0));
        c.last_problem_notified_at = Some(at(0));
        c.most_severe = Some(Condition::Critical);
        c.repeat_failure_delay_secs = 300;

        let d = apply(&c, Condition::Critical, at(301));
        assert_eq!(d.notify, Some(NotificationType::Problem));
    }

    #[test]
    fn escalation_bypasses_repeat_delay() {
        let mut c = check();
        c.failing = true;
        c.failing_since = Some(at(0));
        c.last_problem_notified_at = Some(at(0));
        c.most_severe = Some(Condition::Warning);
        c.repeat_failure_delay_secs = 300;

        let d = apply(&c, Condition::Critical, at(10));
        assert_eq!(d.notify, Some(NotificationType::Problem), "escalation bypasses hold-down");
        assert_eq!(d.most_severe, Some(Condition::Critical));
    }

    #[test]
    fn milder_condition_does_not_downgrade_most_severe() {
        let mut c = check();
        c.failing = true;
        c.failing_since = Some(at(0));
        c.most_severe = Some(Condition::Critical);

        let d = apply(&c, Condition::Warning, at(1));
        assert_eq!(d.most_severe, Some(Condition::Critical));
    }

    #[test]
    fn recovery_clears_failure_bookkeeping() {
        let mut c = check();
        c.id = Id::generate();
        c.failing = true;
        c.failing_since = Some(at(0));
        c.most_severe = Some(Condition::Critical);
        c.last_problem_notified_at = Some(at(0));

        let d = apply(&c, Condition::Ok, at(10));
        assert_eq!(d.notify, Some(NotificationType::Recovery));
        assert!(!d.failing);
        assert_eq!(d.failing_since, None);
        assert_eq!(d.most_severe, None);
    }

    #[test]
    fn healthy_while_already_healthy_is_a_no_op() {
        let c = check();
        let d = apply(&c, Condition::Ok, at(10));
        assert_eq!(d.notify, None);
    }
}
