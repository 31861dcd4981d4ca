use flapjack_models::{Condition, Id, Route, Rule};

/// One (contact, medium) pair that should receive a delivery for a
/// notification, before rollover/rollup bookkeeping is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDelivery {
    pub route_id: Id,
    pub rule_id: Id,
    pub contact_id: Id,
    pub medium_id: Id,
}

/// Picks which (contact, medium) pairs should hear about a notification at
/// `condition`/`at`, given the check's materialized routes and the rules
/// they reference. A route is a candidate iff its condition filter matches
/// and its rule's time restriction is active in the owning contact's
/// timezone. `tz_for_contact` is supplied by the caller so this function
/// stays free of any store access. `route.is_alerting` plays no part here —
/// it's an output the Route Resolver sets once a delivery actually goes
/// out, not an input filter on whether one should.
pub fn select_deliveries(
    condition: Condition,
    at: chrono::DateTime<chrono::Utc>,
    routes: &[Route],
    rules: &[Rule],
    tz_for_contact: impl Fn(Id) -> chrono_tz::Tz,
) -> Vec<CandidateDelivery> {
    let mut deliveries = Vec::new();

    for route in routes {
        if !route.matches_condition(condition) {
            continue;
        }
        let Some(rule) = rules.iter().find(|r| r.id == route.rule_id) else {
            continue;
        };
        if !rule.matches_condition(condition) {
            continue;
        }
        let tz = tz_for_contact(rule.contact_id);
        if !rule.time_restriction.is_active_at(at, tz) {
            continue;
        }
        for medium_id in &rule.media {
            deliveries.push(CandidateDelivery {
                route_id: route.id,
                rule_id: rule.id,
                contact_id: rule.contact_id,
                medium_id: *medium_id,
            });
        }
    }

    deliveries
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapjack_models::TimeRestriction;

    fn route(rule_id: Id, conditions: Option<&[Condition]>) -> Route {
        Route {
            id: Id::generate(),
            check_id: Id::generate(),
            rule_id,
            is_alerting: false,
            conditions: conditions.map(|c| c.iter().copied().collect()),
        }
    }

    fn rule(contact_id: Id, media: Vec<Id>) -> Rule {
        Rule {
            id: Id::generate(),
            contact_id,
            conditions: None,
            time_restriction: TimeRestriction::default(),
            tags: Default::default(),
            media,
        }
    }

    #[test]
    fn matching_condition_with_always_active_window_selects_every_medium() {
        let contact_id = Id::generate();
        let medium_a = Id::generate();
        let medium_b = Id::generate();
        let r = rule(contact_id, vec![medium_a, medium_b]);
        let routes = vec![route(r.id, None)];

        let out = select_deliveries(
            Condition::Critical,
            chrono::Utc::now(),
            &routes,
            &[r],
            |_| chrono_tz::UTC,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unmatched_condition_on_route_is_skipped() {
        let contact_id = Id::generate();
        let r = rule(contact_id, vec![Id::generate()]);
        let route = route(r.id, Some(&[Condition::Critical]));

        let out = select_deliveries(
            Condition::Warning,
            chrono::Utc::now(),
            &[route],
            &[r],
            |_| chrono_tz::UTC,
        );
        assert!(out.is_empty(), "route only wants critical");
    }

    #[test]
    fn condition_filter_on_route_and_rule_both_apply() {
        let contact_id = Id::generate();
        let mut r = rule(contact_id, vec![Id::generate()]);
        r.conditions = Some([Condition::Critical].into_iter().collect());
        let routes = vec![route(r.id, Some(&[Condition::Critical, Condition::Warning]))];

        let warning = select_deliveries(Condition::Warning, chrono::Utc::now(), &routes, &[r.clone()], |_| chrono_tz::UTC);
        assert!(warning.is_empty(), "rule only wants critical");

        let critical = select_deliveries(Condition::Critical, chrono::Utc::now(), &routes, &[r], |_| chrono_tz::UTC);
        assert_eq!(critical.len(), 1);
    }
}
