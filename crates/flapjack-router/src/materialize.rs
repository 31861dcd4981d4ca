use flapjack_models::{Id, Route, Rule};
use std::collections::BTreeSet;

/// Recomputes the full set of Routes for a check against the current rule
/// set (spec.md §4.D). A rule produces a route for this check iff it's
/// generic (no tags) or its tag set is a subset of the check's tags.
/// `is_alerting` always starts false: it's an output of the Route
/// Resolver's routing decisions, not an input to materialization.
pub fn materialize_routes(check_id: Id, check_tags: &BTreeSet<String>, rules: &[Rule]) -> Vec<Route> {
    rules
        .iter()
        .filter(|rule| rule.is_generic() || rule.matches_tags(check_tags))
        .map(|rule| Route {
            id: Id::generate(),
            check_id,
            rule_id: rule.id,
            is_alerting: false,
            conditions: rule.conditions.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapjack_models::{Condition, Contact, TimeRestriction};
    use std::collections::BTreeSet;

    fn rule(tags: &[&str], conditions: Option<&[Condition]>) -> Rule {
        Rule {
            id: Id::generate(),
            contact_id: Id::generate(),
            conditions: conditions.map(|c| c.iter().copied().collect()),
            time_restriction: TimeRestriction::default(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            media: vec![Id::generate()],
        }
    }

    #[test]
    fn generic_rule_matches_every_check() {
        let r = rule(&[], None);
        let tags: BTreeSet<String> = ["db", "prod"].iter().map(|s| s.to_string()).collect();
        let routes = materialize_routes(Id::generate(), &tags, std::slice::from_ref(&r));
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn tagged_rule_requires_subset() {
        let r = rule(&["db", "prod"], None);
        let has_both: BTreeSet<String> = ["db", "prod", "west"].iter().map(|s| s.to_string()).collect();
        let missing_one: BTreeSet<String> = ["db"].iter().map(|s| s.to_string()).collect();

        assert_eq!(materialize_routes(Id::generate(), &has_both, std::slice::from_ref(&r)).len(), 1);
        assert_eq!(materialize_routes(Id::generate(), &missing_one, std::slice::from_ref(&r)).len(), 0);
    }

    #[test]
    fn unrelated_contact_ignored() {
        let _ = Contact {
            id: Id::generate(),
            name: "nobody".into(),
            timezone: "UTC".into(),
        };
        let r = rule(&["cache"], None);
        let tags: BTreeSet<String> = ["db"].iter().map(|s| s.to_string()).collect();
        assert!(materialize_routes(Id::generate(), &tags, std::slice::from_ref(&r)).is_empty());
    }
}
