use flapjack_models::{
    Check, Condition, Contact, Id, Medium, MediumType, Notification, NotificationType, Rule,
    TimeRestriction,
};
use flapjack_store::{checks, contacts, media, rules, Store};
use sqlx::postgres::PgPoolOptions;
use std::collections::BTreeSet;

async fn test_store() -> Store {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run flapjack-router integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connecting to test database");
    let store = Store::new(pool);
    store.run_migrations().await.expect("running migrations");
    sqlx::query(
        r#"
        TRUNCATE TABLE
            inbound_events, alerts, notifications, routes, rule_media, rule_tags,
            rules, media, contacts, unscheduled_maintenances, scheduled_maintenances,
            states, check_alerting_media, check_tags, checks
        RESTART IDENTITY CASCADE
        "#,
    )
    .execute(store.pool())
    .await
    .expect("truncating tables");
    store
}

#[tokio::test]
#[serial_test::serial]
async fn resolve_produces_one_alert_per_matching_contact_medium() {
    let store = test_store().await;
    let resolver = flapjack_router::RouteResolver::new(store.clone());

    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    checks::set_tags(store.pool(), check.id, &BTreeSet::from(["prod".to_string()]))
        .await
        .unwrap();

    let contact = Contact {
        id: Id::generate(),
        name: "ops".into(),
        timezone: "UTC".into(),
    };
    contacts::save(store.pool(), &contact).await.unwrap();

    let medium = Medium {
        id: Id::generate(),
        contact_id: contact.id,
        medium_type: MediumType::Email,
        address: "ops@example.com".into(),
        rollover_period_secs: 0,
        rollup_threshold: None,
    };
    media::save(store.pool(), &medium).await.unwrap();

    let rule = Rule {
        id: Id::generate(),
        contact_id: contact.id,
        conditions: None,
        time_restriction: TimeRestriction::default(),
        tags: BTreeSet::new(),
        media: vec![medium.id],
    };
    rules::save(store.pool(), &rule).await.unwrap();

    resolver.rematerialize(check.id).await.unwrap();

    let notification = Notification {
        id: Id::generate(),
        check_id: check.id,
        state_id: Id::generate(),
        notification_type: NotificationType::Problem,
        condition: Condition::Critical,
        summary: "connection refused".into(),
        created_at: chrono::Utc::now(),
    };

    let alerts = resolver.resolve(&notification).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].medium_id, medium.id);

    let reloaded = checks::get(store.pool(), check.id).await.unwrap();
    assert_eq!(reloaded.alerting_media, vec![medium.id]);
}

#[tokio::test]
#[serial_test::serial]
async fn resolve_skips_media_already_alerting_for_the_same_check() {
    let store = test_store().await;
    let resolver = flapjack_router::RouteResolver::new(store.clone());

    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let contact = Contact {
        id: Id::generate(),
        name: "ops".into(),
        timezone: "UTC".into(),
    };
    contacts::save(store.pool(), &contact).await.unwrap();
    let medium = Medium {
        id: Id::generate(),
        contact_id: contact.id,
        medium_type: MediumType::Email,
        address: "ops@example.com".into(),
        rollover_period_secs: 0,
        rollup_threshold: None,
    };
    media::save(store.pool(), &medium).await.unwrap();
    let rule = Rule {
        id: Id::generate(),
        contact_id: contact.id,
        conditions: None,
        time_restriction: TimeRestriction::default(),
        tags: BTreeSet::new(),
        media: vec![medium.id],
    };
    rules::save(store.pool(), &rule).await.unwrap();
    resolver.rematerialize(check.id).await.unwrap();

    let problem = |summary: &str| Notification {
        id: Id::generate(),
        check_id: check.id,
        state_id: Id::generate(),
        notification_type: NotificationType::Problem,
        condition: Condition::Critical,
        summary: summary.to_string(),
        created_at: chrono::Utc::now(),
    };

    let first = resolver.resolve(&problem("first")).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = resolver.resolve(&problem("second")).await.unwrap();
    assert!(second.is_empty(), "already alerting through this medium");
}
