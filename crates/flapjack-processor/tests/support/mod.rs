use flapjack_store::Store;
use sqlx::postgres::PgPoolOptions;

pub async fn test_store() -> Store {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run flapjack-processor integration tests");

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
