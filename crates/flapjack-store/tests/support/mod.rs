use flapjack_store::Store;
use sqlx::postgres::PgPoolOptions;

/// Connects to the database named by `DATABASE_URL`, runs migrations, and
/// truncates every table so the test starts from a blank slate. Panics
/// loudly if `DATABASE_URL` isn't set rather than silently skipping —
/// these tests need a real Postgres instance.
pub async fn test_store() -> Store {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run flapjack-store integration tests");

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
