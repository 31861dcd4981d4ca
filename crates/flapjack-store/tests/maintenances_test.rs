mod support;

use chrono::{Duration, Utc};
use flapjack_models::Check;
use flapjack_store::{checks, maintenances};

#[tokio::test]
#[serial_test::serial]
async fn unscheduled_maintenance_covers_current_time_until_ended() {
    let store = support::test_store().await;
    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let now = Utc::now();

    maintenances::start_unscheduled(store.pool(), check.id, now, Some("ack".into()))
        .await
        .unwrap();
    assert!(maintenances::current_unscheduled(store.pool(), check.id, now)
        .await
        .unwrap()
        .is_some());

    maintenances::end_unscheduled(store.pool(), check.id, now + Duration::seconds(1))
        .await
        .unwrap();
    assert!(
        maintenances::current_unscheduled(store.pool(), check.id, now + Duration::seconds(2))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial_test::serial]
async fn acknowledging_twice_extends_rather_than_duplicates() {
    let store = support::test_store().await;
    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let now = Utc::now();

    let first = maintenances::start_unscheduled(store.pool(), check.id, now, None)
        .await
        .unwrap();
    let second = maintenances::start_unscheduled(store.pool(), check.id, now, None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
#[serial_test::serial]
async fn scheduled_maintenance_only_covers_its_window() {
    let store = support::test_store().await;
    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let start = Utc::now();
    let end = start + Duration::hours(1);

    let m = flapjack_models::ScheduledMaintenance {
        id: flapjack_models::Id::generate(),
        check_id: check.id,
        start_time: start,
        end_time: end,
        summary: None,
    };
    maintenances::schedule(store.pool(), &m).await.unwrap();

    assert!(maintenances::in_scheduled(store.pool(), check.id, start - Duration::seconds(1))
        .await
        .unwrap()
        .is_empty());
    assert!(!maintenances::in_scheduled(store.pool(), check.id, start)
        .await
        .unwrap()
        .is_empty());
    assert!(maintenances::in_scheduled(store.pool(), check.id, end)
        .await
        .unwrap()
        .is_empty());
}
