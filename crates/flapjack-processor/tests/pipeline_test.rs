mod support;

use flapjack_maintenance::MaintenanceManager;
use flapjack_processor::CheckProcessor;
use flapjack_router::RouteResolver;
use flapjack_store::{checks, notifications};

const BASE_TIME: i64 = 1_700_000_000;

fn processor(store: flapjack_store::Store) -> CheckProcessor {
    let maintenance = MaintenanceManager::new(store.clone());
    let router = RouteResolver::new(store.clone());
    CheckProcessor::new(store, maintenance, router)
}

#[tokio::test]
#[serial_test::serial]
async fn first_failure_creates_check_and_notifies_immediately() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    let payload = serde_json::json!({
        "entity": "web1",
        "type": "service",
        "state": "critical",
        "summary": "connection refused",
        "time": BASE_TIME,
    });
    processor.process_payload(&payload).await.unwrap();

    let check = checks::get_by_name(store.pool(), "web1").await.unwrap().unwrap();
    assert!(check.failing);
    assert_eq!(check.notification_count, 1);

    let notifications = notifications::dequeue_unrouted(store.pool(), 10).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].notification_type, flapjack_models::NotificationType::Problem);
}

#[tokio::test]
#[serial_test::serial]
async fn repeat_failures_within_delay_do_not_renotify() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    for i in 0..3 {
        let payload = serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "critical",
            "time": BASE_TIME + i,
        });
        processor.process_payload(&payload).await.unwrap();
    }

    let check = checks::get_by_name(store.pool(), "web1").await.unwrap().unwrap();
    assert_eq!(check.notification_count, 1);
}

#[tokio::test]
#[serial_test::serial]
async fn recovery_clears_failing_state_and_notifies() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "critical",
            "time": BASE_TIME,
        }))
        .await
        .unwrap();
    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "ok",
            "time": BASE_TIME + 1,
        }))
        .await
        .unwrap();

    let check = checks::get_by_name(store.pool(), "web1").await.unwrap().unwrap();
    assert!(!check.failing);
    assert!(check.failing_since.is_none());
    assert_eq!(check.notification_count, 2);

    let notifications = notifications::dequeue_unrouted(store.pool(), 10).await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[1].notification_type, flapjack_models::NotificationType::Recovery);
}

#[tokio::test]
#[serial_test::serial]
async fn tags_from_first_event_stick_and_rematerialize_routes() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "ok",
            "tags": ["prod", "web"],
            "time": BASE_TIME,
        }))
        .await
        .unwrap();
    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "ok",
            "tags": ["staging"],
            "time": BASE_TIME + 1,
        }))
        .await
        .unwrap();

    let check = checks::get_by_name(store.pool(), "web1").await.unwrap().unwrap();
    let tags = checks::tags(store.pool(), check.id).await.unwrap();
    assert!(tags.contains("prod"));
    assert!(!tags.contains("staging"));
}

#[tokio::test]
#[serial_test::serial]
async fn malformed_payload_is_rejected_before_touching_the_store() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    let err = processor
        .process_payload(&serde_json::json!({
            "entity": "",
            "type": "service",
            "state": "critical",
            "time": BASE_TIME,
        }))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("non-empty"));
    assert!(checks::get_by_name(store.pool(), "").await.unwrap().is_none());
}

#[tokio::test]
#[serial_test::serial]
async fn acknowledge_event_opens_maintenance_and_clears_alerting() {
    let store = support::test_store().await;
    let processor = processor(store.clone());

    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "service",
            "state": "critical",
            "time": BASE_TIME,
        }))
        .await
        .unwrap();

    processor
        .process_payload(&serde_json::json!({
            "entity": "web1",
            "type": "action",
            "duration": 300,
            "summary": "investigating",
            "time": BASE_TIME + 1,
        }))
        .await
        .unwrap();

    let check = checks::get_by_name(store.pool(), "web1").await.unwrap().unwrap();
    assert!(check.failing);
}
