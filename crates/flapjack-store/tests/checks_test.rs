mod support;

use flapjack_models::Check;
use flapjack_store::checks;
use std::collections::BTreeSet;

#[tokio::test]
#[serial_test::serial]
async fn insert_if_absent_is_idempotent_on_name() {
    let store = support::test_store().await;

    let first = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let second = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
#[serial_test::serial]
async fn save_round_trips_alerting_media() {
    let store = support::test_store().await;

    let mut check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    check.alerting_media = vec![flapjack_models::Id::generate(), flapjack_models::Id::generate()];
    checks::save(store.pool(), &check).await.unwrap();

    let reloaded = checks::get(store.pool(), check.id).await.unwrap();
    assert_eq!(reloaded.alerting_media.len(), 2);
}

#[tokio::test]
#[serial_test::serial]
async fn tags_round_trip_and_are_queryable_by_index() {
    let store = support::test_store().await;

    let check = checks::insert_if_absent(store.pool(), &Check::new("web1"))
        .await
        .unwrap();
    let tags: BTreeSet<String> = ["prod", "web"].into_iter().map(String::from).collect();
    checks::set_tags(store.pool(), check.id, &tags).await.unwrap();

    assert_eq!(checks::tags(store.pool(), check.id).await.unwrap(), tags);
    assert_eq!(
        checks::find_by_tag(store.pool(), "prod").await.unwrap(),
        vec![check.id]
    );
}

#[tokio::test]
#[serial_test::serial]
async fn get_unknown_check_is_not_found() {
    let store = support::test_store().await;
    let err = checks::get(store.pool(), flapjack_models::Id::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, flapjack_store::StoreError::NotFound));
}
