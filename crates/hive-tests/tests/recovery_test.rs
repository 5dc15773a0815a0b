//! Startup recovery: persisted entities are re-attached, confirmed against
//! their live netcore, and re-linked, with per-entity fault tolerance.

use std::sync::Arc;

use example_netcore::MockNetcore;
use hive_core::MemStore;
use hive_tests::{device_record, gadget_record, rig_with_stores};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn persisted_device_comes_back_confirmed() {
    let dev_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:00:00:00:01", &[]));

    let t = rig_with_stores(
        vec![Arc::new(MockNetcore::new("zb0").with_device("00:00:00:00:01"))],
        dev_store,
        Arc::new(MemStore::new()),
    );
    t.hive.start().await.unwrap();

    let dev = t.hive.device(10).await.unwrap();
    assert!(!dev.recovering);
    assert_eq!(dev.perm_addr(), "00:00:00:00:01");
    assert!(t.netcores[0]
        .calls()
        .contains(&"ping:00:00:00:00:01".to_string()));
}

#[tokio::test]
async fn gadgets_are_recovered_and_relinked() {
    let dev_store = Arc::new(MemStore::new());
    let gad_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:00:00:00:01", &[5]));
    gad_store.seed(gadget_record("zb0", 5, "aa/cc", 10, "00:00:00:00:01"));

    let t = rig_with_stores(
        vec![Arc::new(MockNetcore::new("zb0").with_device("00:00:00:00:01"))],
        dev_store,
        gad_store,
    );
    t.hive.start().await.unwrap();

    let gad = t
        .hive
        .gadget_by_net("zb0", "00:00:00:00:01", "aa/cc")
        .await
        .unwrap();
    assert_eq!(gad.id, Some(5));
    assert!(!gad.recovering);
    assert_eq!(t.hive.device(10).await.unwrap().gads, vec![5]);
}

#[tokio::test]
async fn recovery_is_scoped_per_netcore() {
    let dev_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:01", &[]));
    dev_store.seed(device_record("ble0", 20, "00:02", &[]));

    let t = rig_with_stores(
        vec![Arc::new(MockNetcore::new("zb0").with_device("00:01"))],
        dev_store,
        Arc::new(MemStore::new()),
    );
    t.hive.start().await.unwrap();

    // Only zb0's device is in this pool; the ble0 record stays dormant.
    assert!(t.hive.device(10).await.is_some());
    assert!(t.hive.device(20).await.is_none());
}

#[tokio::test]
async fn failed_poke_does_not_abort_sibling_recovery() {
    let dev_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:01", &[]));
    dev_store.seed(device_record("zb0", 11, "00:02", &[]));

    let nc = Arc::new(MockNetcore::new("zb0").with_device("00:01").with_device("00:02"));
    nc.set_unreachable("00:02");

    let t = rig_with_stores(vec![nc], dev_store, Arc::new(MemStore::new()));
    // Recovery failures never fail the start.
    t.hive.start().await.unwrap();

    assert!(t.hive.device(10).await.is_some());
    assert!(t.hive.device(11).await.is_none());
}

#[tokio::test]
async fn gadget_of_an_unrecovered_device_is_skipped() {
    let dev_store = Arc::new(MemStore::new());
    let gad_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:01", &[5]));
    gad_store.seed(gadget_record("zb0", 5, "aa/cc", 10, "00:01"));

    // The device's poke fails, so it never comes back - its gadget must not
    // dangle in the registry.
    let nc = Arc::new(MockNetcore::new("zb0").with_device("00:01"));
    nc.set_unreachable("00:01");

    let t = rig_with_stores(vec![nc], dev_store, gad_store);
    t.hive.start().await.unwrap();

    assert!(t.hive.device(10).await.is_none());
    assert!(t.hive.gadget(5).await.is_none());
}

#[tokio::test]
async fn fresh_registrations_after_recovery_get_new_ids() {
    let dev_store = Arc::new(MemStore::new());
    dev_store.seed(device_record("zb0", 10, "00:01", &[]));

    let t = rig_with_stores(
        vec![Arc::new(
            MockNetcore::new("zb0").with_device("00:01").with_device("00:02"),
        )],
        dev_store,
        Arc::new(MemStore::new()),
    );
    t.hive.start().await.unwrap();

    let id = t
        .hive
        .register_device(hive_core::Device::new("zb0", "00:02"))
        .await
        .unwrap();
    // The identity counter stayed ahead of the recovered id.
    assert_eq!(id, 11);
}

#[tokio::test]
async fn empty_store_means_empty_registries() {
    let t = rig_with_stores(
        vec![Arc::new(MockNetcore::new("zb0"))],
        Arc::new(MemStore::new()),
        Arc::new(MemStore::new()),
    );
    t.hive.start().await.unwrap();
    assert!(t.hive.devices(|_| true).await.is_empty());
    assert!(t.hive.gadgets(|_| true).await.is_empty());
}
