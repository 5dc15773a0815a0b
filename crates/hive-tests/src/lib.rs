//! Test harness for the hive gateway integration tests
//!
//! Builders for hives wired to simulated netcores, seeded in-memory stores,
//! and an indication-capturing delivery agent.

use std::sync::Arc;

use example_netcore::MockNetcore;
use hive_core::{ApiAgent, Indication, MemStore, Netcore};
use hive_gateway::Hive;
use parking_lot::Mutex;
use serde_json::json;

/// Delivery agent that records every indication it is handed.
#[derive(Default)]
pub struct CaptureAgent {
    inds: Mutex<Vec<Indication>>,
}

impl CaptureAgent {
    /// All captured indications, in delivery order.
    pub fn all(&self) -> Vec<Indication> {
        self.inds.lock().clone()
    }

    /// Captured indications of one type.
    pub fn of_kind(&self, kind: &str) -> Vec<Indication> {
        self.inds
            .lock()
            .iter()
            .filter(|i| i.kind == kind)
            .cloned()
            .collect()
    }
}

impl ApiAgent for CaptureAgent {
    fn indicate(&self, ind: Indication) {
        self.inds.lock().push(ind);
    }
}

/// Everything a test needs to drive one hive.
pub struct TestRig {
    pub hive: Arc<Hive>,
    pub netcores: Vec<Arc<MockNetcore>>,
    pub agent: Arc<CaptureAgent>,
    pub dev_store: Arc<MemStore>,
    pub gad_store: Arc<MemStore>,
}

/// Build a hive over the given simulated netcores with empty stores.
pub fn rig(netcores: Vec<Arc<MockNetcore>>) -> TestRig {
    rig_with_stores(netcores, Arc::new(MemStore::new()), Arc::new(MemStore::new()))
}

/// Build a hive over the given simulated netcores and pre-seeded stores.
pub fn rig_with_stores(
    netcores: Vec<Arc<MockNetcore>>,
    dev_store: Arc<MemStore>,
    gad_store: Arc<MemStore>,
) -> TestRig {
    let agent = Arc::new(CaptureAgent::default());
    let hive = Hive::new(
        netcores
            .iter()
            .map(|nc| nc.clone() as Arc<dyn Netcore>)
            .collect(),
        dev_store.clone(),
        gad_store.clone(),
        agent.clone(),
    )
    .expect("netcore names are unique in tests");

    TestRig {
        hive: Arc::new(hive),
        netcores,
        agent,
        dev_store,
        gad_store,
    }
}

/// Persisted device snapshot record, as a previous run would have left it.
pub fn device_record(netcore: &str, id: u32, perm_addr: &str, gads: &[u32]) -> serde_json::Value {
    json!({
        "netcore": netcore,
        "id": id,
        "gads": gads,
        "net": { "address": { "permanent": perm_addr } },
        "attrs": null
    })
}

/// Persisted gadget snapshot record.
pub fn gadget_record(
    netcore: &str,
    id: u32,
    aux_id: &str,
    dev_id: u32,
    perm_addr: &str,
) -> serde_json::Value {
    json!({
        "netcore": netcore,
        "id": id,
        "auxId": aux_id,
        "dev": { "id": dev_id, "permAddr": perm_addr },
        "attrs": null
    })
}
