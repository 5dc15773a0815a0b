//! EntityBox - identity-keyed registry with persistence-assisted bootstrap

use std::collections::HashMap;
use std::sync::Arc;

use hive_core::{DocStore, HiveError, HiveResult, StoreFilter};
use tracing::{debug, warn};

use crate::entity::Entity;

/// Identity-keyed store of devices or gadgets.
///
/// Guarantees at-most-one entry per numeric identity and per network key.
/// Identities come from a monotonically increasing counter and are never
/// handed out twice within a process, so an id stays unambiguous while an
/// unregistration is still settling elsewhere.
///
/// The box is bound to its persisted store: registrations are mirrored into
/// it and [`EntityBox::load_from_store`] rebuilds placeholder entities from
/// it during recovery. Store write failures are logged and otherwise
/// ignored; durability is the store's concern.
pub struct EntityBox<T: Entity> {
    entries: HashMap<u32, T>,
    /// Registration order, for stable bulk iteration
    order: Vec<u32>,
    /// Network-key uniqueness index
    keys: HashMap<T::Key, u32>,
    next_id: u32,
    store: Arc<dyn DocStore>,
}

impl<T: Entity> EntityBox<T> {
    pub fn new(store: Arc<dyn DocStore>) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            keys: HashMap::new(),
            next_id: 0,
            store,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entity under `id`, if any.
    pub fn get(&self, id: u32) -> Option<T> {
        self.entries.get(&id).cloned()
    }

    /// First entity matching `pred`, scanning in registration order.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .find(|e| pred(e))
            .cloned()
    }

    /// All entities matching `pred`, in registration order.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|e| pred(e))
            .cloned()
            .collect()
    }

    /// Insert `entity`, assigning a fresh identity when it has none.
    ///
    /// Fails with [`HiveError::Duplicate`] - without touching the registry -
    /// when the identity or the network key is already taken. On success the
    /// snapshot record is mirrored into the persisted store.
    pub async fn register(&mut self, mut entity: T) -> HiveResult<u32> {
        let key = entity.key();
        if let Some(taken) = self.keys.get(&key) {
            return Err(HiveError::Duplicate(format!(
                "{} {:?} already registered as id {}",
                T::kind(),
                key,
                taken
            )));
        }

        let id = match entity.id() {
            Some(id) => {
                if self.entries.contains_key(&id) {
                    return Err(HiveError::Duplicate(format!(
                        "{} id {} already registered",
                        T::kind(),
                        id
                    )));
                }
                // Keep the counter ahead of externally supplied ids.
                self.next_id = self.next_id.max(id);
                id
            }
            None => {
                self.next_id += 1;
                entity.set_id(self.next_id);
                self.next_id
            }
        };

        let record = entity.dump();
        self.entries.insert(id, entity);
        self.order.push(id);
        self.keys.insert(key, id);
        debug!(kind = T::kind(), id, "registered entity");

        // Upsert: a recovered entity re-registers under its persisted id.
        let stale = StoreFilter::new().field("id", id);
        if let Err(e) = self.store.remove_matching(&stale).await {
            warn!(kind = T::kind(), id, error = %e, "failed to drop stale record");
        }
        if let Err(e) = self.store.insert(record).await {
            warn!(kind = T::kind(), id, error = %e, "failed to persist entity");
        }

        Ok(id)
    }

    /// Remove the entry under `id`.
    ///
    /// Idempotent: removing an absent id is not an error and still reports
    /// the requested id.
    pub async fn unregister(&mut self, id: u32) -> u32 {
        if let Some(entity) = self.entries.remove(&id) {
            self.order.retain(|x| *x != id);
            self.keys.remove(&entity.key());
            debug!(kind = T::kind(), id, "unregistered entity");

            let filter = StoreFilter::new().field("id", id);
            if let Err(e) = self.store.remove_matching(&filter).await {
                warn!(kind = T::kind(), id, error = %e, "failed to remove persisted entity");
            }
        }
        id
    }

    /// Mutate the entry under `id` in place. The closure must not change
    /// identity or network-key fields. Returns whether the entry existed.
    pub fn modify(&mut self, id: u32, f: impl FnOnce(&mut T)) -> bool {
        match self.entries.get_mut(&id) {
            Some(entity) => {
                f(entity);
                true
            }
            None => false,
        }
    }

    /// Rebuild placeholder entities from persisted documents matching
    /// `filter`, in `recovering` state. Nothing is registered here; that is
    /// the recovery reconciler's call to make, per entity. Corrupt documents
    /// are logged and skipped so one bad record cannot block recovery.
    pub async fn load_from_store(&self, filter: &StoreFilter) -> HiveResult<Vec<T>> {
        let docs = self
            .store
            .find_matching(filter)
            .await
            .map_err(|e| HiveError::Store(e.to_string()))?;

        let mut loaded = Vec::with_capacity(docs.len());
        for doc in docs {
            match T::from_record(&doc.body) {
                Ok(mut entity) => {
                    entity.set_recovering(true);
                    loaded.push(entity);
                }
                Err(e) => {
                    warn!(kind = T::kind(), key = %doc.key, error = %e, "skipping corrupt document");
                }
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use hive_core::{Device, MemStore};
    use pretty_assertions::assert_eq;

    use super::*;

    fn devbox() -> EntityBox<Device> {
        EntityBox::new(Arc::new(MemStore::new()))
    }

    #[tokio::test]
    async fn register_assigns_ids_and_round_trips() {
        let mut devs = devbox();

        let id = devs.register(Device::new("zb0", "00:01")).await.unwrap();
        assert_eq!(id, 1);

        let dev = devs.get(id).unwrap();
        assert_eq!(dev.id, Some(id));
        assert_eq!(dev.perm_addr(), "00:01");
    }

    #[tokio::test]
    async fn duplicate_address_is_rejected_without_overwrite() {
        let mut devs = devbox();
        let id = devs.register(Device::new("zb0", "00:01")).await.unwrap();

        let err = devs
            .register(Device::new("zb0", "00:01"))
            .await
            .unwrap_err();
        assert!(matches!(err, HiveError::Duplicate(_)));
        assert_eq!(devs.len(), 1);
        assert_eq!(devs.get(id).unwrap().id, Some(id));
    }

    #[tokio::test]
    async fn same_address_on_other_netcore_is_fine() {
        let mut devs = devbox();
        devs.register(Device::new("zb0", "00:01")).await.unwrap();
        devs.register(Device::new("ble0", "00:01")).await.unwrap();
        assert_eq!(devs.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let mut devs = devbox();
        let mut a = Device::new("zb0", "00:01");
        a.id = Some(7);
        let mut b = Device::new("zb0", "00:02");
        b.id = Some(7);

        devs.register(a).await.unwrap();
        let err = devs.register(b).await.unwrap_err();
        assert!(matches!(err, HiveError::Duplicate(_)));
    }

    #[tokio::test]
    async fn counter_never_reissues_an_external_id() {
        let mut devs = devbox();
        let mut a = Device::new("zb0", "00:01");
        a.id = Some(10);
        devs.register(a).await.unwrap();

        let id = devs.register(Device::new("zb0", "00:02")).await.unwrap();
        assert_eq!(id, 11);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let mut devs = devbox();
        let id = devs.register(Device::new("zb0", "00:01")).await.unwrap();

        assert_eq!(devs.unregister(id).await, id);
        assert!(devs.get(id).is_none());

        // Absent id: still reports the requested id, no error.
        assert_eq!(devs.unregister(id).await, id);

        // The key is free again.
        devs.register(Device::new("zb0", "00:01")).await.unwrap();
    }

    #[tokio::test]
    async fn find_and_filter_scan_in_registration_order() {
        let mut devs = devbox();
        devs.register(Device::new("zb0", "00:01")).await.unwrap();
        devs.register(Device::new("ble0", "00:02")).await.unwrap();
        devs.register(Device::new("zb0", "00:03")).await.unwrap();

        let first = devs.find(|d| d.netcore == "zb0").unwrap();
        assert_eq!(first.perm_addr(), "00:01");

        let zb: Vec<_> = devs
            .filter(|d| d.netcore == "zb0")
            .into_iter()
            .map(|d| d.perm_addr().to_string())
            .collect();
        assert_eq!(zb, vec!["00:01", "00:03"]);
    }

    #[tokio::test]
    async fn load_from_store_marks_recovering_and_skips_corrupt() {
        let store = Arc::new(MemStore::new());
        store.seed(serde_json::json!({
            "netcore": "zb0",
            "id": 10,
            "gads": [],
            "net": { "address": { "permanent": "00:00:00:00:01" } }
        }));
        store.seed(serde_json::json!({ "netcore": "zb0", "garbage": true }));

        let devs: EntityBox<Device> = EntityBox::new(store);
        let loaded = devs
            .load_from_store(&StoreFilter::new().field("netcore", "zb0"))
            .await
            .unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].recovering);
        assert_eq!(loaded[0].id, Some(10));
        // Loading does not register.
        assert!(devs.get(10).is_none());
    }

    #[tokio::test]
    async fn register_mirrors_into_store_and_unregister_cleans_up() {
        let store = Arc::new(MemStore::new());
        let mut devs: EntityBox<Device> = EntityBox::new(store.clone());

        let id = devs.register(Device::new("zb0", "00:01")).await.unwrap();
        assert_eq!(store.len(), 1);

        devs.unregister(id).await;
        assert!(store.is_empty());
    }
}
