//! NetcorePool - name-indexed collection of protocol drivers

use std::collections::HashMap;
use std::sync::Arc;

use hive_core::{HiveError, HiveResult, Netcore};
use tracing::info;

/// Netcore adapters, indexed by name, unique per pool.
///
/// Drivers are owned here for the process lifetime. Registration order is
/// preserved because fan-out dispatches in it.
#[derive(Default)]
pub struct NetcorePool {
    ordered: Vec<Arc<dyn Netcore>>,
    by_name: HashMap<String, usize>,
}

impl NetcorePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver. Fails with [`HiveError::Conflict`] when its name is
    /// already taken.
    pub fn insert(&mut self, nc: Arc<dyn Netcore>) -> HiveResult<()> {
        let name = nc.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(HiveError::Conflict(format!(
                "netcore '{name}' already in pool"
            )));
        }
        info!(netcore = %name, "netcore added to pool");
        self.by_name.insert(name, self.ordered.len());
        self.ordered.push(nc);
        Ok(())
    }

    /// Driver under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Netcore>> {
        self.by_name.get(name).map(|idx| self.ordered[*idx].clone())
    }

    /// All drivers, in registration order.
    pub fn all(&self) -> Vec<Arc<dyn Netcore>> {
        self.ordered.clone()
    }

    /// Driver names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.ordered
            .iter()
            .map(|nc| nc.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hive_core::{NetcoreResult, ResetMode};
    use pretty_assertions::assert_eq;

    use super::*;

    struct NamedNc(&'static str);

    #[async_trait]
    impl Netcore for NamedNc {
        fn name(&self) -> &str {
            self.0
        }
        async fn start(&self) -> NetcoreResult<()> {
            Ok(())
        }
        async fn stop(&self) -> NetcoreResult<()> {
            Ok(())
        }
        async fn reset(&self, _mode: ResetMode) -> NetcoreResult<()> {
            Ok(())
        }
        async fn permit_join(&self, _duration: u32) -> NetcoreResult<()> {
            Ok(())
        }
        async fn remove(&self, _perm_addr: &str) -> NetcoreResult<()> {
            Ok(())
        }
        async fn ban(&self, _perm_addr: &str) -> NetcoreResult<()> {
            Ok(())
        }
        async fn unban(&self, _perm_addr: &str) -> NetcoreResult<()> {
            Ok(())
        }
        async fn ping(&self, _perm_addr: &str) -> NetcoreResult<()> {
            Ok(())
        }
        async fn maintain(&self) -> NetcoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_name_is_a_conflict() {
        let mut pool = NetcorePool::new();
        pool.insert(Arc::new(NamedNc("zb0"))).unwrap();

        let err = pool.insert(Arc::new(NamedNc("zb0"))).unwrap_err();
        assert!(matches!(err, HiveError::Conflict(_)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn lookup_and_order() {
        let mut pool = NetcorePool::new();
        pool.insert(Arc::new(NamedNc("zb0"))).unwrap();
        pool.insert(Arc::new(NamedNc("ble0"))).unwrap();

        assert!(pool.get("zb0").is_some());
        assert!(pool.get("nope").is_none());
        assert_eq!(pool.names(), vec!["zb0", "ble0"]);
    }
}
