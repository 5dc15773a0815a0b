//! Hive - the gateway coordinator
//!
//! Owns the netcore pool, the device and gadget boxes, the event bus, and
//! the delivery agent. Every public operation is async and resolves targets
//! before touching any backend; absence from a lookup is `None`, never an
//! error.

use std::sync::Arc;

use hive_core::{
    ApiAgent, Device, DocStore, Gadget, HiveError, HiveResult, Indication, Netcore, NetcoreError,
    ResetMode, Subsystem,
};
use hive_registry::{EntityBox, NetcorePool};
use serde_json::json;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::events;
use crate::fanout::fan_out;
use crate::recover::recover_netcore;

/// Orchestration core of the gateway.
///
/// Constructed once at process start; netcores are owned by the pool for
/// the process lifetime. Registry mutation is serialized through the box
/// locks, and there is no cancellation: a dispatched lifecycle or recovery
/// operation runs to completion or failure.
pub struct Hive {
    pub(crate) pool: NetcorePool,
    pub(crate) devbox: RwLock<EntityBox<Device>>,
    pub(crate) gadbox: RwLock<EntityBox<Gadget>>,
    bus: EventBus,
    agent: Arc<dyn ApiAgent>,
}

impl Hive {
    /// Build a hive over `netcores`, binding the device and gadget boxes to
    /// their stores. Fails with [`HiveError::Conflict`] on a duplicate
    /// netcore name.
    pub fn new(
        netcores: Vec<Arc<dyn Netcore>>,
        dev_store: Arc<dyn DocStore>,
        gad_store: Arc<dyn DocStore>,
        agent: Arc<dyn ApiAgent>,
    ) -> HiveResult<Self> {
        let mut pool = NetcorePool::new();
        for nc in netcores {
            pool.insert(nc)?;
        }
        Ok(Self {
            pool,
            devbox: RwLock::new(EntityBox::new(dev_store)),
            gadbox: RwLock::new(EntityBox::new(gad_store)),
            bus: EventBus::new(),
            agent,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Netcore by name.
    pub fn netcore(&self, name: &str) -> Option<Arc<dyn Netcore>> {
        self.pool.get(name)
    }

    /// All netcores, in registration order.
    pub fn netcores(&self) -> Vec<Arc<dyn Netcore>> {
        self.pool.all()
    }

    /// Device by registry identity.
    pub async fn device(&self, id: u32) -> Option<Device> {
        self.devbox.read().await.get(id)
    }

    /// Gadget by registry identity.
    pub async fn gadget(&self, id: u32) -> Option<Gadget> {
        self.gadbox.read().await.get(id)
    }

    /// The unique device with this (netcore, permanent address) pair.
    pub async fn device_by_net(&self, nc_name: &str, perm_addr: &str) -> Option<Device> {
        self.devbox
            .read()
            .await
            .find(|d| d.netcore == nc_name && d.perm_addr() == perm_addr)
    }

    /// The unique gadget with this (netcore, device address, aux id) triple.
    pub async fn gadget_by_net(
        &self,
        nc_name: &str,
        perm_addr: &str,
        aux_id: &str,
    ) -> Option<Gadget> {
        self.gadbox.read().await.find(|g| {
            g.netcore == nc_name && g.dev.perm_addr == perm_addr && g.aux_id == aux_id
        })
    }

    /// All devices matching `pred`, in registration order.
    pub async fn devices(&self, pred: impl Fn(&Device) -> bool) -> Vec<Device> {
        self.devbox.read().await.filter(pred)
    }

    /// All gadgets matching `pred`, in registration order.
    pub async fn gadgets(&self, pred: impl Fn(&Gadget) -> bool) -> Vec<Gadget> {
        self.gadbox.read().await.filter(pred)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a device.
    ///
    /// A recovering device is first confirmed against its live netcore
    /// ("poked") and the flag cleared before it is finalized. Duplicate
    /// identities or (netcore, address) pairs are rejected untouched.
    pub async fn register_device(&self, mut dev: Device) -> HiveResult<u32> {
        if dev.recovering {
            let nc = self
                .netcore(&dev.netcore)
                .ok_or_else(|| HiveError::NotFound(format!("netcore '{}'", dev.netcore)))?;
            dev.poke(nc.as_ref())
                .await
                .map_err(|e| self.backend_err(&dev.netcore, e))?;
            dev.recovering = false;
        }

        let id = self.devbox.write().await.register(dev).await?;
        let dump = self
            .devbox
            .read()
            .await
            .get(id)
            .map(|d| serde_json::to_value(&d).unwrap_or_default())
            .unwrap_or_default();

        self.bus.fire(events::DEV_INCOMING, dump.clone());
        self.tweet(Subsystem::Dev, events::DEV_INCOMING, id, dump);
        Ok(id)
    }

    /// Remove a device from the registry. Idempotent; reports the requested
    /// id either way. Owned gadgets are left in place and must be
    /// unregistered independently.
    pub async fn unregister_device(&self, id: u32) -> u32 {
        let existed = {
            let mut devs = self.devbox.write().await;
            let existed = devs.get(id).is_some();
            devs.unregister(id).await;
            existed
        };

        if existed {
            self.bus.fire(events::DEV_LEAVING, json!({ "id": id }));
            self.tweet(Subsystem::Dev, events::DEV_LEAVING, id, json!(null));
        }
        id
    }

    /// Register a gadget under its owning device.
    ///
    /// The owning device must already be registered; the gadget's identity
    /// is appended to the device's gadget list. A duplicate aux id under the
    /// same device is rejected and leaves both registries unchanged.
    pub async fn register_gadget(&self, mut gad: Gadget) -> HiveResult<u32> {
        let owner = self
            .device_by_net(&gad.netcore, &gad.dev.perm_addr)
            .await
            .ok_or_else(|| {
                HiveError::NotFound(format!(
                    "device {} on netcore '{}'",
                    gad.dev.perm_addr, gad.netcore
                ))
            })?;
        let owner_id = owner
            .id
            .ok_or_else(|| HiveError::NotFound("owning device has no identity".to_string()))?;
        gad.dev.id = owner_id;

        if gad.recovering {
            let nc = self
                .netcore(&gad.netcore)
                .ok_or_else(|| HiveError::NotFound(format!("netcore '{}'", gad.netcore)))?;
            gad.poke(nc.as_ref())
                .await
                .map_err(|e| self.backend_err(&gad.netcore, e))?;
            gad.recovering = false;
        }

        let id = self.gadbox.write().await.register(gad).await?;
        self.devbox.write().await.modify(owner_id, |d| {
            if !d.gads.contains(&id) {
                d.gads.push(id);
            }
        });

        let dump = self
            .gadbox
            .read()
            .await
            .get(id)
            .map(|g| serde_json::to_value(&g).unwrap_or_default())
            .unwrap_or_default();
        self.bus.fire(events::GAD_INCOMING, dump.clone());
        self.tweet(Subsystem::Gad, events::GAD_INCOMING, id, dump);
        Ok(id)
    }

    /// Remove a gadget from the registry and unlink it from its owning
    /// device. Idempotent.
    pub async fn unregister_gadget(&self, id: u32) -> u32 {
        let removed = {
            let mut gads = self.gadbox.write().await;
            let gad = gads.get(id);
            gads.unregister(id).await;
            gad
        };

        if let Some(gad) = removed {
            self.devbox
                .write()
                .await
                .modify(gad.dev.id, |d| d.gads.retain(|g| *g != id));
            self.bus.fire(events::GAD_LEAVING, json!({ "id": id }));
            self.tweet(Subsystem::Gad, events::GAD_LEAVING, id, json!(null));
        }
        id
    }

    // =========================================================================
    // Lifecycle fan-out
    // =========================================================================

    /// Start every netcore and recover its persisted entities.
    ///
    /// Each netcore's recovery runs inside its own start task, so the
    /// aggregate completes only after every driver has started *and* its
    /// entities were reconciled. Recovery failures are reported per entity
    /// and never fail the start.
    pub async fn start(&self) -> HiveResult<()> {
        info!(netcores = self.pool.len(), "starting");
        let report = fan_out(&self.pool, "start", |nc| self.start_one(nc)).await;
        let result = report.into_result("start");
        if result.is_ok() {
            self.bus.fire(events::STARTED, json!(null));
        }
        result
    }

    async fn start_one(&self, nc: Arc<dyn Netcore>) -> Result<(), NetcoreError> {
        nc.start().await?;
        let report = recover_netcore(self, nc.as_ref()).await;
        for failure in &report.failures {
            debug!(
                netcore = %nc.name(),
                kind = failure.kind,
                id = ?failure.id,
                error = %failure.error,
                "entity not recovered"
            );
        }
        Ok(())
    }

    /// Stop every netcore.
    pub async fn stop(&self) -> HiveResult<()> {
        let report = fan_out(&self.pool, "stop", |nc| async move { nc.stop().await }).await;
        let result = report.into_result("stop");
        if result.is_ok() {
            self.bus.fire(events::STOPPED, json!(null));
        }
        result
    }

    /// Reset every netcore.
    pub async fn reset(&self, mode: ResetMode) -> HiveResult<()> {
        fan_out(&self.pool, "reset", |nc| async move {
            nc.reset(mode).await
        })
        .await
        .into_result("reset")
    }

    /// Open every netcore's network for joining for `duration` seconds
    /// (0 closes them). Each netcore that complied is announced.
    pub async fn permit_join(&self, duration: u32) -> HiveResult<()> {
        let report = fan_out(&self.pool, "permitJoin", |nc| async move {
            nc.permit_join(duration).await
        })
        .await;

        for name in &report.succeeded {
            let data = json!({ "netcore": name, "duration": duration });
            self.bus.fire(events::PERMIT_JOINING, data.clone());
            self.tweet(
                Subsystem::Net,
                events::PERMIT_JOINING,
                name.as_str(),
                data,
            );
        }
        report.into_result("permitJoin")
    }

    /// Ask every netcore to refresh its housekeeping state.
    pub async fn maintain(&self) -> HiveResult<()> {
        fan_out(&self.pool, "maintain", |nc| async move {
            nc.maintain().await
        })
        .await
        .into_result("maintain")
    }

    // =========================================================================
    // Targeted operations
    // =========================================================================

    /// Tell `nc_name` to remove the device at `perm_addr` from its network.
    pub async fn remove(&self, nc_name: &str, perm_addr: &str) -> HiveResult<()> {
        let nc = self.resolve(nc_name)?;
        nc.remove(perm_addr)
            .await
            .map_err(|e| self.backend_err(nc_name, e))
    }

    /// Ban `perm_addr` on `nc_name`.
    pub async fn ban(&self, nc_name: &str, perm_addr: &str) -> HiveResult<()> {
        let nc = self.resolve(nc_name)?;
        nc.ban(perm_addr)
            .await
            .map_err(|e| self.backend_err(nc_name, e))
    }

    /// Lift a ban on `perm_addr` on `nc_name`.
    pub async fn unban(&self, nc_name: &str, perm_addr: &str) -> HiveResult<()> {
        let nc = self.resolve(nc_name)?;
        nc.unban(perm_addr)
            .await
            .map_err(|e| self.backend_err(nc_name, e))
    }

    /// Ping the registered device at (`nc_name`, `perm_addr`). Resolves to
    /// the device and pings through it; an unregistered address is
    /// `NotFound` before any backend is touched.
    pub async fn ping(&self, nc_name: &str, perm_addr: &str) -> HiveResult<()> {
        let nc = self.resolve(nc_name)?;
        let dev = self
            .device_by_net(nc_name, perm_addr)
            .await
            .ok_or_else(|| {
                HiveError::NotFound(format!("device {perm_addr} on netcore '{nc_name}'"))
            })?;
        dev.ping(nc.as_ref())
            .await
            .map_err(|e| self.backend_err(nc_name, e))
    }

    // =========================================================================
    // Event bus
    // =========================================================================

    /// Subscribe to a local event; see [`events`](crate::events).
    pub fn subscribe(&self, event: &str) -> broadcast::Receiver<serde_json::Value> {
        self.bus.subscribe(event)
    }

    /// Emit a local event. Drivers use this to surface their own
    /// notifications through the gateway's bus.
    pub fn fire(&self, event: &str, payload: serde_json::Value) {
        self.bus.fire(event, payload);
    }

    /// Build an indication envelope and forward it to the delivery agent.
    /// Fire-and-forget; the sole channel by which state changes leave the
    /// process.
    pub fn tweet(
        &self,
        subsystem: Subsystem,
        kind: &str,
        id: impl Into<serde_json::Value>,
        data: impl Into<serde_json::Value>,
    ) {
        self.agent.indicate(Indication::new(subsystem, kind, id, data));
    }

    fn resolve(&self, nc_name: &str) -> HiveResult<Arc<dyn Netcore>> {
        self.netcore(nc_name)
            .ok_or_else(|| HiveError::NotFound(format!("netcore '{nc_name}'")))
    }

    fn backend_err(&self, nc_name: &str, source: NetcoreError) -> HiveError {
        HiveError::Backend {
            netcore: nc_name.to_string(),
            source,
        }
    }
}
