//! Startup recovery - reconcile persisted entities against live netcores
//!
//! Runs once per netcore, inside that netcore's start task: persisted
//! device and gadget records scoped to the netcore are re-attached as
//! recovering placeholders, confirmed against the now-started driver, and
//! registered. One entity's failure never blocks its siblings, and recovery
//! failures never fail the start sequence.

use std::fmt;

use hive_core::{HiveError, Netcore, StoreFilter};
use tracing::{info, warn};

use crate::hive::Hive;

/// One entity that could not be brought back.
#[derive(Debug)]
pub struct RecoveryFailure {
    /// `"device"` or `"gadget"`
    pub kind: &'static str,
    /// Persisted identity, when the record carried one
    pub id: Option<u32>,
    pub error: HiveError,
}

/// What recovery did for one netcore.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub devices_recovered: usize,
    pub gadgets_recovered: usize,
    pub failures: Vec<RecoveryFailure>,
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} device(s), {} gadget(s) recovered, {} failure(s)",
            self.devices_recovered,
            self.gadgets_recovered,
            self.failures.len()
        )
    }
}

/// Recover every persisted entity of `nc`. Called after `nc.start()`
/// succeeded and before the netcore's contribution to the aggregate start
/// completes.
pub(crate) async fn recover_netcore(hive: &Hive, nc: &dyn Netcore) -> RecoveryReport {
    let mut report = RecoveryReport::default();
    let scope = StoreFilter::new().field("netcore", nc.name());

    // Devices first; gadgets link into them.
    let devices = match hive.devbox.read().await.load_from_store(&scope).await {
        Ok(devices) => devices,
        Err(error) => {
            warn!(netcore = %nc.name(), %error, "device store unreadable, skipping recovery");
            report.failures.push(RecoveryFailure {
                kind: "device",
                id: None,
                error,
            });
            return report;
        }
    };

    for mut dev in devices {
        let id = dev.id;
        if let Err(e) = dev.poke(nc).await {
            report.failures.push(RecoveryFailure {
                kind: "device",
                id,
                error: HiveError::Backend {
                    netcore: nc.name().to_string(),
                    source: e,
                },
            });
            continue;
        }
        dev.recovering = false;

        match hive.devbox.write().await.register(dev).await {
            Ok(_) => report.devices_recovered += 1,
            Err(error) => report.failures.push(RecoveryFailure {
                kind: "device",
                id,
                error,
            }),
        }
    }

    let gadgets = match hive.gadbox.read().await.load_from_store(&scope).await {
        Ok(gadgets) => gadgets,
        Err(error) => {
            warn!(netcore = %nc.name(), %error, "gadget store unreadable, skipping gadget recovery");
            report.failures.push(RecoveryFailure {
                kind: "gadget",
                id: None,
                error,
            });
            return report;
        }
    };

    for mut gad in gadgets {
        let id = gad.id;
        let owner = hive
            .devbox
            .read()
            .await
            .find(|d| d.netcore == gad.netcore && d.perm_addr() == gad.dev.perm_addr);
        let Some(owner) = owner else {
            report.failures.push(RecoveryFailure {
                kind: "gadget",
                id,
                error: HiveError::NotFound(format!(
                    "owning device {} on '{}' not recovered",
                    gad.dev.perm_addr, gad.netcore
                )),
            });
            continue;
        };

        if let Err(e) = gad.poke(nc).await {
            report.failures.push(RecoveryFailure {
                kind: "gadget",
                id,
                error: HiveError::Backend {
                    netcore: nc.name().to_string(),
                    source: e,
                },
            });
            continue;
        }
        gad.recovering = false;

        let gid = match hive.gadbox.write().await.register(gad).await {
            Ok(gid) => gid,
            Err(error) => {
                report.failures.push(RecoveryFailure {
                    kind: "gadget",
                    id,
                    error,
                });
                continue;
            }
        };

        // Re-link into the parent's gadget list; persisted records usually
        // carry the id already.
        if let Some(owner_id) = owner.id {
            hive.devbox.write().await.modify(owner_id, |d| {
                if !d.gads.contains(&gid) {
                    d.gads.push(gid);
                }
            });
        }
        report.gadgets_recovered += 1;
    }

    info!(netcore = %nc.name(), report = %report, "recovery finished");
    report
}
