//! Device model - one physical endpoint reachable through a netcore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::netcore::{Netcore, NetcoreResult};

/// Network liveness of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Never confirmed against the live backend
    #[default]
    Unknown,
    /// Last contact succeeded
    Online,
    /// Last contact failed
    Offline,
}

/// Network address block of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Permanent (hardware) address, unique per netcore
    pub permanent: String,
}

/// Network-facing state of a device, refreshed by pokes and pings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetInfo {
    pub address: Address,
    #[serde(default)]
    pub status: DeviceStatus,
    /// When the device first joined through its netcore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    /// Last successful contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// One physical endpoint reachable through exactly one netcore.
///
/// The owning netcore is referenced by name only (resolved on demand through
/// the pool), never by pointer. Owned gadgets are referenced by their numeric
/// ids in registration order. The serde form of this struct is also its
/// persisted snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Registry identity, assigned by the device box on first registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Name of the owning netcore
    pub netcore: String,
    /// Owned gadget ids, in registration order
    #[serde(default)]
    pub gads: Vec<u32>,
    pub net: NetInfo,
    /// Opaque driver-specific payload; the gateway never interprets it
    #[serde(default)]
    pub attrs: serde_json::Value,
    /// Reconstructed from storage but not yet confirmed live
    #[serde(skip)]
    pub recovering: bool,
}

impl Device {
    /// Create a device as reported by its netcore, not yet registered.
    pub fn new(netcore: impl Into<String>, perm_addr: impl Into<String>) -> Self {
        Self {
            id: None,
            netcore: netcore.into(),
            gads: Vec::new(),
            net: NetInfo {
                address: Address {
                    permanent: perm_addr.into(),
                },
                status: DeviceStatus::Unknown,
                joined_at: Some(Utc::now()),
                last_seen: None,
            },
            attrs: serde_json::Value::Null,
            recovering: false,
        }
    }

    /// Permanent address on the owning netcore.
    pub fn perm_addr(&self) -> &str {
        &self.net.address.permanent
    }

    /// Refresh liveness against the live backend. Used while finalizing a
    /// recovering registration; failure leaves the device marked offline.
    pub async fn poke(&mut self, nc: &dyn Netcore) -> NetcoreResult<()> {
        match nc.ping(self.perm_addr()).await {
            Ok(()) => {
                self.net.status = DeviceStatus::Online;
                self.net.last_seen = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                self.net.status = DeviceStatus::Offline;
                Err(e)
            }
        }
    }

    /// Reachability check, routed through the device rather than handed to
    /// the netcore by callers.
    pub async fn ping(&self, nc: &dyn Netcore) -> NetcoreResult<()> {
        nc.ping(self.perm_addr()).await
    }
}
