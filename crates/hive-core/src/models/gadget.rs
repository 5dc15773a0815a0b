//! Gadget model - one logical capability of a device

use serde::{Deserialize, Serialize};

use crate::netcore::{Netcore, NetcoreResult};

/// Back-reference from a gadget to its owning device.
///
/// A lookup key, not an ownership pointer: the device is resolved on demand
/// through the device box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevRef {
    /// Registry identity of the owning device
    pub id: u32,
    /// Permanent address of the owning device
    #[serde(rename = "permAddr")]
    pub perm_addr: String,
}

/// One logical capability (sensor channel, switch, lamp...) of a device.
///
/// `(netcore, owning device's permanent address, aux_id)` uniquely identifies
/// a gadget across the whole registry. The serde form is the persisted
/// snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    /// Registry identity, assigned by the gadget box on first registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Name of the netcore the owning device lives on
    pub netcore: String,
    /// Auxiliary identifier, unique within the owning device
    #[serde(rename = "auxId")]
    pub aux_id: String,
    /// Owning device, by key
    pub dev: DevRef,
    /// Opaque driver-specific payload
    #[serde(default)]
    pub attrs: serde_json::Value,
    /// Reconstructed from storage but not yet confirmed live
    #[serde(skip)]
    pub recovering: bool,
}

impl Gadget {
    /// Create a gadget under an already-registered device.
    pub fn new(netcore: impl Into<String>, aux_id: impl Into<String>, dev: DevRef) -> Self {
        Self {
            id: None,
            netcore: netcore.into(),
            aux_id: aux_id.into(),
            dev,
            attrs: serde_json::Value::Null,
            recovering: false,
        }
    }

    /// Confirm liveness via the owning device's address. Used while
    /// finalizing a recovering registration.
    pub async fn poke(&self, nc: &dyn Netcore) -> NetcoreResult<()> {
        nc.ping(&self.dev.perm_addr).await
    }
}
