//! Entity trait - what a box needs from the things it stores

use std::fmt;
use std::hash::Hash;

use hive_core::{DevRef, Device, Gadget, HiveError, HiveResult};

/// Contract between an [`EntityBox`](crate::EntityBox) and its entities.
///
/// The box owns identity assignment and uniqueness; entities expose their
/// identity slot, their network uniqueness key, their recovery flag, and
/// their serde snapshot record.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Network uniqueness key: at most one live entry per key.
    type Key: Eq + Hash + Clone + fmt::Debug + Send;

    /// Entity kind for logging and error messages.
    fn kind() -> &'static str;

    fn id(&self) -> Option<u32>;

    fn set_id(&mut self, id: u32);

    fn key(&self) -> Self::Key;

    fn recovering(&self) -> bool;

    fn set_recovering(&mut self, recovering: bool);

    /// Snapshot record persisted to the store.
    fn dump(&self) -> serde_json::Value;

    /// Rebuild an entity from a persisted snapshot record.
    fn from_record(body: &serde_json::Value) -> HiveResult<Self>;
}

impl Entity for Device {
    /// (netcore name, permanent address)
    type Key = (String, String);

    fn kind() -> &'static str {
        "device"
    }

    fn id(&self) -> Option<u32> {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = Some(id);
    }

    fn key(&self) -> Self::Key {
        (self.netcore.clone(), self.perm_addr().to_string())
    }

    fn recovering(&self) -> bool {
        self.recovering
    }

    fn set_recovering(&mut self, recovering: bool) {
        self.recovering = recovering;
    }

    fn dump(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn from_record(body: &serde_json::Value) -> HiveResult<Self> {
        serde_json::from_value(body.clone())
            .map_err(|e| HiveError::BadRecord(format!("device record: {e}")))
    }
}

impl Entity for Gadget {
    /// (netcore name, owning device's permanent address, aux id)
    type Key = (String, String, String);

    fn kind() -> &'static str {
        "gadget"
    }

    fn id(&self) -> Option<u32> {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = Some(id);
    }

    fn key(&self) -> Self::Key {
        (
            self.netcore.clone(),
            self.dev.perm_addr.clone(),
            self.aux_id.clone(),
        )
    }

    fn recovering(&self) -> bool {
        self.recovering
    }

    fn set_recovering(&mut self, recovering: bool) {
        self.recovering = recovering;
    }

    fn dump(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn from_record(body: &serde_json::Value) -> HiveResult<Self> {
        serde_json::from_value(body.clone())
            .map_err(|e| HiveError::BadRecord(format!("gadget record: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_key_is_netcore_and_address() {
        let dev = Device::new("zb0", "00:01");
        assert_eq!(dev.key(), ("zb0".to_string(), "00:01".to_string()));
    }

    #[test]
    fn gadget_key_includes_owner_address_and_aux_id() {
        let gad = Gadget::new(
            "zb0",
            "aa/bb",
            DevRef {
                id: 1,
                perm_addr: "00:01".to_string(),
            },
        );
        assert_eq!(
            gad.key(),
            ("zb0".to_string(), "00:01".to_string(), "aa/bb".to_string())
        );
    }

    #[test]
    fn bad_record_is_reported_not_panicked() {
        let err = Device::from_record(&serde_json::json!({ "nonsense": true })).unwrap_err();
        assert!(matches!(err, HiveError::BadRecord(_)));
    }
}
