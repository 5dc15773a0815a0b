//! Indication envelope and the delivery-agent contract
//!
//! State changes become visible outside the process through exactly one
//! channel: a normalized indication envelope handed to the external delivery
//! agent. Delivery is fire-and-forget; the gateway neither waits for an
//! acknowledgement nor retries.

use serde::{Deserialize, Serialize};

/// Which part of the gateway an indication is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    /// Network/netcore level
    Net,
    /// Device registry
    Dev,
    /// Gadget registry
    Gad,
}

/// The normalized notification envelope broadcast to external consumers.
///
/// Transiently constructed and forwarded, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indication {
    /// Always `"IND"`
    pub interface: String,
    pub subsystem: Subsystem,
    /// Indication type, e.g. `"devIncoming"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Identity of the entity concerned (number for devices/gadgets,
    /// netcore name for network-level indications)
    pub id: serde_json::Value,
    pub data: serde_json::Value,
}

impl Indication {
    pub fn new(
        subsystem: Subsystem,
        kind: impl Into<String>,
        id: impl Into<serde_json::Value>,
        data: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            interface: "IND".to_string(),
            subsystem,
            kind: kind.into(),
            id: id.into(),
            data: data.into(),
        }
    }
}

/// External transport that delivers indications to remote clients.
pub trait ApiAgent: Send + Sync {
    /// Forward one envelope. Fire-and-forget: no result, no retry.
    fn indicate(&self, ind: Indication);
}

/// Agent that drops every indication. Used when no remote consumer exists.
#[derive(Debug, Default)]
pub struct NullAgent;

impl ApiAgent for NullAgent {
    fn indicate(&self, _ind: Indication) {}
}

/// Agent that logs every indication through `tracing`.
#[derive(Debug, Default)]
pub struct LogAgent;

impl ApiAgent for LogAgent {
    fn indicate(&self, ind: Indication) {
        tracing::info!(
            subsystem = ?ind.subsystem,
            kind = %ind.kind,
            id = %ind.id,
            "indication"
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_serializes_with_wire_field_names() {
        let ind = Indication::new(Subsystem::Dev, "test", 1, "test");

        assert_eq!(
            serde_json::to_value(&ind).unwrap(),
            json!({
                "interface": "IND",
                "subsystem": "dev",
                "type": "test",
                "id": 1,
                "data": "test"
            })
        );
    }
}
