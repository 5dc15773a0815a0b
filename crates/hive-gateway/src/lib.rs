//! hive-gateway - Orchestration core of the hive IoT gateway
//!
//! The [`Hive`] coordinator owns a pool of netcore drivers and the device
//! and gadget registries above them. It fans lifecycle commands out across
//! the pool, reconciles freshly booted registries against previously
//! persisted state, and propagates every state change through a uniform
//! indication envelope.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                           Hive                             │
//! │                                                            │
//! │   device box      gadget box      event bus ──► api agent  │
//! │       ▲               ▲                                    │
//! │       └── recovery ───┘                                    │
//! │               │                                            │
//! │        netcore pool (lifecycle fan-out)                    │
//! │       ┌───────┼───────────────┐                            │
//! │       ▼       ▼               ▼                            │
//! │   Netcore  Netcore  ...   Netcore   (protocol drivers)     │
//! └────────────────────────────────────────────────────────────┘
//! ```

mod bus;
mod fanout;
mod hive;
mod recover;

pub use bus::EventBus;
pub use hive::Hive;
pub use recover::{RecoveryFailure, RecoveryReport};

/// Local event names fired on the gateway's event bus.
pub mod events {
    /// All netcores started and recovery finished
    pub const STARTED: &str = "started";
    /// All netcores stopped
    pub const STOPPED: &str = "stopped";
    /// A device entered the registry
    pub const DEV_INCOMING: &str = "devIncoming";
    /// A device left the registry
    pub const DEV_LEAVING: &str = "devLeaving";
    /// A gadget entered the registry
    pub const GAD_INCOMING: &str = "gadIncoming";
    /// A gadget left the registry
    pub const GAD_LEAVING: &str = "gadLeaving";
    /// A netcore opened its network for joining
    pub const PERMIT_JOINING: &str = "permitJoining";
}
