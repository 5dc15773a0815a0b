//! Netcore trait - the capability contract every protocol driver implements
//!
//! A netcore is one hardware/protocol backend (a radio dongle, a fieldbus
//! bridge, a simulated driver) managing a set of physical devices. The
//! gateway drives netcores exclusively through this trait and never reaches
//! into driver internals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for netcore driver operations
pub type NetcoreResult<T> = Result<T, NetcoreError>;

/// Errors reported by netcore drivers
#[derive(Debug, Error)]
pub enum NetcoreError {
    /// Driver is not started or has gone away
    #[error("netcore unavailable: {0}")]
    Unavailable(String),

    /// Device did not answer within the driver's own deadline
    #[error("address unreachable: {0}")]
    Unreachable(String),

    /// Driver-level timeout
    #[error("netcore operation timed out")]
    Timeout,

    /// Malformed frame, bad state machine transition, etc.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Anything else the driver wants to surface
    #[error("driver error: {0}")]
    Driver(String),
}

/// Reset depth for [`Netcore::reset`]
///
/// `Soft` restarts the driver state machine; `Hard` also clears the
/// driver's own device tables (modes 0 and 1 in the wire protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    Soft,
    Hard,
}

/// The fixed lifecycle capability set of a netcore driver.
///
/// Every method crossing into the driver is asynchronous and completes
/// exactly once with `Ok(())` or an error. The gateway does not assume any
/// of these are idempotent and never retries on the driver's behalf; it
/// also imposes no timeout of its own - a driver that never completes
/// stalls the operation that reached it.
#[async_trait]
pub trait Netcore: Send + Sync {
    /// Unique driver name, stable for the process lifetime.
    fn name(&self) -> &str;

    /// Bring the driver up.
    async fn start(&self) -> NetcoreResult<()>;

    /// Take the driver down.
    async fn stop(&self) -> NetcoreResult<()>;

    /// Reset the driver.
    async fn reset(&self, mode: ResetMode) -> NetcoreResult<()>;

    /// Open the network for joining devices for `duration` seconds
    /// (0 closes it again).
    async fn permit_join(&self, duration: u32) -> NetcoreResult<()>;

    /// Tell the driver to remove the device at `perm_addr` from its network.
    async fn remove(&self, perm_addr: &str) -> NetcoreResult<()>;

    /// Ban `perm_addr` from the network.
    async fn ban(&self, perm_addr: &str) -> NetcoreResult<()>;

    /// Lift a ban on `perm_addr`.
    async fn unban(&self, perm_addr: &str) -> NetcoreResult<()>;

    /// Reachability check for the device at `perm_addr`. Callers outside
    /// the gateway go through [`Device::ping`](crate::Device::ping) rather
    /// than calling this directly.
    async fn ping(&self, perm_addr: &str) -> NetcoreResult<()>;

    /// Ask the driver to refresh its own housekeeping state.
    async fn maintain(&self) -> NetcoreResult<()>;
}
