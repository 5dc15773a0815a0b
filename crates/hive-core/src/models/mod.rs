//! Entity models for the gateway registries

mod device;
mod gadget;

pub use device::{Address, Device, DeviceStatus, NetInfo};
pub use gadget::{DevRef, Gadget};
