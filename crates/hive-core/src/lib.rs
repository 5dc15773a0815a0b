//! hive-core - Core traits and types for the hive IoT gateway
//!
//! This crate provides the fundamental abstractions the gateway is built on:
//! the [`Netcore`] capability contract every protocol driver implements, the
//! [`Device`] and [`Gadget`] entity models, the persisted-store contract used
//! for startup recovery, and the indication envelope delivered to external
//! consumers.

pub mod error;
pub mod indication;
pub mod models;
pub mod netcore;
pub mod store;

pub use error::{AggregateError, HiveError, HiveResult, NetcoreFault};
pub use indication::{ApiAgent, Indication, LogAgent, NullAgent, Subsystem};
pub use models::{DevRef, Device, DeviceStatus, Gadget, NetInfo};
pub use netcore::{Netcore, NetcoreError, NetcoreResult, ResetMode};
pub use store::{DocStore, Document, MemStore, StoreError, StoreFilter, StoreResult};
