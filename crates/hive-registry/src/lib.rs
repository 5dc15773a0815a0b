//! hive-registry - Entity registries and the netcore pool
//!
//! This crate holds the gateway's in-memory state: one [`EntityBox`] per
//! entity kind (devices, gadgets) bound to its persisted store, and the
//! [`NetcorePool`] of protocol drivers the lifecycle coordinator fans out
//! over.

mod entity;
mod entity_box;
mod pool;

pub use entity::Entity;
pub use entity_box::EntityBox;
pub use pool::NetcorePool;
