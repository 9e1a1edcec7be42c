// SPDX-License-Identifier: Apache-2.0
//! Snapshot persistence for `relay-records`.
//! Keeps storage adapters thin: they move bytes, the service owns the format.

pub mod config;
pub mod service;
pub mod store;

pub use config::PersistConfig;
pub use service::SnapshotService;
pub use store::{validate_key, MemorySnapshotStore, PersistError, SnapshotStore};
