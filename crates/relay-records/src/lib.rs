// SPDX-License-Identifier: Apache-2.0
//! Normalized in-memory record store for GraphQL client runtimes.
//!
//! `relay-records` holds denormalized server responses as flat records keyed
//! by a global [`DataId`]. The [`RecordSource`] / [`MutableRecordSource`]
//! traits describe the store; [`MemoryRecordSource`] is the in-memory
//! implementation. Normalizers, readers and garbage collectors sit on top of
//! these traits and are not part of this crate.
//!
//! # Existence Model
//!
//! Every id is in exactly one [`RecordState`]:
//!
//! - `Unknown`: never observed, so a fetch may still be needed.
//! - `Nonexistent`: tombstoned by [`delete`](MutableRecordSource::delete).
//! - `Existent`: a [`Record`] is stored.
//!
//! # Snapshots
//!
//! [`RecordSource::to_json`] and [`MemoryRecordSource::from_json`] convert to
//! and from the persisted layout: an object mapping each tracked id to `null`
//! or a record object. `from_json(s.to_json()).to_json() == s.to_json()`.
//!
//! # Threading
//!
//! Sources are single-writer by construction (`&mut self` for every
//! mutation) and do no locking. Embeddings with real parallelism wrap the
//! source at their boundary, e.g. in a `Mutex`.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod error;
mod ident;
mod memory;
mod record;
mod state;
mod value;

pub use error::{RecordError, SnapshotError};
pub use ident::{
    format_storage_key, generate_client_id, generate_unique_client_id, is_client_id, DataId,
    CLIENT_ID_PREFIX, ID_KEY, INVALIDATED_AT_KEY, REFS_KEY, REF_KEY, ROOT_ID, ROOT_TYPE,
    TYPENAME_KEY,
};
pub use memory::{MemoryRecordSource, SnapshotDigest};
pub use record::Record;
pub use state::{RecordLookup, RecordState};
pub use value::{FieldValue, Scalar};

use serde_json::Value;

/// Read side of a record store.
///
/// Every method is a pure read and never fails: an id the source knows
/// nothing about is reported as [`RecordState::Unknown`], not as an error.
pub trait RecordSource {
    /// Look up `id`.
    fn get(&self, id: &str) -> RecordLookup<'_>;

    /// Existence state of `id`.
    fn status(&self, id: &str) -> RecordState {
        self.get(id).state()
    }

    /// `true` if `id` is tracked (tombstoned or stored).
    fn has(&self, id: &str) -> bool {
        !self.get(id).is_unknown()
    }

    /// All tracked ids.
    ///
    /// Order is implementation-defined; callers that need a stable order
    /// must sort.
    fn record_ids(&self) -> Vec<DataId>;

    /// Number of tracked ids. Always equals `record_ids().len()`.
    fn len(&self) -> usize;

    /// `true` if no id is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every tracked id: `null` for tombstones, the record
    /// object otherwise.
    fn to_json(&self) -> Value;
}

/// Write side of a record store.
///
/// Mutations never fail. The store does not check that a record's own id
/// matches the id it is stored under, nor that types stay consistent across
/// writes; layers above own those checks.
pub trait MutableRecordSource: RecordSource {
    /// Store `record` under `id`, replacing whatever was there.
    fn set(&mut self, id: DataId, record: Record);

    /// Tombstone `id`, discarding any stored record.
    fn delete(&mut self, id: DataId);

    /// Forget `id` entirely; it becomes `Unknown`.
    fn remove(&mut self, id: &str);

    /// Forget every id.
    fn clear(&mut self);
}
