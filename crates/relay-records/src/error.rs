// SPDX-License-Identifier: Apache-2.0
//! Error types for record access and snapshot hydration.
//!
//! The store operations themselves are infallible; these errors only arise
//! from typed field access and strict snapshot parsing.

use thiserror::Error;

use crate::ident::DataId;

/// Errors raised by typed [`Record`](crate::Record) access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A value was requested but the field holds a link.
    #[error("expected a scalar value for `{key}`, got a linked record")]
    UnexpectedLink {
        /// Storage key that was read.
        key: String,
    },
    /// A singular link was requested but the field holds something else.
    #[error("expected `{key}` to be a linked record id")]
    NotALink {
        /// Storage key that was read.
        key: String,
    },
    /// A plural link was requested but the field holds something else.
    #[error("expected `{key}` to be a list of linked record ids")]
    NotAPluralLink {
        /// Storage key that was read.
        key: String,
    },
    /// Two records with different ids were merged.
    #[error(
        "cannot merge record `{}` into record `{}`",
        .found.as_ref().map_or("<no id>", DataId::as_str),
        .expected.as_ref().map_or("<no id>", DataId::as_str)
    )]
    DataIdMismatch {
        /// Id of the record being updated.
        expected: Option<DataId>,
        /// Id of the incoming record.
        found: Option<DataId>,
    },
    /// A snapshot entry was neither an object nor `null`.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Errors raised by strict snapshot hydration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot root is not a JSON object.
    #[error("snapshot must be a JSON object keyed by data id")]
    NotAnObject,
    /// One entry is neither `null` nor an object.
    #[error("malformed snapshot entry `{id}`: {source}")]
    MalformedEntry {
        /// Key of the offending entry.
        id: DataId,
        /// Why the entry was rejected.
        source: RecordError,
    },
}
