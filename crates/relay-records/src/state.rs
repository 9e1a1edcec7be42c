// SPDX-License-Identifier: Apache-2.0
//! Per-id existence states.

use std::fmt;

use crate::record::Record;

/// What a source knows about a [`DataId`](crate::DataId).
///
/// The three states are mutually exclusive and exhaustive. `Unknown` means
/// the id was never observed (a fetch may still be needed); `Nonexistent`
/// means it was observed and confirmed absent.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RecordState {
    /// Never observed.
    Unknown,
    /// Tombstoned: known not to exist.
    Nonexistent,
    /// A record is stored for the id.
    Existent,
}

impl RecordState {
    /// Upper-case name used in logs and tooling output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Nonexistent => "NONEXISTENT",
            Self::Existent => "EXISTENT",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reading one id from a source.
///
/// Mirrors [`RecordState`] but carries the record when one exists.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RecordLookup<'a> {
    /// Never observed.
    Unknown,
    /// Tombstoned.
    Nonexistent,
    /// Stored record.
    Existent(&'a Record),
}

impl<'a> RecordLookup<'a> {
    /// The existence state this lookup corresponds to.
    pub fn state(self) -> RecordState {
        match self {
            Self::Unknown => RecordState::Unknown,
            Self::Nonexistent => RecordState::Nonexistent,
            Self::Existent(_) => RecordState::Existent,
        }
    }

    /// The stored record, if any.
    pub fn record(self) -> Option<&'a Record> {
        match self {
            Self::Existent(record) => Some(record),
            Self::Unknown | Self::Nonexistent => None,
        }
    }

    /// `true` for [`RecordLookup::Unknown`].
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// `true` for [`RecordLookup::Nonexistent`].
    pub fn is_nonexistent(self) -> bool {
        matches!(self, Self::Nonexistent)
    }
}
