// SPDX-License-Identifier: Apache-2.0
//! Developer tooling for `relay-records` snapshot files.
//!
//! Snapshot files are the `<key>.json` files written by `FsSnapshotStore`.
//! The `records` binary inspects them (stats, ids, get, status), validates
//! and fingerprints them (check, digest) and applies single-id edits
//! (delete, remove) or a canonical rewrite (fmt).

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

pub mod cli;
