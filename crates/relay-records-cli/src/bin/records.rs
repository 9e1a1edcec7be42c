// SPDX-License-Identifier: Apache-2.0
//! CLI entry point for the snapshot tool.

use anyhow::Result;
use relay_records_cli::cli::entrypoint;

fn main() -> Result<()> {
    entrypoint()
}
