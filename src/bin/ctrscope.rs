// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Ctrscope CLI
//!
//! Command-line host for the container inspection library.
//!
//! ## Usage
//!
//! ```sh
//! # Show container information
//! ctrscope inspect info game.3ds
//!
//! # Print the explorer and filesystem trees
//! ctrscope inspect tree save.sav
//!
//! # Dump every field table
//! ctrscope inspect fields title.tmd --json
//!
//! # Extract embedded files and sections
//! ctrscope extract archive.cia --out extracted/
//!
//! # Byte-exact rebuild
//! ctrscope rebuild title.tmd --out rebuilt.tmd
//! ```

mod cmd;
mod common;

use std::process;

use clap::{Parser, Subcommand};
use cmd::{ExtractCmd, InspectCmd, RebuildCmd};
use common::Result;

/// Ctrscope - CTR container inspection toolkit
///
/// Work with ROM card, CIA, save and TMD images through a unified
/// interface. Format auto-detection means you never specify file types.
#[derive(Parser, Clone)]
#[command(name = "ctrscope")]
#[command(about = "Container inspection toolkit for 3DS ROM, CIA, save and TMD images", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Inspect container contents (info, trees, field tables)
    #[command(subcommand)]
    Inspect(InspectCmd),

    /// Extract embedded files, partitions and sections
    Extract(ExtractCmd),

    /// Rebuild a container byte-exactly
    Rebuild(RebuildCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Extract(cmd) => cmd.run(),
        Commands::Rebuild(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
