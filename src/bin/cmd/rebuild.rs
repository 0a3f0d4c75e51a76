// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rebuild command - byte-exact container reconstruction.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Args;

use crate::common::Result;
use ctrscope::{open_path, FormatContext};

/// Rebuild a container.
#[derive(Args, Clone, Debug)]
pub struct RebuildCmd {
    /// Input container
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    out: PathBuf,
}

impl RebuildCmd {
    pub fn run(self) -> Result<()> {
        let context = open_path(&self.input)?;

        if !context.can_create() {
            return Err(anyhow::anyhow!(
                "{} does not support rebuild",
                context.format()
            ));
        }

        let file = File::create(&self.out)?;
        let mut sink = BufWriter::new(file);
        match context.create(&mut sink) {
            Ok(written) => {
                sink.flush()?;
                println!("Rebuilt {} ({written} bytes)", self.out.display());
                Ok(())
            }
            Err(err) => {
                // An interrupted rebuild is not a valid container.
                drop(sink);
                let _ = std::fs::remove_file(&self.out);
                Err(err.into())
            }
        }
    }
}
