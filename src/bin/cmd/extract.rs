// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Extract command - pull embedded files, partitions and sections out of
//! a container, following nested contexts all the way down.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::common::{sanitize_name, Result};
use ctrscope::{open_path, Activation, FormatContext, Node};

/// Extract embedded content.
#[derive(Args, Clone, Debug)]
pub struct ExtractCmd {
    /// Input container
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "extracted")]
    out: PathBuf,
}

impl ExtractCmd {
    pub fn run(self) -> Result<()> {
        let context = open_path(&self.input)?;
        fs::create_dir_all(&self.out)?;

        let mut count = 0usize;
        extract_context(context.as_ref(), &self.out, &mut count)?;

        println!("Extracted {count} item(s) to {}", self.out.display());
        Ok(())
    }
}

/// Activate every key in both trees, writing extracted bytes and
/// recursing into nested contexts.
fn extract_context(context: &dyn FormatContext, out_dir: &Path, count: &mut usize) -> Result<()> {
    let mut nodes: Vec<&Node> = Vec::new();
    if let Some(tree) = context.explorer_tree() {
        tree.walk(&mut |node| nodes.push(node));
    }
    if let Some(tree) = context.filesystem_tree() {
        tree.walk(&mut |node| nodes.push(node));
    }

    for node in nodes {
        for key in &node.keys {
            match context.activate(key) {
                Ok(Activation::Extracted { name, data }) => {
                    let path = out_dir.join(sanitize_name(&name));
                    fs::write(&path, &data)?;
                    println!("  {} ({} bytes)", path.display(), data.len());
                    *count += 1;
                }
                Ok(Activation::Nested(nested)) => {
                    let sub_dir = out_dir.join(sanitize_name(&node.label));
                    fs::create_dir_all(&sub_dir)?;
                    extract_context(nested.as_ref(), &sub_dir, count)?;
                }
                // View-only keys and no-ops are not extractions.
                Ok(Activation::None) | Err(_) => {}
            }
        }
    }

    Ok(())
}
