// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - container info, trees, field tables.

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use crate::common::{print_tree, Result, TableSurface};
use ctrscope::{open_path, FormatContext, Node};

/// Inspect container contents.
#[derive(Subcommand, Clone, Debug)]
pub enum InspectCmd {
    /// Show basic container information
    Info {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the explorer and filesystem trees
    Tree {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Dump the field table of every viewable node
    Fields {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        match self {
            InspectCmd::Info { input, json } => cmd_info(input, json),
            InspectCmd::Tree { input, json } => cmd_tree(input, json),
            InspectCmd::Fields { input, json } => cmd_fields(input, json),
        }
    }
}

/// Cmd: Show container info
fn cmd_info(input: PathBuf, as_json: bool) -> Result<()> {
    let context = open_path(&input)?;
    let explorer = context.explorer_tree().expect("open succeeded");
    let fs_nodes = context.filesystem_tree().map(Node::count).unwrap_or(0);

    if as_json {
        let value = json!({
            "path": input.display().to_string(),
            "format": context.format().to_string(),
            "can_create": context.can_create(),
            "section_headers": context.section_headers(),
            "explorer_nodes": explorer.count(),
            "filesystem_nodes": fs_nodes,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== {} ===", input.display());
    println!("Format:           {}", context.format());
    println!("Rebuild support:  {}", if context.can_create() { "yes" } else { "no" });
    println!("Explorer nodes:   {}", explorer.count());
    if fs_nodes > 0 {
        println!("Filesystem nodes: {fs_nodes}");
    } else {
        println!("Filesystem:       none");
    }
    println!("Save filter:      {}", context.save_filter());
    Ok(())
}

/// Cmd: Print trees
fn cmd_tree(input: PathBuf, as_json: bool) -> Result<()> {
    let context = open_path(&input)?;
    let explorer = context.explorer_tree().expect("open succeeded");

    if as_json {
        let value = json!({
            "explorer": explorer,
            "filesystem": context.filesystem_tree(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Explorer tree:");
    print_tree(explorer, "", true);
    if let Some(fs) = context.filesystem_tree() {
        println!();
        println!("Filesystem tree:");
        print_tree(fs, "", true);
    }
    Ok(())
}

/// Cmd: Dump field tables
fn cmd_fields(input: PathBuf, as_json: bool) -> Result<()> {
    let context = open_path(&input)?;
    let explorer = context.explorer_tree().expect("open succeeded");

    let mut nodes = Vec::new();
    explorer.walk(&mut |node| nodes.push(node));

    let mut dumped = Vec::new();
    for node in nodes {
        let Some(key) = node.default_key() else {
            continue;
        };
        let mut surface = TableSurface::new();
        // Nodes whose default action is not a view are skipped.
        if context.view(&mut surface, key).is_err() {
            continue;
        }
        dumped.push((node.label.clone(), surface));
    }

    if as_json {
        let value: Vec<_> = dumped
            .iter()
            .map(|(label, surface)| {
                json!({
                    "node": label,
                    "section_headers": &surface.headers,
                    "records": &surface.records,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (label, surface) in dumped {
        println!("{label}");
        surface.print();
        println!();
    }
    Ok(())
}
