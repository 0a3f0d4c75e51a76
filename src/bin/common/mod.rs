// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use ctrscope::{FieldRecord, FieldSurface, Node};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Field surface that buffers one complete table.
#[derive(Default)]
pub struct TableSurface {
    /// Declared section headers
    pub headers: Vec<&'static str>,
    /// Records in declared order
    pub records: Vec<FieldRecord>,
}

impl TableSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the table as aligned text with section banners.
    pub fn print(&self) {
        let mut current_group = usize::MAX;
        for record in &self.records {
            if record.group != current_group {
                current_group = record.group;
                let header = self
                    .headers
                    .get(record.group)
                    .copied()
                    .unwrap_or("(unnamed section)");
                println!("  [{header}]");
            }
            let value = if record.value.is_empty() {
                String::new()
            } else {
                format!("  = {}", record.value)
            };
            println!(
                "    {:>8}  {:>4}  {:<32} {}{}",
                record.offset_label(),
                record.size,
                record.description,
                record.hex,
                value
            );
        }
    }
}

impl FieldSurface for TableSurface {
    fn begin(&mut self, section_headers: &[&'static str]) {
        self.headers = section_headers.to_vec();
        self.records.clear();
    }

    fn push(&mut self, record: FieldRecord) {
        self.records.push(record);
    }
}

/// Print a tree with box-drawing indentation.
pub fn print_tree(node: &Node, prefix: &str, is_last: bool) {
    let branch = if prefix.is_empty() {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };
    println!("{prefix}{branch}{}", node.label);

    let child_prefix = if prefix.is_empty() {
        String::new()
    } else if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == node.children.len();
        // Children of the root need a prefix to hang branches from.
        let effective = if prefix.is_empty() && child_prefix.is_empty() {
            " ".to_string()
        } else {
            child_prefix.clone()
        };
        print_tree(child, &effective, last);
    }
}

/// Make an extracted name safe to join onto an output directory.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.').to_string();
    if trimmed.is_empty() {
        "unnamed.bin".to_string()
    } else {
        trimmed
    }
}
