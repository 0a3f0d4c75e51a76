// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Save-data flash image (DISA) context.
//!
//! A console save image: DISA header with dual journaled partition
//! tables, a save partition holding the inner SAVE filesystem, and an
//! optional data partition. The SAVE directory/file tables become the
//! filesystem tree; files extract from resident bytes.
//!
//! Save images support rebuild, recomputing the active-table SHA-256 and
//! the journal CRC32.

pub mod parser;
pub mod writer;

pub use parser::{DirEntry, DisaHeader, FileEntry, SaveFs, SaveHeader, SaveModel, Span};

use crate::core::{
    ActivationKey, Endianness, ExplorerError, FieldSurface, FieldTable, FormatKind, Node, Result,
    Selector,
};
use crate::io::container::Container;
use crate::io::traits::{check_key, Activation, FormatContext};

static SECTIONS: [&str; 3] = ["DISA header", "Partition table", "SAVE filesystem"];

/// Context for save-data flash images.
#[derive(Debug, Default)]
pub struct SaveContext {
    container: Option<Container>,
    model: Option<SaveModel>,
    explorer: Option<Node>,
    filesystem: Option<Node>,
}

impl SaveContext {
    /// Create an unopened context.
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<(&Container, &SaveModel)> {
        match (&self.container, &self.model) {
            (Some(c), Some(m)) => Ok((c, m)),
            _ => Err(ExplorerError::unsupported_operation(
                "access before open",
                FormatKind::SaveFlash,
            )),
        }
    }
}

fn build_explorer(model: &SaveModel) -> Node {
    Node::new("Save flash image")
        .with_key(ActivationKey::new(
            FormatKind::SaveFlash,
            Selector::SaveDisaHeader,
            "DISA header",
        ))
        .with_child(
            Node::new(format!("Partition table ({} bytes)", model.disa.table_size)).with_key(
                ActivationKey::new(
                    FormatKind::SaveFlash,
                    Selector::SavePartitionTable,
                    "Partition table",
                ),
            ),
        )
        .with_child(
            Node::new(format!(
                "SAVE filesystem ({} files)",
                model.fs.files.len()
            ))
            .with_key(ActivationKey::new(
                FormatKind::SaveFlash,
                Selector::SaveFsHeader,
                "SAVE header",
            )),
        )
}

fn build_filesystem(model: &SaveModel) -> Node {
    build_dir_node(model, 0)
}

fn build_dir_node(model: &SaveModel, dir_index: usize) -> Node {
    let dir = &model.fs.dirs[dir_index];
    let label = if dir_index == 0 {
        let name = dir.name_string();
        if name.is_empty() {
            "ROOT".to_string()
        } else {
            name
        }
    } else {
        dir.name_string()
    };

    let mut node = Node::new(label);
    let (child_dirs, child_files) = &model.fs.children[dir_index];
    for &child in child_dirs {
        node.push_child(build_dir_node(model, child as usize));
    }
    for &child in child_files {
        let file = &model.fs.files[child as usize];
        node.push_child(
            Node::new(format!("{} ({} bytes)", file.name_string(), file.size)).with_key(
                ActivationKey::new(
                    FormatKind::SaveFlash,
                    Selector::SaveFileExtract,
                    "Extract file",
                )
                .with_params(vec![child as u64]),
            ),
        );
    }
    node
}

fn emit_disa_header(table: &mut FieldTable, disa: &DisaHeader) {
    table.bytes(0x000, "AES-CMAC", &disa.cmac, 0);
    table.text(0x100, "Magic", parser::DISA_MAGIC, 0);
    table.num(0x104, 4, "Format version", disa.version as u64, 0);
    table.num(0x108, 8, "Partition count", disa.partition_count, 0);
    table.num(0x168, 1, "Active table", disa.active_table as u64, 0);
    table.bytes(0x170, "Active table SHA-256", &disa.table_hash, 0);
    table.num(0x190, 4, "Journal CRC32", disa.journal_crc as u64, 0);
}

fn emit_partition_table(table: &mut FieldTable, disa: &DisaHeader) {
    table.num(0x110, 8, "Secondary table offset", disa.secondary_table_offset, 1);
    table.num(0x118, 8, "Primary table offset", disa.primary_table_offset, 1);
    table.num(0x120, 8, "Partition table size", disa.table_size, 1);
    table.num(0x128, 8, "Save descriptor offset", disa.save_desc.offset, 1);
    table.num(0x130, 8, "Save descriptor size", disa.save_desc.size, 1);
    table.num(0x138, 8, "Data descriptor offset", disa.data_desc.offset, 1);
    table.num(0x140, 8, "Data descriptor size", disa.data_desc.size, 1);
    table.num(0x148, 8, "Save region offset", disa.save_region.offset, 1);
    table.num(0x150, 8, "Save region size", disa.save_region.size, 1);
    table.num(0x158, 8, "Data region offset", disa.data_region.offset, 1);
    table.num(0x160, 8, "Data region size", disa.data_region.size, 1);
}

fn emit_save_header(table: &mut FieldTable, model: &SaveModel) {
    let base = model.disa.save_region.offset;
    let h = &model.fs.header;
    table.text(base, "Magic", parser::SAVE_MAGIC, 2);
    table.num(base + 0x04, 4, "Version", h.version as u64, 2);
    table.num(base + 0x08, 4, "Directory table offset", h.dir_table_offset as u64, 2);
    table.num(base + 0x0C, 4, "Directory count", h.dir_count as u64, 2);
    table.num(base + 0x10, 4, "File table offset", h.file_table_offset as u64, 2);
    table.num(base + 0x14, 4, "File count", h.file_count as u64, 2);
    table.num(base + 0x18, 4, "Data region offset", h.data_offset as u64, 2);
}

impl FormatContext for SaveContext {
    fn format(&self) -> FormatKind {
        FormatKind::SaveFlash
    }

    fn open(&mut self, container: Container) -> Result<()> {
        let model = parser::parse(&container)?;
        let explorer = build_explorer(&model);
        let filesystem = build_filesystem(&model);
        self.container = Some(container);
        self.model = Some(model);
        self.explorer = Some(explorer);
        self.filesystem = Some(filesystem);
        Ok(())
    }

    fn explorer_tree(&self) -> Option<&Node> {
        self.explorer.as_ref()
    }

    fn filesystem_tree(&self) -> Option<&Node> {
        self.filesystem.as_ref()
    }

    fn section_headers(&self) -> &'static [&'static str] {
        &SECTIONS
    }

    fn can_create(&self) -> bool {
        true
    }

    fn create(&self, sink: &mut dyn std::io::Write) -> Result<u64> {
        let (container, model) = self.ready()?;
        writer::write(model, container, sink)
    }

    fn view(&self, surface: &mut dyn FieldSurface, key: &ActivationKey) -> Result<()> {
        check_key(self.format(), key)?;
        let (_, model) = self.ready()?;

        let mut table = FieldTable::new(Endianness::Little);
        match key.selector {
            Selector::None => {}
            Selector::SaveDisaHeader => emit_disa_header(&mut table, &model.disa),
            Selector::SavePartitionTable => emit_partition_table(&mut table, &model.disa),
            Selector::SaveFsHeader => emit_save_header(&mut table, model),
            other => {
                return Err(ExplorerError::unsupported_operation(
                    format!("view {other:?}"),
                    self.format(),
                ))
            }
        }
        table.emit(surface, self.section_headers());
        Ok(())
    }

    fn activate(&self, key: &ActivationKey) -> Result<Activation> {
        check_key(self.format(), key)?;
        let (container, model) = self.ready()?;

        match key.selector {
            Selector::None => Ok(Activation::None),
            Selector::SaveFileExtract => {
                let index = key.param(0) as usize;
                let file = model.fs.files.get(index).ok_or_else(|| {
                    ExplorerError::unsupported_operation(
                        format!("file {index}"),
                        self.format(),
                    )
                })?;
                let data = container
                    .slice(model.file_data_offset(file), file.size)?
                    .to_vec();
                let name = file.name_string();
                let name = if name.is_empty() {
                    format!("file{index}.bin")
                } else {
                    name
                };
                Ok(Activation::Extracted { name, data })
            }
            other => Err(ExplorerError::unsupported_operation(
                format!("activate {other:?}"),
                self.format(),
            )),
        }
    }

    fn save_filter(&self) -> &'static str {
        "SaveFlash Files (*.sav)|*.sav;*.bin|All Files|*.*"
    }
}

#[cfg(test)]
mod tests {
    use super::parser::build_save;
    use super::*;
    use crate::core::FieldRecord;

    struct Recorder {
        headers: Vec<&'static str>,
        records: Vec<FieldRecord>,
    }

    impl FieldSurface for Recorder {
        fn begin(&mut self, section_headers: &[&'static str]) {
            self.headers = section_headers.to_vec();
            self.records.clear();
        }
        fn push(&mut self, record: FieldRecord) {
            self.records.push(record);
        }
    }

    fn opened() -> SaveContext {
        let bytes = build_save(&[("game.dat", b"progress"), ("config", b"cfg")]);
        let mut ctx = SaveContext::new();
        ctx.open(Container::from_bytes(bytes, "test.sav")).unwrap();
        ctx
    }

    #[test]
    fn test_trees() {
        let ctx = opened();
        let explorer = ctx.explorer_tree().unwrap();
        assert_eq!(explorer.children.len(), 2);

        let fs = ctx.filesystem_tree().unwrap();
        assert_eq!(fs.label, "ROOT");
        assert_eq!(fs.children.len(), 2);
        assert!(fs.children[0].label.starts_with("game.dat"));
        assert!(fs.is_inert());
        assert!(!fs.children[0].is_inert());
    }

    #[test]
    fn test_extract_file() {
        let ctx = opened();
        let fs = ctx.filesystem_tree().unwrap();
        let key = fs.children[1].default_key().unwrap().clone();
        match ctx.activate(&key).unwrap() {
            Activation::Extracted { name, data } => {
                assert_eq!(name, "config");
                assert_eq!(data, b"cfg");
            }
            other => panic!("unexpected activation: {other:?}"),
        }
    }

    #[test]
    fn test_create_round_trip() {
        let bytes = build_save(&[("game.dat", b"progress")]);
        let mut ctx = SaveContext::new();
        ctx.open(Container::from_bytes(bytes.clone(), "test.sav"))
            .unwrap();

        assert!(ctx.can_create());
        let mut out = Vec::new();
        ctx.create(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_views_cover_all_sections() {
        let ctx = opened();
        let mut surface = Recorder {
            headers: Vec::new(),
            records: Vec::new(),
        };
        let mut seen_groups = Vec::new();
        for selector in [
            Selector::SaveDisaHeader,
            Selector::SavePartitionTable,
            Selector::SaveFsHeader,
        ] {
            let key = ActivationKey::new(FormatKind::SaveFlash, selector, "view");
            ctx.view(&mut surface, &key).unwrap();
            for record in &surface.records {
                assert!(record.group < ctx.section_headers().len());
                seen_groups.push(record.group);
            }
        }
        // The three views together exercise every declared section.
        for group in 0..ctx.section_headers().len() {
            assert!(seen_groups.contains(&group));
        }
    }
}
