// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NCCH partition context.
//!
//! An NCCH holds a program or data archive: header, optional plain/logo
//! regions, an ExeFS (flat file table for .code, icon, banner, logo) and
//! an optional RomFS. The ExeFS becomes the filesystem tree; its files
//! extract directly from resident bytes.
//!
//! Rebuild is not defined for NCCH partitions.

pub mod parser;

pub use parser::{ExefsEntry, ExefsModel, NcchHeader, NcchModel};

use crate::core::{
    ActivationKey, Endianness, ExplorerError, FieldSurface, FieldTable, FormatKind, Node, Result,
    Selector,
};
use crate::io::container::Container;
use crate::io::traits::{check_key, Activation, FormatContext};

static SECTIONS: [&str; 3] = ["NCCH header", "Regions", "ExeFS"];

/// Context for NCCH partitions.
#[derive(Debug, Default)]
pub struct NcchContext {
    container: Option<Container>,
    model: Option<NcchModel>,
    explorer: Option<Node>,
    filesystem: Option<Node>,
}

impl NcchContext {
    /// Create an unopened context.
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<(&Container, &NcchModel)> {
        match (&self.container, &self.model) {
            (Some(c), Some(m)) => Ok((c, m)),
            _ => Err(ExplorerError::unsupported_operation(
                "access before open",
                FormatKind::Ncch,
            )),
        }
    }

    fn exefs_entry(&self, index: usize) -> Result<(&ExefsModel, &ExefsEntry)> {
        let (_, model) = self.ready()?;
        let exefs = model.exefs.as_ref().ok_or_else(|| {
            ExplorerError::unsupported_operation("ExeFS access", FormatKind::Ncch)
        })?;
        let entry = exefs.entries.get(index).ok_or_else(|| {
            ExplorerError::unsupported_operation(
                format!("ExeFS file {index}"),
                FormatKind::Ncch,
            )
        })?;
        Ok((exefs, entry))
    }
}

fn build_explorer(model: &NcchModel) -> Node {
    let mut root = Node::new(format!(
        "NCCH partition ({})",
        model.header.product_code_string()
    ))
    .with_key(ActivationKey::new(
        FormatKind::Ncch,
        Selector::NcchHeader,
        "NCCH header",
    ));

    root.push_child(Node::new("Regions").with_key(ActivationKey::new(
        FormatKind::Ncch,
        Selector::NcchRegions,
        "Region table",
    )));

    if let Some(exefs) = &model.exefs {
        root.push_child(
            Node::new(format!("ExeFS ({} files)", exefs.entries.len())).with_key(
                ActivationKey::new(FormatKind::Ncch, Selector::NcchExefs, "ExeFS file table"),
            ),
        );
    }

    root
}

fn build_filesystem(model: &NcchModel) -> Option<Node> {
    let exefs = model.exefs.as_ref()?;
    if exefs.entries.is_empty() {
        return None;
    }

    let mut root = Node::new("ExeFS");
    for (i, entry) in exefs.entries.iter().enumerate() {
        root.push_child(
            Node::new(format!("{} ({} bytes)", entry.name_string(), entry.size)).with_key(
                ActivationKey::new(
                    FormatKind::Ncch,
                    Selector::NcchExefsFileExtract,
                    "Extract file",
                )
                .with_params(vec![i as u64]),
            ),
        );
    }
    Some(root)
}

fn emit_header(table: &mut FieldTable, h: &NcchHeader) {
    table.bytes(0x000, "RSA-2048 signature", &h.signature, 0);
    table.text(0x100, "Magic", parser::NCCH_MAGIC, 0);
    table.num(0x104, 4, "Content size (media units)", h.content_size_mu as u64, 0);
    table.num(0x108, 8, "Partition ID", h.partition_id, 0);
    table.text(0x110, "Maker code", &h.maker_code, 0);
    table.num(0x112, 2, "Version", h.version as u64, 0);
    table.num(0x114, 4, "Seed verifier", h.seed_verifier as u64, 0);
    table.num(0x118, 8, "Program ID", h.program_id, 0);
    table.bytes(0x120, "Reserved", &h.reserved0, 0);
    table.bytes(0x130, "Logo region SHA-256", &h.logo_hash, 0);
    table.text(0x150, "Product code", &h.product_code, 0);
    table.bytes(0x160, "Exheader SHA-256", &h.exheader_hash, 0);
    table.num(0x180, 4, "Exheader size", h.exheader_size as u64, 0);
    table.num(0x184, 4, "Reserved", h.reserved1 as u64, 0);
    table.bytes(0x188, "Flags", &h.flags, 0);
}

fn emit_regions(table: &mut FieldTable, h: &NcchHeader) {
    table.num(0x190, 4, "Plain region offset (media units)", h.plain_region.offset_mu as u64, 1);
    table.num(0x194, 4, "Plain region size (media units)", h.plain_region.size_mu as u64, 1);
    table.num(0x198, 4, "Logo region offset (media units)", h.logo_region.offset_mu as u64, 1);
    table.num(0x19C, 4, "Logo region size (media units)", h.logo_region.size_mu as u64, 1);
    table.num(0x1A0, 4, "ExeFS offset (media units)", h.exefs_region.offset_mu as u64, 1);
    table.num(0x1A4, 4, "ExeFS size (media units)", h.exefs_region.size_mu as u64, 1);
    table.num(0x1A8, 4, "ExeFS hash size (media units)", h.exefs_region.hash_size_mu as u64, 1);
    table.num(0x1B0, 4, "RomFS offset (media units)", h.romfs_region.offset_mu as u64, 1);
    table.num(0x1B4, 4, "RomFS size (media units)", h.romfs_region.size_mu as u64, 1);
    table.num(0x1B8, 4, "RomFS hash size (media units)", h.romfs_region.hash_size_mu as u64, 1);
    table.bytes(0x1C0, "ExeFS superblock SHA-256", &h.exefs_super_hash, 1);
    table.bytes(0x1E0, "RomFS superblock SHA-256", &h.romfs_super_hash, 1);
}

fn emit_exefs(table: &mut FieldTable, exefs: &ExefsModel) {
    for entry in &exefs.entries {
        let entry_off = exefs.region_offset + (entry.slot as u64) * 0x10;
        table.text(entry_off, "File name", &entry.name, 2);
        table.num(entry_off + 8, 4, "Data offset", entry.offset as u64, 2);
        table.num(entry_off + 12, 4, "File size", entry.size as u64, 2);
        let hash_off =
            exefs.region_offset + 0xC0 + ((parser::EXEFS_SLOTS - 1 - entry.slot) as u64) * 0x20;
        table.bytes(hash_off, "File SHA-256", &entry.hash, 2);
    }
}

impl FormatContext for NcchContext {
    fn format(&self) -> FormatKind {
        FormatKind::Ncch
    }

    fn open(&mut self, container: Container) -> Result<()> {
        let model = parser::parse(&container)?;
        let explorer = build_explorer(&model);
        let filesystem = build_filesystem(&model);
        self.container = Some(container);
        self.model = Some(model);
        self.explorer = Some(explorer);
        self.filesystem = filesystem;
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

    fn view(&self, surface: &mut dyn FieldSurface, key: &ActivationKey) -> Result<()> {
        check_key(self.format(), key)?;
        let (_, model) = self.ready()?;

        let mut table = FieldTable::new(Endianness::Little);
        match key.selector {
            Selector::None => {}
            Selector::NcchHeader => emit_header(&mut table, &model.header),
            Selector::NcchRegions => emit_regions(&mut table, &model.header),
            Selector::NcchExefs => {
                let exefs = model.exefs.as_ref().ok_or_else(|| {
                    ExplorerError::unsupported_operation("ExeFS view", self.format())
                })?;
                emit_exefs(&mut table, exefs);
            }
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
        let (container, _) = self.ready()?;

        match key.selector {
            Selector::None => Ok(Activation::None),
            Selector::NcchExefsFileExtract => {
                let index = key.param(0) as usize;
                let (exefs, entry) = self.exefs_entry(index)?;
                let data = container
                    .slice(exefs.data_offset(entry), entry.size as u64)?
                    .to_vec();
                let name = entry.name_string();
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
        "NCCH Partitions (*.cxi)|*.cxi;*.cfa|All Files|*.*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldRecord;
    use crate::io::formats::ncsd::MEDIA_UNIT;

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

    fn minimal_partition() -> Vec<u8> {
        let total = 3 * MEDIA_UNIT as usize;
        let mut bytes = vec![0u8; total];
        bytes[0x100..0x104].copy_from_slice(b"NCCH");
        bytes[0x104..0x108].copy_from_slice(&3u32.to_le_bytes());
        bytes[0x150..0x15A].copy_from_slice(b"CTR-P-CTAP");
        bytes[0x1A0..0x1A4].copy_from_slice(&1u32.to_le_bytes());
        bytes[0x1A4..0x1A8].copy_from_slice(&2u32.to_le_bytes());
        let exefs = MEDIA_UNIT as usize;
        bytes[exefs..exefs + 4].copy_from_slice(b"icon");
        bytes[exefs + 12..exefs + 16].copy_from_slice(&16u32.to_le_bytes());
        for i in 0..16u8 {
            bytes[exefs + 0x200 + i as usize] = i;
        }
        bytes
    }

    fn opened() -> NcchContext {
        let mut ctx = NcchContext::new();
        ctx.open(Container::from_bytes(minimal_partition(), "test.cxi"))
            .unwrap();
        ctx
    }

    #[test]
    fn test_trees() {
        let ctx = opened();
        let explorer = ctx.explorer_tree().unwrap();
        assert!(explorer.label.contains("CTR-P-CTAP"));
        assert_eq!(explorer.children.len(), 2);

        let fs = ctx.filesystem_tree().unwrap();
        assert_eq!(fs.label, "ExeFS");
        assert_eq!(fs.children.len(), 1);
        assert!(fs.children[0].label.starts_with("icon"));
    }

    #[test]
    fn test_no_filesystem_tree_without_exefs() {
        let mut bytes = vec![0u8; MEDIA_UNIT as usize];
        bytes[0x100..0x104].copy_from_slice(b"NCCH");
        bytes[0x104..0x108].copy_from_slice(&1u32.to_le_bytes());
        let mut ctx = NcchContext::new();
        ctx.open(Container::from_bytes(bytes, "test.cfa")).unwrap();
        assert!(ctx.filesystem_tree().is_none());
        assert!(ctx.explorer_tree().is_some());
    }

    #[test]
    fn test_extract_exefs_file() {
        let ctx = opened();
        let fs = ctx.filesystem_tree().unwrap();
        let key = fs.children[0].default_key().unwrap().clone();
        match ctx.activate(&key).unwrap() {
            Activation::Extracted { name, data } => {
                assert_eq!(name, "icon");
                assert_eq!(data, (0..16u8).collect::<Vec<_>>());
            }
            other => panic!("unexpected activation: {other:?}"),
        }
    }

    #[test]
    fn test_view_groups_in_range() {
        let ctx = opened();
        let mut surface = Recorder {
            headers: Vec::new(),
            records: Vec::new(),
        };
        for selector in [Selector::NcchHeader, Selector::NcchRegions, Selector::NcchExefs] {
            let key = ActivationKey::new(FormatKind::Ncch, selector, "view");
            ctx.view(&mut surface, &key).unwrap();
            for record in &surface.records {
                assert!(record.group < ctx.section_headers().len());
            }
        }
    }

    #[test]
    fn test_exefs_extract_out_of_range() {
        let ctx = opened();
        let key = ActivationKey::new(
            FormatKind::Ncch,
            Selector::NcchExefsFileExtract,
            "Extract file",
        )
        .with_params(vec![7]);
        assert!(ctx.activate(&key).is_err());
    }
}
