// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NCSD ROM card context.
//!
//! The outermost container on a ROM card: a signed header plus up to
//! eight partitions, each an NCCH container in its own right. Partitions
//! activate into nested [`NcchContext`]s over the already-resident bytes,
//! so inspecting a partition never re-reads the card image.
//!
//! Rebuild is not defined for ROM cards.

pub mod parser;

pub use parser::{NcsdHeader, NcsdModel, PartitionEntry, MEDIA_UNIT, PARTITION_SLOTS};

use crate::core::{
    ActivationKey, Endianness, ExplorerError, FieldSurface, FieldTable, FormatKind, Node, Result,
    Selector,
};
use crate::io::container::Container;
use crate::io::formats::ncch::NcchContext;
use crate::io::traits::{check_key, Activation, FormatContext};

static SECTIONS: [&str; 3] = ["NCSD header", "Partition table", "Card info"];

/// Context for NCSD ROM card images.
#[derive(Debug, Default)]
pub struct NcsdContext {
    container: Option<Container>,
    model: Option<NcsdModel>,
    explorer: Option<Node>,
}

impl NcsdContext {
    /// Create an unopened context.
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<(&Container, &NcsdModel)> {
        match (&self.container, &self.model) {
            (Some(c), Some(m)) => Ok((c, m)),
            _ => Err(ExplorerError::unsupported_operation(
                "access before open",
                FormatKind::RomCard,
            )),
        }
    }

    fn partition(&self, index: usize) -> Result<PartitionEntry> {
        let (_, model) = self.ready()?;
        let entry = model
            .header
            .partitions
            .get(index)
            .copied()
            .filter(PartitionEntry::is_used)
            .ok_or_else(|| {
                ExplorerError::unsupported_operation(
                    format!("partition {index}"),
                    FormatKind::RomCard,
                )
            })?;
        Ok(entry)
    }
}

fn build_explorer(model: &NcsdModel) -> Node {
    let mut root = Node::new(format!("NCSD ROM card ({:016X})", model.header.media_id)).with_key(
        ActivationKey::new(FormatKind::RomCard, Selector::NcsdHeader, "NCSD header"),
    );

    for i in model.header.used_partitions() {
        let entry = model.header.partitions[i];
        let node = Node::new(format!("Partition {i} ({} bytes)", entry.byte_len()))
            .with_key(
                ActivationKey::new(FormatKind::RomCard, Selector::NcsdPartition, "Partition entry")
                    .with_params(vec![i as u64]),
            )
            .with_key(
                ActivationKey::new(
                    FormatKind::RomCard,
                    Selector::NcsdPartitionOpen,
                    "Open as NCCH",
                )
                .with_params(vec![i as u64]),
            )
            .with_key(
                ActivationKey::new(
                    FormatKind::RomCard,
                    Selector::NcsdPartitionExtract,
                    "Extract raw bytes",
                )
                .with_params(vec![i as u64]),
            );
        root.push_child(node);
    }

    root
}

fn emit_header(table: &mut FieldTable, h: &NcsdHeader) {
    table.bytes(0x000, "RSA-2048 signature", &h.signature, 0);
    table.text(0x100, "Magic", parser::NCSD_MAGIC, 0);
    table.num(0x104, 4, "Image size (media units)", h.image_size_mu as u64, 0);
    table.num(0x108, 8, "Media ID", h.media_id, 0);
    table.bytes(0x110, "Partition FS types", &h.fs_types, 0);
    table.bytes(0x118, "Partition crypt types", &h.crypt_types, 0);

    for i in 0..PARTITION_SLOTS {
        let off = 0x120 + (i as u64) * 8;
        table.num(
            off,
            4,
            &format!("Partition {i} offset (media units)"),
            h.partitions[i].offset_mu as u64,
            1,
        );
        table.num(
            off + 4,
            4,
            &format!("Partition {i} length (media units)"),
            h.partitions[i].length_mu as u64,
            1,
        );
    }

    table.bytes(0x160, "Exheader SHA-256", &h.exheader_hash, 2);
    table.num(
        0x180,
        4,
        "Additional header size",
        h.additional_header_size as u64,
        2,
    );
    table.num(0x184, 4, "Sector zero offset", h.sector_zero_offset as u64, 2);
    table.bytes(0x188, "Partition flags", &h.partition_flags, 2);
    for i in 0..PARTITION_SLOTS {
        table.num(
            0x190 + (i as u64) * 8,
            8,
            &format!("Partition {i} ID"),
            h.partition_ids[i],
            2,
        );
    }
    table.bytes(0x1D0, "Reserved", &h.reserved, 2);
}

fn emit_partition(table: &mut FieldTable, h: &NcsdHeader, index: usize) {
    let entry = h.partitions[index];
    let off = 0x120 + (index as u64) * 8;
    table.num(
        off,
        4,
        &format!("Partition {index} offset (media units)"),
        entry.offset_mu as u64,
        1,
    );
    table.num(
        off + 4,
        4,
        &format!("Partition {index} length (media units)"),
        entry.length_mu as u64,
        1,
    );
    table.bytes(
        0x110 + index as u64,
        &format!("Partition {index} FS type"),
        &h.fs_types[index..index + 1],
        1,
    );
    table.bytes(
        0x118 + index as u64,
        &format!("Partition {index} crypt type"),
        &h.crypt_types[index..index + 1],
        1,
    );
    table.num(
        0x190 + (index as u64) * 8,
        8,
        &format!("Partition {index} ID"),
        h.partition_ids[index],
        1,
    );
}

impl FormatContext for NcsdContext {
    fn format(&self) -> FormatKind {
        FormatKind::RomCard
    }

    fn open(&mut self, container: Container) -> Result<()> {
        let model = parser::parse(&container)?;
        let explorer = build_explorer(&model);
        self.container = Some(container);
        self.model = Some(model);
        self.explorer = Some(explorer);
        Ok(())
    }

    fn explorer_tree(&self) -> Option<&Node> {
        self.explorer.as_ref()
    }

    fn filesystem_tree(&self) -> Option<&Node> {
        None
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
            Selector::NcsdHeader => emit_header(&mut table, &model.header),
            Selector::NcsdPartition => {
                let index = key.param(0) as usize;
                self.partition(index)?;
                emit_partition(&mut table, &model.header, index);
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
            Selector::NcsdPartitionOpen => {
                let index = key.param(0) as usize;
                let entry = self.partition(index)?;
                let sub = container.sub_container(
                    entry.byte_offset(),
                    entry.byte_len(),
                    &format!("partition{index}"),
                )?;
                let mut ctx = NcchContext::new();
                ctx.open(sub)?;
                tracing::debug!(
                    "Opened NCSD partition {} as nested NCCH context",
                    index
                );
                Ok(Activation::Nested(Box::new(ctx)))
            }
            Selector::NcsdPartitionExtract => {
                let index = key.param(0) as usize;
                let entry = self.partition(index)?;
                let data = container
                    .slice(entry.byte_offset(), entry.byte_len())?
                    .to_vec();
                Ok(Activation::Extracted {
                    name: format!("partition{index}.cxi"),
                    data,
                })
            }
            other => Err(ExplorerError::unsupported_operation(
                format!("activate {other:?}"),
                self.format(),
            )),
        }
    }

    fn save_filter(&self) -> &'static str {
        "NCSD ROM Card Images (*.3ds)|*.3ds;*.cci|All Files|*.*"
    }
}
