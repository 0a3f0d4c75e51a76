// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Save-image rebuild.
//!
//! Starts from a byte-for-byte copy of the original image (wear-leveling
//! journal, partition tables and file data are not owned by parsed
//! fields), re-encodes the DISA header and SAVE filesystem tables, then
//! recomputes the active-table SHA-256 and journal CRC32 over the
//! finalized bytes.

use std::io::Write;

use sha2::{Digest, Sha256};

use crate::core::Result;
use crate::io::container::Container;

use super::parser::{
    DisaHeader, SaveFs, SaveModel, DIR_ENTRY_LEN, DISA_MAGIC, FILE_ENTRY_LEN, SAVE_MAGIC,
};

/// Rebuild a complete save image into `sink`, returning bytes written.
pub fn write(model: &SaveModel, container: &Container, sink: &mut dyn Write) -> Result<u64> {
    let mut out = container.bytes().to_vec();

    encode_disa_header(&model.disa, &mut out);
    encode_save_fs(&model.fs, model.disa.save_region.offset, &mut out);

    // Digests go last, over the finalized bytes.
    let active = model.disa.active_table_offset() as usize;
    let table = model.disa.table_size as usize;
    let digest: [u8; 0x20] = Sha256::digest(&out[active..active + table]).into();
    out[0x170..0x190].copy_from_slice(&digest);

    let primary = model.disa.primary_table_offset as usize;
    let secondary = model.disa.secondary_table_offset as usize;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&out[primary..primary + table]);
    hasher.update(&out[secondary..secondary + table]);
    out[0x190..0x194].copy_from_slice(&hasher.finalize().to_le_bytes());

    sink.write_all(&out)?;

    tracing::debug!(
        "Save image rebuilt: {} files, {} bytes",
        model.fs.files.len(),
        out.len()
    );

    Ok(out.len() as u64)
}

fn encode_disa_header(disa: &DisaHeader, out: &mut [u8]) {
    out[0x000..0x010].copy_from_slice(&disa.cmac);
    out[0x100..0x104].copy_from_slice(DISA_MAGIC);
    out[0x104..0x108].copy_from_slice(&disa.version.to_le_bytes());
    out[0x108..0x110].copy_from_slice(&disa.partition_count.to_le_bytes());
    out[0x110..0x118].copy_from_slice(&disa.secondary_table_offset.to_le_bytes());
    out[0x118..0x120].copy_from_slice(&disa.primary_table_offset.to_le_bytes());
    out[0x120..0x128].copy_from_slice(&disa.table_size.to_le_bytes());
    out[0x128..0x130].copy_from_slice(&disa.save_desc.offset.to_le_bytes());
    out[0x130..0x138].copy_from_slice(&disa.save_desc.size.to_le_bytes());
    out[0x138..0x140].copy_from_slice(&disa.data_desc.offset.to_le_bytes());
    out[0x140..0x148].copy_from_slice(&disa.data_desc.size.to_le_bytes());
    out[0x148..0x150].copy_from_slice(&disa.save_region.offset.to_le_bytes());
    out[0x150..0x158].copy_from_slice(&disa.save_region.size.to_le_bytes());
    out[0x158..0x160].copy_from_slice(&disa.data_region.offset.to_le_bytes());
    out[0x160..0x168].copy_from_slice(&disa.data_region.size.to_le_bytes());
    out[0x168] = disa.active_table;
    out[0x169..0x170].copy_from_slice(&disa.active_padding);
    out[0x170..0x190].copy_from_slice(&disa.table_hash);
    out[0x190..0x194].copy_from_slice(&disa.journal_crc.to_le_bytes());
    out[0x194..0x200].copy_from_slice(&disa.reserved);
}

fn encode_save_fs(fs: &SaveFs, region_offset: u64, out: &mut [u8]) {
    let base = region_offset as usize;
    let h = &fs.header;
    out[base..base + 4].copy_from_slice(SAVE_MAGIC);
    out[base + 4..base + 8].copy_from_slice(&h.version.to_le_bytes());
    out[base + 8..base + 12].copy_from_slice(&h.dir_table_offset.to_le_bytes());
    out[base + 12..base + 16].copy_from_slice(&h.dir_count.to_le_bytes());
    out[base + 16..base + 20].copy_from_slice(&h.file_table_offset.to_le_bytes());
    out[base + 20..base + 24].copy_from_slice(&h.file_count.to_le_bytes());
    out[base + 24..base + 28].copy_from_slice(&h.data_offset.to_le_bytes());
    out[base + 28..base + 32].copy_from_slice(&h.reserved.to_le_bytes());

    for (i, dir) in fs.dirs.iter().enumerate() {
        let entry = base + h.dir_table_offset as usize + i * DIR_ENTRY_LEN as usize;
        out[entry..entry + 4].copy_from_slice(&dir.parent.to_le_bytes());
        out[entry + 4..entry + 20].copy_from_slice(&dir.name);
        out[entry + 20..entry + 24].copy_from_slice(&dir.next_sibling.to_le_bytes());
        out[entry + 24..entry + 28].copy_from_slice(&dir.first_dir.to_le_bytes());
        out[entry + 28..entry + 32].copy_from_slice(&dir.first_file.to_le_bytes());
    }

    for (i, file) in fs.files.iter().enumerate() {
        let entry = base + h.file_table_offset as usize + i * FILE_ENTRY_LEN as usize;
        out[entry..entry + 4].copy_from_slice(&file.parent.to_le_bytes());
        out[entry + 4..entry + 20].copy_from_slice(&file.name);
        out[entry + 20..entry + 24].copy_from_slice(&file.next_sibling.to_le_bytes());
        out[entry + 24..entry + 28].copy_from_slice(&file.data_offset.to_le_bytes());
        out[entry + 28..entry + 36].copy_from_slice(&file.size.to_le_bytes());
        out[entry + 36..entry + 48].copy_from_slice(&file.reserved);
    }
}
