// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CIA rebuild.
//!
//! Re-encodes the parsed header fields at their original widths, then
//! copies every section byte-for-byte from the original container. The
//! alignment gaps between sections are copied verbatim too, so a rebuild
//! with zero edits reproduces the input exactly.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::Result;
use crate::io::container::Container;

use super::parser::{CiaModel, HEADER_LEN};

/// Rebuild a complete CIA into `sink`, returning bytes written.
pub fn write(model: &CiaModel, container: &Container, sink: &mut dyn Write) -> Result<u64> {
    let h = &model.header;
    let mut out: Vec<u8> = Vec::with_capacity(container.len() as usize);

    out.write_u32::<LittleEndian>(h.header_size)?;
    out.write_u16::<LittleEndian>(h.archive_type)?;
    out.write_u16::<LittleEndian>(h.version)?;
    out.write_u32::<LittleEndian>(h.cert_size)?;
    out.write_u32::<LittleEndian>(h.ticket_size)?;
    out.write_u32::<LittleEndian>(h.tmd_size)?;
    out.write_u32::<LittleEndian>(h.meta_size)?;
    out.write_u64::<LittleEndian>(h.content_size)?;
    out.extend_from_slice(&h.content_index);
    debug_assert_eq!(out.len() as u64, HEADER_LEN);

    let mut cursor = HEADER_LEN;
    for section in &model.sections {
        // Alignment gap: not owned by any field, copied verbatim.
        out.extend_from_slice(container.slice(cursor, section.offset - cursor)?);
        out.extend_from_slice(container.slice(section.offset, section.size)?);
        cursor = section.offset + section.size;
    }

    sink.write_all(&out)?;

    tracing::debug!(
        "CIA rebuilt: {} sections, {} bytes",
        model.sections.len(),
        out.len()
    );

    Ok(out.len() as u64)
}
