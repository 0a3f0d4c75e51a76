// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CIA header parsing and section layout.
//!
//! # CIA Layout (little-endian)
//!
//! ```text
//! [0x00] Header size               (u32, always 0x2020)
//! [0x04] Type                     (u16)
//! [0x06] Version                  (u16)
//! [0x08] Certificate chain size   (u32)
//! [0x0C] Ticket size              (u32)
//! [0x10] TMD size                 (u32)
//! [0x14] Meta size                (u32)
//! [0x18] Content size             (u64)
//! [0x20] Content index            (0x2000 bytes)
//! ```
//!
//! The archive sections follow in file order - certificates, ticket, TMD,
//! content, meta - each section start aligned up to a 0x40 boundary.
//! Empty sections (declared size 0) are simply absent.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ExplorerError, Result};
use crate::io::container::Container;

/// CIA header length; also the format's detection word.
pub const HEADER_LEN: u64 = 0x2020;

/// Section alignment.
pub const ALIGNMENT: u64 = 0x40;

/// Content index length.
pub const CONTENT_INDEX_LEN: usize = 0x2000;

/// Align an offset up to the section boundary.
pub fn align_up(offset: u64) -> u64 {
    (offset + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Parsed CIA header.
#[derive(Debug, Clone)]
pub struct CiaHeader {
    /// Header size, always 0x2020
    pub header_size: u32,
    /// Archive type
    pub archive_type: u16,
    /// Format version
    pub version: u16,
    /// Certificate chain size
    pub cert_size: u32,
    /// Ticket size
    pub ticket_size: u32,
    /// TMD size
    pub tmd_size: u32,
    /// Meta section size
    pub meta_size: u32,
    /// Content size
    pub content_size: u64,
    /// Content index bitfield
    pub content_index: Vec<u8>,
}

/// The five archive section kinds, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Certificate chain
    Certificates,
    /// Ticket
    Ticket,
    /// Title metadata
    TitleMeta,
    /// Content
    Content,
    /// Meta (icon/dependency data)
    Meta,
}

impl SectionKind {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Certificates => "Certificate chain",
            SectionKind::Ticket => "Ticket",
            SectionKind::TitleMeta => "Title metadata (TMD)",
            SectionKind::Content => "Content",
            SectionKind::Meta => "Meta",
        }
    }

    /// Suggested extraction file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            SectionKind::Certificates => "certificates.bin",
            SectionKind::Ticket => "ticket.bin",
            SectionKind::TitleMeta => "title.tmd",
            SectionKind::Content => "content.bin",
            SectionKind::Meta => "meta.bin",
        }
    }

    /// Offset of this section's declared-size field in the header.
    pub fn size_field_offset(&self) -> u64 {
        match self {
            SectionKind::Certificates => 0x08,
            SectionKind::Ticket => 0x0C,
            SectionKind::TitleMeta => 0x10,
            SectionKind::Meta => 0x14,
            SectionKind::Content => 0x18,
        }
    }

    /// Width of the declared-size field.
    pub fn size_field_len(&self) -> u32 {
        match self {
            SectionKind::Content => 8,
            _ => 4,
        }
    }
}

/// A resolved archive section.
#[derive(Debug, Clone, Copy)]
pub struct CiaSection {
    /// Section kind
    pub kind: SectionKind,
    /// Absolute byte offset
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

/// Fully parsed CIA model.
#[derive(Debug, Clone)]
pub struct CiaModel {
    /// The archive header
    pub header: CiaHeader,
    /// Non-empty sections in file order
    pub sections: Vec<CiaSection>,
}

impl CiaModel {
    /// Find a section by kind.
    pub fn section(&self, kind: SectionKind) -> Option<&CiaSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Parse and validate a CIA archive.
pub fn parse(container: &Container) -> Result<CiaModel> {
    let bytes = container.bytes();
    if (bytes.len() as u64) < HEADER_LEN {
        return Err(ExplorerError::malformed(
            "CiaHeader",
            format!(
                "container is {} bytes, CIA header needs {HEADER_LEN}",
                bytes.len()
            ),
        ));
    }

    let mut cursor = Cursor::new(bytes);
    let header_size = cursor.read_u32::<LittleEndian>()?;
    if header_size as u64 != HEADER_LEN {
        return Err(ExplorerError::malformed(
            "CiaHeader",
            format!("declared header size 0x{header_size:X}, expected 0x{HEADER_LEN:X}"),
        ));
    }

    let archive_type = cursor.read_u16::<LittleEndian>()?;
    let version = cursor.read_u16::<LittleEndian>()?;
    let cert_size = cursor.read_u32::<LittleEndian>()?;
    let ticket_size = cursor.read_u32::<LittleEndian>()?;
    let tmd_size = cursor.read_u32::<LittleEndian>()?;
    let meta_size = cursor.read_u32::<LittleEndian>()?;
    let content_size = cursor.read_u64::<LittleEndian>()?;

    let mut content_index = vec![0u8; CONTENT_INDEX_LEN];
    cursor.read_exact(&mut content_index)?;

    let header = CiaHeader {
        header_size,
        archive_type,
        version,
        cert_size,
        ticket_size,
        tmd_size,
        meta_size,
        content_size,
        content_index,
    };

    let sections = resolve_sections(&header, container)?;

    tracing::debug!(
        "CIA archive parsed: {} sections, {} content bytes",
        sections.len(),
        header.content_size
    );

    Ok(CiaModel { header, sections })
}

/// Compute section offsets from the declared sizes and check they tile
/// the container exactly.
fn resolve_sections(header: &CiaHeader, container: &Container) -> Result<Vec<CiaSection>> {
    let declared = [
        (SectionKind::Certificates, header.cert_size as u64),
        (SectionKind::Ticket, header.ticket_size as u64),
        (SectionKind::TitleMeta, header.tmd_size as u64),
        (SectionKind::Content, header.content_size),
        (SectionKind::Meta, header.meta_size as u64),
    ];

    let mut sections = Vec::new();
    let mut cursor = HEADER_LEN;
    for (kind, size) in declared {
        if size == 0 {
            continue;
        }
        let offset = align_up(cursor);
        let end = offset
            .checked_add(size)
            .ok_or_else(|| ExplorerError::bounds(size, container.len(), offset))?;
        if end > container.len() {
            return Err(ExplorerError::bounds(size, container.len(), offset));
        }
        sections.push(CiaSection { kind, offset, size });
        cursor = end;
    }

    if cursor != container.len() {
        return Err(ExplorerError::malformed(
            "CiaHeader",
            format!(
                "declared sections end at {cursor}, container is {} bytes",
                container.len()
            ),
        ));
    }

    Ok(sections)
}

/// Test helper: assemble a CIA image from raw section bytes.
#[cfg(test)]
pub(crate) fn build_cia(
    cert: &[u8],
    ticket: &[u8],
    tmd: &[u8],
    content: &[u8],
    meta: &[u8],
) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_LEN as usize];
    bytes[0x00..0x04].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    bytes[0x08..0x0C].copy_from_slice(&(cert.len() as u32).to_le_bytes());
    bytes[0x0C..0x10].copy_from_slice(&(ticket.len() as u32).to_le_bytes());
    bytes[0x10..0x14].copy_from_slice(&(tmd.len() as u32).to_le_bytes());
    bytes[0x14..0x18].copy_from_slice(&(meta.len() as u32).to_le_bytes());
    bytes[0x18..0x20].copy_from_slice(&(content.len() as u64).to_le_bytes());

    for section in [cert, ticket, tmd, content, meta] {
        if section.is_empty() {
            continue;
        }
        let aligned = align_up(bytes.len() as u64) as usize;
        bytes.resize(aligned, 0);
        bytes.extend_from_slice(section);
    }
    bytes
}
