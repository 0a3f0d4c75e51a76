// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NCCH header and ExeFS parsing.
//!
//! # NCCH Layout (little-endian, media unit = 0x200 bytes)
//!
//! ```text
//! [0x000] RSA-2048 signature        (0x100 bytes, not verified)
//! [0x100] Magic "NCCH"              (4 bytes)
//! [0x104] Content size              (u32, media units; must equal file size)
//! [0x108] Partition ID              (u64)
//! [0x110] Maker code                (char[2])
//! [0x112] Version                   (u16)
//! [0x114] Seed verifier             (u32)
//! [0x118] Program ID                (u64)
//! [0x120] Reserved                  (0x10 bytes)
//! [0x130] Logo region SHA-256       (0x20 bytes)
//! [0x150] Product code              (char[0x10])
//! [0x160] Exheader SHA-256          (0x20 bytes)
//! [0x180] Exheader size             (u32)
//! [0x184] Reserved                  (u32)
//! [0x188] Flags                     (8 bytes)
//! [0x190] Plain region              { offset u32, size u32 } (media units)
//! [0x198] Logo region               { offset u32, size u32 }
//! [0x1A0] ExeFS region              { offset u32, size u32, hash size u32, reserved u32 }
//! [0x1B0] RomFS region              { offset u32, size u32, hash size u32, reserved u32 }
//! [0x1C0] ExeFS superblock SHA-256  (0x20 bytes)
//! [0x1E0] RomFS superblock SHA-256  (0x20 bytes)
//! ```
//!
//! # ExeFS Layout (at the ExeFS region offset)
//!
//! ```text
//! [0x000] 10 x { name char[8], offset u32, size u32 }   (file table)
//! [0x0A0] Reserved                  (0x20 bytes)
//! [0x0C0] 10 x SHA-256              (per-file hash, reverse slot order)
//! [0x200] File data                 (entry offsets are relative to here)
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ExplorerError, Result};
use crate::io::container::Container;
use crate::io::formats::ncsd::MEDIA_UNIT;
use crate::render;

/// NCCH magic string.
pub const NCCH_MAGIC: &[u8; 4] = b"NCCH";

/// NCCH header length.
pub const HEADER_LEN: usize = 0x200;

/// ExeFS header length; file data starts here.
pub const EXEFS_HEADER_LEN: u64 = 0x200;

/// Number of ExeFS file slots.
pub const EXEFS_SLOTS: usize = 10;

/// A plain region entry, in media units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionEntry {
    /// Region offset in media units
    pub offset_mu: u32,
    /// Region size in media units
    pub size_mu: u32,
}

impl RegionEntry {
    /// Byte offset within the partition.
    pub fn byte_offset(&self) -> u64 {
        self.offset_mu as u64 * MEDIA_UNIT
    }

    /// Byte length.
    pub fn byte_len(&self) -> u64 {
        self.size_mu as u64 * MEDIA_UNIT
    }

    /// Whether the region exists.
    pub fn is_used(&self) -> bool {
        self.size_mu != 0
    }
}

/// A hashed filesystem region entry (ExeFS/RomFS), in media units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsRegionEntry {
    /// Region offset in media units
    pub offset_mu: u32,
    /// Region size in media units
    pub size_mu: u32,
    /// Hash region size in media units
    pub hash_size_mu: u32,
    /// Reserved word
    pub reserved: u32,
}

impl FsRegionEntry {
    /// Byte offset within the partition.
    pub fn byte_offset(&self) -> u64 {
        self.offset_mu as u64 * MEDIA_UNIT
    }

    /// Byte length.
    pub fn byte_len(&self) -> u64 {
        self.size_mu as u64 * MEDIA_UNIT
    }

    /// Whether the region exists.
    pub fn is_used(&self) -> bool {
        self.size_mu != 0
    }
}

/// Parsed NCCH header.
#[derive(Debug, Clone)]
pub struct NcchHeader {
    /// RSA signature over the header (opaque)
    pub signature: [u8; 0x100],
    /// Content size in media units
    pub content_size_mu: u32,
    /// Partition ID
    pub partition_id: u64,
    /// Maker code
    pub maker_code: [u8; 2],
    /// Format version
    pub version: u16,
    /// Seed verifier
    pub seed_verifier: u32,
    /// Program ID
    pub program_id: u64,
    /// Reserved
    pub reserved0: [u8; 0x10],
    /// Logo region SHA-256 (opaque)
    pub logo_hash: [u8; 0x20],
    /// Product code (e.g., "CTR-P-CTAP")
    pub product_code: [u8; 0x10],
    /// Exheader SHA-256 (opaque)
    pub exheader_hash: [u8; 0x20],
    /// Exheader size
    pub exheader_size: u32,
    /// Reserved
    pub reserved1: u32,
    /// Content flags
    pub flags: [u8; 8],
    /// Plain region
    pub plain_region: RegionEntry,
    /// Logo region
    pub logo_region: RegionEntry,
    /// ExeFS region
    pub exefs_region: FsRegionEntry,
    /// RomFS region
    pub romfs_region: FsRegionEntry,
    /// ExeFS superblock SHA-256 (opaque)
    pub exefs_super_hash: [u8; 0x20],
    /// RomFS superblock SHA-256 (opaque)
    pub romfs_super_hash: [u8; 0x20],
}

impl NcchHeader {
    /// Product code decoded as text.
    pub fn product_code_string(&self) -> String {
        render::ascii_text(&self.product_code)
    }
}

/// One used ExeFS file slot.
#[derive(Debug, Clone)]
pub struct ExefsEntry {
    /// Slot index in the file table
    pub slot: usize,
    /// File name bytes
    pub name: [u8; 8],
    /// Offset relative to the ExeFS data section
    pub offset: u32,
    /// File size in bytes
    pub size: u32,
    /// Per-file SHA-256 (opaque)
    pub hash: [u8; 0x20],
}

impl ExefsEntry {
    /// File name decoded as text.
    pub fn name_string(&self) -> String {
        render::ascii_text(&self.name)
    }
}

/// Parsed ExeFS model.
#[derive(Debug, Clone)]
pub struct ExefsModel {
    /// Absolute byte offset of the ExeFS region within the partition
    pub region_offset: u64,
    /// Used file slots, in table order
    pub entries: Vec<ExefsEntry>,
}

impl ExefsModel {
    /// Absolute byte offset of a file's data within the partition.
    pub fn data_offset(&self, entry: &ExefsEntry) -> u64 {
        self.region_offset + EXEFS_HEADER_LEN + entry.offset as u64
    }
}

/// Fully parsed NCCH model.
#[derive(Debug, Clone)]
pub struct NcchModel {
    /// The partition header
    pub header: NcchHeader,
    /// ExeFS contents, when the region exists
    pub exefs: Option<ExefsModel>,
}

/// Parse and validate an NCCH partition.
pub fn parse(container: &Container) -> Result<NcchModel> {
    let bytes = container.bytes();
    if bytes.len() < HEADER_LEN {
        return Err(ExplorerError::malformed(
            "NcchHeader",
            format!(
                "container is {} bytes, NCCH header needs {HEADER_LEN}",
                bytes.len()
            ),
        ));
    }

    let mut cursor = Cursor::new(bytes);

    let mut signature = [0u8; 0x100];
    cursor.read_exact(&mut signature)?;

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != NCCH_MAGIC {
        return Err(ExplorerError::malformed(
            "NcchHeader",
            format!("invalid magic: {:?}", String::from_utf8_lossy(&magic)),
        ));
    }

    let content_size_mu = cursor.read_u32::<LittleEndian>()?;
    let partition_id = cursor.read_u64::<LittleEndian>()?;
    let mut maker_code = [0u8; 2];
    cursor.read_exact(&mut maker_code)?;
    let version = cursor.read_u16::<LittleEndian>()?;
    let seed_verifier = cursor.read_u32::<LittleEndian>()?;
    let program_id = cursor.read_u64::<LittleEndian>()?;
    let mut reserved0 = [0u8; 0x10];
    cursor.read_exact(&mut reserved0)?;
    let mut logo_hash = [0u8; 0x20];
    cursor.read_exact(&mut logo_hash)?;
    let mut product_code = [0u8; 0x10];
    cursor.read_exact(&mut product_code)?;
    let mut exheader_hash = [0u8; 0x20];
    cursor.read_exact(&mut exheader_hash)?;
    let exheader_size = cursor.read_u32::<LittleEndian>()?;
    let reserved1 = cursor.read_u32::<LittleEndian>()?;
    let mut flags = [0u8; 8];
    cursor.read_exact(&mut flags)?;

    let plain_region = read_region(&mut cursor)?;
    let logo_region = read_region(&mut cursor)?;
    let exefs_region = read_fs_region(&mut cursor)?;
    let romfs_region = read_fs_region(&mut cursor)?;

    let mut exefs_super_hash = [0u8; 0x20];
    cursor.read_exact(&mut exefs_super_hash)?;
    let mut romfs_super_hash = [0u8; 0x20];
    cursor.read_exact(&mut romfs_super_hash)?;

    let header = NcchHeader {
        signature,
        content_size_mu,
        partition_id,
        maker_code,
        version,
        seed_verifier,
        program_id,
        reserved0,
        logo_hash,
        product_code,
        exheader_hash,
        exheader_size,
        reserved1,
        flags,
        plain_region,
        logo_region,
        exefs_region,
        romfs_region,
        exefs_super_hash,
        romfs_super_hash,
    };

    validate(&header, container)?;

    let exefs = if header.exefs_region.is_used() {
        Some(parse_exefs(&header.exefs_region, container)?)
    } else {
        None
    };

    tracing::debug!(
        "NCCH partition parsed: product code {:?}, {} ExeFS files",
        header.product_code_string(),
        exefs.as_ref().map(|e| e.entries.len()).unwrap_or(0)
    );

    Ok(NcchModel { header, exefs })
}

fn read_region(cursor: &mut Cursor<&[u8]>) -> Result<RegionEntry> {
    Ok(RegionEntry {
        offset_mu: cursor.read_u32::<LittleEndian>()?,
        size_mu: cursor.read_u32::<LittleEndian>()?,
    })
}

fn read_fs_region(cursor: &mut Cursor<&[u8]>) -> Result<FsRegionEntry> {
    Ok(FsRegionEntry {
        offset_mu: cursor.read_u32::<LittleEndian>()?,
        size_mu: cursor.read_u32::<LittleEndian>()?,
        hash_size_mu: cursor.read_u32::<LittleEndian>()?,
        reserved: cursor.read_u32::<LittleEndian>()?,
    })
}

/// Bounds and overlap validation for the declared regions.
fn validate(header: &NcchHeader, container: &Container) -> Result<()> {
    let declared = header.content_size_mu as u64 * MEDIA_UNIT;
    if declared != container.len() {
        return Err(ExplorerError::malformed(
            "NcchHeader",
            format!(
                "declared content size {declared} does not match container size {}",
                container.len()
            ),
        ));
    }

    let mut spans: Vec<(&'static str, u64, u64)> = Vec::new();
    let mut check = |name: &'static str, offset: u64, len: u64| -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if offset < HEADER_LEN as u64 {
            return Err(ExplorerError::malformed(
                "NcchHeader",
                format!("{name} region overlaps the NCCH header"),
            ));
        }
        let end = offset
            .checked_add(len)
            .ok_or_else(|| ExplorerError::bounds(len, container.len(), offset))?;
        if end > container.len() {
            return Err(ExplorerError::bounds(len, container.len(), offset));
        }
        spans.push((name, offset, end));
        Ok(())
    };

    check(
        "plain",
        header.plain_region.byte_offset(),
        header.plain_region.byte_len(),
    )?;
    check(
        "logo",
        header.logo_region.byte_offset(),
        header.logo_region.byte_len(),
    )?;
    check(
        "ExeFS",
        header.exefs_region.byte_offset(),
        header.exefs_region.byte_len(),
    )?;
    check(
        "RomFS",
        header.romfs_region.byte_offset(),
        header.romfs_region.byte_len(),
    )?;

    spans.sort_by_key(|&(_, start, _)| start);
    for pair in spans.windows(2) {
        let (a, _, a_end) = pair[0];
        let (b, b_start, _) = pair[1];
        if b_start < a_end {
            return Err(ExplorerError::malformed(
                "NcchHeader",
                format!("{a} and {b} regions overlap"),
            ));
        }
    }

    Ok(())
}

/// Parse the ExeFS file table.
fn parse_exefs(region: &FsRegionEntry, container: &Container) -> Result<ExefsModel> {
    let region_offset = region.byte_offset();
    let region_len = region.byte_len();
    if region_len < EXEFS_HEADER_LEN {
        return Err(ExplorerError::malformed(
            "ExeFs",
            format!("ExeFS region is {region_len} bytes, header needs {EXEFS_HEADER_LEN}"),
        ));
    }

    let header = container.slice(region_offset, EXEFS_HEADER_LEN)?;
    let mut cursor = Cursor::new(header);

    let mut raw = Vec::with_capacity(EXEFS_SLOTS);
    for _ in 0..EXEFS_SLOTS {
        let mut name = [0u8; 8];
        cursor.read_exact(&mut name)?;
        let offset = cursor.read_u32::<LittleEndian>()?;
        let size = cursor.read_u32::<LittleEndian>()?;
        raw.push((name, offset, size));
    }

    let mut entries = Vec::new();
    for (slot, (name, offset, size)) in raw.into_iter().enumerate() {
        if name[0] == 0 {
            continue;
        }
        let data_end = EXEFS_HEADER_LEN + offset as u64 + size as u64;
        if data_end > region_len {
            return Err(ExplorerError::bounds(
                size as u64,
                region_len,
                region_offset + EXEFS_HEADER_LEN + offset as u64,
            ));
        }
        // Per-file hashes live in reverse slot order at 0xC0.
        let hash_off = 0xC0 + (EXEFS_SLOTS - 1 - slot) * 0x20;
        let mut hash = [0u8; 0x20];
        hash.copy_from_slice(&header[hash_off..hash_off + 0x20]);
        entries.push(ExefsEntry {
            slot,
            name,
            offset,
            size,
            hash,
        });
    }

    Ok(ExefsModel {
        region_offset,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_partition() -> Vec<u8> {
        // Header (1 MU) + ExeFS region (2 MU: header + data).
        let total = 3 * MEDIA_UNIT as usize;
        let mut bytes = vec![0u8; total];
        bytes[0x100..0x104].copy_from_slice(NCCH_MAGIC);
        bytes[0x104..0x108].copy_from_slice(&3u32.to_le_bytes());
        bytes[0x150..0x15A].copy_from_slice(b"CTR-P-CTAP");
        // ExeFS region: offset 1 MU, size 2 MU.
        bytes[0x1A0..0x1A4].copy_from_slice(&1u32.to_le_bytes());
        bytes[0x1A4..0x1A8].copy_from_slice(&2u32.to_le_bytes());
        // One ExeFS file: "icon", 16 bytes at data offset 0.
        let exefs = MEDIA_UNIT as usize;
        bytes[exefs..exefs + 4].copy_from_slice(b"icon");
        bytes[exefs + 8..exefs + 12].copy_from_slice(&0u32.to_le_bytes());
        bytes[exefs + 12..exefs + 16].copy_from_slice(&16u32.to_le_bytes());
        for (i, b) in (0..16u8).enumerate() {
            bytes[exefs + 0x200 + i] = b;
        }
        bytes
    }

    #[test]
    fn test_parse_minimal_partition() {
        let container = Container::from_bytes(minimal_partition(), "test");
        let model = parse(&container).unwrap();
        assert_eq!(model.header.product_code_string(), "CTR-P-CTAP");
        let exefs = model.exefs.unwrap();
        assert_eq!(exefs.entries.len(), 1);
        assert_eq!(exefs.entries[0].name_string(), "icon");
        assert_eq!(exefs.entries[0].size, 16);
        assert_eq!(exefs.data_offset(&exefs.entries[0]), 0x400);
    }

    #[test]
    fn test_parse_without_exefs() {
        let mut bytes = vec![0u8; MEDIA_UNIT as usize];
        bytes[0x100..0x104].copy_from_slice(NCCH_MAGIC);
        bytes[0x104..0x108].copy_from_slice(&1u32.to_le_bytes());
        let model = parse(&Container::from_bytes(bytes, "test")).unwrap();
        assert!(model.exefs.is_none());
    }

    #[test]
    fn test_reject_bad_magic() {
        let mut bytes = minimal_partition();
        bytes[0x100] = b'X';
        assert!(parse(&Container::from_bytes(bytes, "test")).is_err());
    }

    #[test]
    fn test_reject_size_mismatch() {
        let mut bytes = minimal_partition();
        bytes[0x104..0x108].copy_from_slice(&7u32.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("content size"));
    }

    #[test]
    fn test_reject_exefs_file_outside_region() {
        let mut bytes = minimal_partition();
        let exefs = MEDIA_UNIT as usize;
        // Declare a file bigger than the data area.
        bytes[exefs + 12..exefs + 16].copy_from_slice(&0x1000u32.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(matches!(err, ExplorerError::Bounds { .. }));
    }

    #[test]
    fn test_reject_overlapping_regions() {
        let mut bytes = minimal_partition();
        // RomFS on top of the ExeFS region.
        bytes[0x1B0..0x1B4].copy_from_slice(&1u32.to_le_bytes());
        bytes[0x1B4..0x1B8].copy_from_slice(&1u32.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }
}
