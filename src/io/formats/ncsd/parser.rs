// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NCSD header parsing and structural validation.
//!
//! # NCSD Layout (little-endian, media unit = 0x200 bytes)
//!
//! ```text
//! [0x000] RSA-2048 signature        (0x100 bytes, not verified)
//! [0x100] Magic "NCSD"              (4 bytes)
//! [0x104] Image size                (u32, media units; must equal file size)
//! [0x108] Media ID                  (u64)
//! [0x110] Partition FS types        (8 bytes, one per slot)
//! [0x118] Partition crypt types     (8 bytes, one per slot)
//! [0x120] Partition table           (8 x { offset u32, length u32 }, media units)
//! [0x160] Exheader SHA-256          (0x20 bytes)
//! [0x180] Additional header size    (u32)
//! [0x184] Sector zero offset        (u32)
//! [0x188] Partition flags           (8 bytes)
//! [0x190] Partition ID table        (8 x u64)
//! [0x1D0] Reserved                  (0x30 bytes)
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ExplorerError, Result};
use crate::io::container::Container;

/// Media unit size in bytes.
pub const MEDIA_UNIT: u64 = 0x200;

/// NCSD magic string.
pub const NCSD_MAGIC: &[u8; 4] = b"NCSD";

/// NCSD header length.
pub const HEADER_LEN: usize = 0x200;

/// Number of partition slots.
pub const PARTITION_SLOTS: usize = 8;

/// One partition-table entry, in media units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionEntry {
    /// Partition offset in media units
    pub offset_mu: u32,
    /// Partition length in media units
    pub length_mu: u32,
}

impl PartitionEntry {
    /// Byte offset within the image.
    pub fn byte_offset(&self) -> u64 {
        self.offset_mu as u64 * MEDIA_UNIT
    }

    /// Byte length.
    pub fn byte_len(&self) -> u64 {
        self.length_mu as u64 * MEDIA_UNIT
    }

    /// Whether this slot holds a partition.
    pub fn is_used(&self) -> bool {
        self.length_mu != 0
    }
}

/// Parsed NCSD header.
#[derive(Debug, Clone)]
pub struct NcsdHeader {
    /// RSA signature over the header (opaque)
    pub signature: [u8; 0x100],
    /// Image size in media units
    pub image_size_mu: u32,
    /// Media ID
    pub media_id: u64,
    /// Filesystem type per partition slot
    pub fs_types: [u8; 8],
    /// Crypt type per partition slot
    pub crypt_types: [u8; 8],
    /// Partition table
    pub partitions: [PartitionEntry; PARTITION_SLOTS],
    /// Exheader SHA-256 (opaque)
    pub exheader_hash: [u8; 0x20],
    /// Additional header size
    pub additional_header_size: u32,
    /// Sector zero offset
    pub sector_zero_offset: u32,
    /// Partition flags
    pub partition_flags: [u8; 8],
    /// Partition ID per slot
    pub partition_ids: [u64; PARTITION_SLOTS],
    /// Reserved tail of the header
    pub reserved: [u8; 0x30],
}

impl NcsdHeader {
    /// Indices of used partition slots, in table order.
    pub fn used_partitions(&self) -> Vec<usize> {
        (0..PARTITION_SLOTS)
            .filter(|&i| self.partitions[i].is_used())
            .collect()
    }
}

/// Fully parsed NCSD model.
#[derive(Debug, Clone)]
pub struct NcsdModel {
    /// The image header
    pub header: NcsdHeader,
}

/// Parse and validate an NCSD image.
pub fn parse(container: &Container) -> Result<NcsdModel> {
    let bytes = container.bytes();
    if bytes.len() < HEADER_LEN {
        return Err(ExplorerError::malformed(
            "NcsdHeader",
            format!(
                "container is {} bytes, NCSD header needs {HEADER_LEN}",
                bytes.len()
            ),
        ));
    }

    let mut cursor = Cursor::new(bytes);

    let mut signature = [0u8; 0x100];
    cursor.read_exact(&mut signature)?;

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != NCSD_MAGIC {
        return Err(ExplorerError::malformed(
            "NcsdHeader",
            format!("invalid magic: {:?}", String::from_utf8_lossy(&magic)),
        ));
    }

    let image_size_mu = cursor.read_u32::<LittleEndian>()?;
    let media_id = cursor.read_u64::<LittleEndian>()?;

    let mut fs_types = [0u8; 8];
    cursor.read_exact(&mut fs_types)?;
    let mut crypt_types = [0u8; 8];
    cursor.read_exact(&mut crypt_types)?;

    let mut partitions = [PartitionEntry::default(); PARTITION_SLOTS];
    for slot in partitions.iter_mut() {
        slot.offset_mu = cursor.read_u32::<LittleEndian>()?;
        slot.length_mu = cursor.read_u32::<LittleEndian>()?;
    }

    let mut exheader_hash = [0u8; 0x20];
    cursor.read_exact(&mut exheader_hash)?;
    let additional_header_size = cursor.read_u32::<LittleEndian>()?;
    let sector_zero_offset = cursor.read_u32::<LittleEndian>()?;
    let mut partition_flags = [0u8; 8];
    cursor.read_exact(&mut partition_flags)?;

    let mut partition_ids = [0u64; PARTITION_SLOTS];
    for id in partition_ids.iter_mut() {
        *id = cursor.read_u64::<LittleEndian>()?;
    }

    let mut reserved = [0u8; 0x30];
    cursor.read_exact(&mut reserved)?;

    let header = NcsdHeader {
        signature,
        image_size_mu,
        media_id,
        fs_types,
        crypt_types,
        partitions,
        exheader_hash,
        additional_header_size,
        sector_zero_offset,
        partition_flags,
        partition_ids,
        reserved,
    };

    validate(&header, container)?;

    tracing::debug!(
        "NCSD image parsed: media id {:016X}, {} partitions",
        media_id,
        header.used_partitions().len()
    );

    Ok(NcsdModel { header })
}

/// Structural validation: declared size matches, partitions stay in
/// bounds and never overlap.
fn validate(header: &NcsdHeader, container: &Container) -> Result<()> {
    let declared = header.image_size_mu as u64 * MEDIA_UNIT;
    if declared != container.len() {
        return Err(ExplorerError::malformed(
            "NcsdHeader",
            format!(
                "declared image size {declared} does not match container size {}",
                container.len()
            ),
        ));
    }

    if !header.partitions[0].is_used() {
        return Err(ExplorerError::malformed(
            "NcsdHeader",
            "partition 0 is empty",
        ));
    }

    let mut spans: Vec<(usize, u64, u64)> = Vec::new();
    for (i, entry) in header.partitions.iter().enumerate() {
        if !entry.is_used() {
            continue;
        }
        let start = entry.byte_offset();
        let len = entry.byte_len();
        if start < HEADER_LEN as u64 {
            return Err(ExplorerError::malformed(
                "NcsdHeader",
                format!("partition {i} overlaps the NCSD header"),
            ));
        }
        let end = start
            .checked_add(len)
            .ok_or_else(|| ExplorerError::bounds(len, container.len(), start))?;
        if end > container.len() {
            return Err(ExplorerError::bounds(len, container.len(), start));
        }
        spans.push((i, start, end));
    }

    spans.sort_by_key(|&(_, start, _)| start);
    for pair in spans.windows(2) {
        let (a, _, a_end) = pair[0];
        let (b, b_start, _) = pair[1];
        if b_start < a_end {
            return Err(ExplorerError::malformed(
                "NcsdHeader",
                format!("partitions {a} and {b} overlap"),
            ));
        }
    }

    Ok(())
}
