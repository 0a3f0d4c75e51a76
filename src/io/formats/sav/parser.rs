// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Save-image (DISA) parsing and digest validation.
//!
//! # DISA Layout (little-endian)
//!
//! ```text
//! [0x000] AES-CMAC                  (0x10 bytes, treated as opaque)
//! [0x010] Reserved                  (0xF0 bytes)
//! [0x100] Magic "DISA"              (4 bytes)
//! [0x104] Format version            (u32, 0x00040000)
//! [0x108] Partition count           (u64, 1 or 2)
//! [0x110] Secondary table offset    (u64)
//! [0x118] Primary table offset      (u64)
//! [0x120] Partition table size      (u64)
//! [0x128] Save partition descriptor { offset u64, size u64 }
//! [0x138] Data partition descriptor { offset u64, size u64 }
//! [0x148] Save partition region     { offset u64, size u64 }
//! [0x158] Data partition region     { offset u64, size u64 }
//! [0x168] Active table              (u8: 0 primary, 1 secondary)
//! [0x169] Padding                   (7 bytes)
//! [0x170] Active table SHA-256      (0x20 bytes)
//! [0x190] Journal CRC32             (u32, over both table regions)
//! [0x194] Reserved                  (0x6C bytes)
//! ```
//!
//! # Inner SAVE Filesystem (at the save partition region offset)
//!
//! ```text
//! [0x00] Magic "SAVE"          (4 bytes)
//! [0x04] Version               (u32)
//! [0x08] Directory table       { offset u32, count u32 }  (offsets relative to SAVE)
//! [0x10] File table            { offset u32, count u32 }
//! [0x18] Data region offset    (u32)
//! [0x1C] Reserved              (u32)
//! ```
//!
//! Directory entry (0x20): parent u32, name char[16], next sibling u32,
//! first child dir u32, first child file u32. Entry 0 is the root.
//! File entry (0x30): parent u32, name char[16], next sibling u32, data
//! offset u32 (relative to the data region), size u64, reserved (12).
//! Chains terminate with 0xFFFFFFFF.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use sha2::{Digest, Sha256};

use crate::core::{ExplorerError, Result};
use crate::io::container::Container;
use crate::render;

/// DISA magic string, at offset 0x100.
pub const DISA_MAGIC: &[u8; 4] = b"DISA";

/// Inner filesystem magic.
pub const SAVE_MAGIC: &[u8; 4] = b"SAVE";

/// Supported DISA format version.
pub const DISA_VERSION: u32 = 0x0004_0000;

/// DISA header region length.
pub const DISA_HEADER_LEN: u64 = 0x200;

/// SAVE filesystem header length.
pub const SAVE_HEADER_LEN: u64 = 0x20;

/// Directory entry length.
pub const DIR_ENTRY_LEN: u64 = 0x20;

/// File entry length.
pub const FILE_ENTRY_LEN: u64 = 0x30;

/// Chain terminator in directory/file links.
pub const NO_ENTRY: u32 = 0xFFFF_FFFF;

/// An (offset, size) pair in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Absolute byte offset
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

impl Span {
    /// Whether the span is declared at all.
    pub fn is_used(&self) -> bool {
        self.size != 0
    }

    /// Exclusive end offset, or a bounds error on overflow.
    fn end(&self, available: u64) -> Result<u64> {
        self.offset
            .checked_add(self.size)
            .filter(|&end| end <= available)
            .ok_or_else(|| ExplorerError::bounds(self.size, available, self.offset))
    }
}

/// Parsed DISA header.
#[derive(Debug, Clone)]
pub struct DisaHeader {
    /// AES-CMAC over the header (opaque)
    pub cmac: [u8; 0x10],
    /// Format version
    pub version: u32,
    /// Partition count (1 or 2)
    pub partition_count: u64,
    /// Secondary partition table offset
    pub secondary_table_offset: u64,
    /// Primary partition table offset
    pub primary_table_offset: u64,
    /// Partition table size
    pub table_size: u64,
    /// Save partition descriptor
    pub save_desc: Span,
    /// Data partition descriptor
    pub data_desc: Span,
    /// Save partition region
    pub save_region: Span,
    /// Data partition region
    pub data_region: Span,
    /// Which table is active (0 primary, 1 secondary)
    pub active_table: u8,
    /// Padding after the active-table byte
    pub active_padding: [u8; 7],
    /// SHA-256 over the active partition table
    pub table_hash: [u8; 0x20],
    /// CRC32 over both partition table regions
    pub journal_crc: u32,
    /// Reserved tail
    pub reserved: [u8; 0x6C],
}

impl DisaHeader {
    /// Offset of the table the active-table byte selects.
    pub fn active_table_offset(&self) -> u64 {
        if self.active_table == 0 {
            self.primary_table_offset
        } else {
            self.secondary_table_offset
        }
    }
}

/// Parsed SAVE filesystem header.
#[derive(Debug, Clone, Copy)]
pub struct SaveHeader {
    /// Filesystem version
    pub version: u32,
    /// Directory table offset, relative to the SAVE region
    pub dir_table_offset: u32,
    /// Directory count
    pub dir_count: u32,
    /// File table offset, relative to the SAVE region
    pub file_table_offset: u32,
    /// File count
    pub file_count: u32,
    /// Data region offset, relative to the SAVE region
    pub data_offset: u32,
    /// Reserved word
    pub reserved: u32,
}

/// One directory entry.
#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    /// Parent directory index (NO_ENTRY for the root)
    pub parent: u32,
    /// Name bytes
    pub name: [u8; 16],
    /// Next sibling directory index
    pub next_sibling: u32,
    /// First child directory index
    pub first_dir: u32,
    /// First child file index
    pub first_file: u32,
}

impl DirEntry {
    /// Name decoded as text.
    pub fn name_string(&self) -> String {
        render::ascii_text(&self.name)
    }
}

/// One file entry.
#[derive(Debug, Clone, Copy)]
pub struct FileEntry {
    /// Parent directory index
    pub parent: u32,
    /// Name bytes
    pub name: [u8; 16],
    /// Next sibling file index
    pub next_sibling: u32,
    /// Data offset, relative to the data region
    pub data_offset: u32,
    /// File size in bytes
    pub size: u64,
    /// Reserved tail
    pub reserved: [u8; 12],
}

impl FileEntry {
    /// Name decoded as text.
    pub fn name_string(&self) -> String {
        render::ascii_text(&self.name)
    }
}

/// Parsed SAVE filesystem.
#[derive(Debug, Clone)]
pub struct SaveFs {
    /// Filesystem header
    pub header: SaveHeader,
    /// All directory entries
    pub dirs: Vec<DirEntry>,
    /// All file entries
    pub files: Vec<FileEntry>,
    /// Resolved children per directory: (child dirs, child files)
    pub children: Vec<(Vec<u32>, Vec<u32>)>,
}

/// Fully parsed save-image model.
#[derive(Debug, Clone)]
pub struct SaveModel {
    /// The DISA header
    pub disa: DisaHeader,
    /// The inner filesystem
    pub fs: SaveFs,
}

impl SaveModel {
    /// Absolute byte offset of a file's data.
    pub fn file_data_offset(&self, file: &FileEntry) -> u64 {
        self.disa.save_region.offset + self.fs.header.data_offset as u64 + file.data_offset as u64
    }
}

/// Parse and validate a save image.
pub fn parse(container: &Container) -> Result<SaveModel> {
    let bytes = container.bytes();
    if (bytes.len() as u64) < DISA_HEADER_LEN {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            format!(
                "container is {} bytes, DISA header needs {DISA_HEADER_LEN}",
                bytes.len()
            ),
        ));
    }

    let disa = read_disa_header(bytes)?;
    validate_disa(&disa, container)?;
    verify_digests(&disa, container)?;

    let fs = parse_save_fs(&disa, container)?;

    tracing::debug!(
        "Save image parsed: {} directories, {} files",
        fs.dirs.len(),
        fs.files.len()
    );

    Ok(SaveModel { disa, fs })
}

fn read_disa_header(bytes: &[u8]) -> Result<DisaHeader> {
    let mut cursor = Cursor::new(bytes);

    let mut cmac = [0u8; 0x10];
    cursor.read_exact(&mut cmac)?;

    cursor.seek(SeekFrom::Start(0x100))?;
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != DISA_MAGIC {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            format!("invalid magic: {:?}", String::from_utf8_lossy(&magic)),
        ));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != DISA_VERSION {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            format!("unsupported version 0x{version:08X}"),
        ));
    }

    let partition_count = cursor.read_u64::<LittleEndian>()?;
    let secondary_table_offset = cursor.read_u64::<LittleEndian>()?;
    let primary_table_offset = cursor.read_u64::<LittleEndian>()?;
    let table_size = cursor.read_u64::<LittleEndian>()?;
    let save_desc = read_span(&mut cursor)?;
    let data_desc = read_span(&mut cursor)?;
    let save_region = read_span(&mut cursor)?;
    let data_region = read_span(&mut cursor)?;
    let active_table = cursor.read_u8()?;
    let mut active_padding = [0u8; 7];
    cursor.read_exact(&mut active_padding)?;
    let mut table_hash = [0u8; 0x20];
    cursor.read_exact(&mut table_hash)?;
    let journal_crc = cursor.read_u32::<LittleEndian>()?;
    let mut reserved = [0u8; 0x6C];
    cursor.read_exact(&mut reserved)?;

    Ok(DisaHeader {
        cmac,
        version,
        partition_count,
        secondary_table_offset,
        primary_table_offset,
        table_size,
        save_desc,
        data_desc,
        save_region,
        data_region,
        active_table,
        active_padding,
        table_hash,
        journal_crc,
        reserved,
    })
}

fn read_span(cursor: &mut Cursor<&[u8]>) -> Result<Span> {
    Ok(Span {
        offset: cursor.read_u64::<LittleEndian>()?,
        size: cursor.read_u64::<LittleEndian>()?,
    })
}

fn validate_disa(disa: &DisaHeader, container: &Container) -> Result<()> {
    if !(1..=2).contains(&disa.partition_count) {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            format!("partition count {} (expected 1 or 2)", disa.partition_count),
        ));
    }
    if disa.active_table > 1 {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            format!("active table selector {}", disa.active_table),
        ));
    }
    if disa.table_size == 0 {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            "partition table size is zero",
        ));
    }

    let len = container.len();
    let mut spans = vec![
        (
            "primary table",
            Span {
                offset: disa.primary_table_offset,
                size: disa.table_size,
            },
        ),
        (
            "secondary table",
            Span {
                offset: disa.secondary_table_offset,
                size: disa.table_size,
            },
        ),
        ("save region", disa.save_region),
    ];
    if disa.data_region.is_used() {
        spans.push(("data region", disa.data_region));
    }

    for (name, span) in &spans {
        if span.offset < DISA_HEADER_LEN {
            return Err(ExplorerError::malformed(
                "DisaHeader",
                format!("{name} overlaps the DISA header"),
            ));
        }
        span.end(len)?;
    }

    spans.sort_by_key(|&(_, span)| span.offset);
    for pair in spans.windows(2) {
        let (a, a_span) = pair[0];
        let (b, b_span) = pair[1];
        if b_span.offset < a_span.offset + a_span.size {
            return Err(ExplorerError::malformed(
                "DisaHeader",
                format!("{a} and {b} overlap"),
            ));
        }
    }

    if !disa.save_region.is_used() {
        return Err(ExplorerError::malformed(
            "DisaHeader",
            "save partition region is empty",
        ));
    }

    Ok(())
}

fn verify_digests(disa: &DisaHeader, container: &Container) -> Result<()> {
    let active = container.slice(disa.active_table_offset(), disa.table_size)?;
    let computed: [u8; 0x20] = Sha256::digest(active).into();
    if computed != disa.table_hash {
        return Err(ExplorerError::checksum_mismatch(
            "DISA active partition table",
            hex::encode_upper(disa.table_hash),
            hex::encode_upper(computed),
        ));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(container.slice(disa.primary_table_offset, disa.table_size)?);
    hasher.update(container.slice(disa.secondary_table_offset, disa.table_size)?);
    let crc = hasher.finalize();
    if crc != disa.journal_crc {
        return Err(ExplorerError::checksum_mismatch(
            "save journal",
            format!("{:08X}", disa.journal_crc),
            format!("{crc:08X}"),
        ));
    }

    Ok(())
}

fn parse_save_fs(disa: &DisaHeader, container: &Container) -> Result<SaveFs> {
    let region = disa.save_region;
    if region.size < SAVE_HEADER_LEN {
        return Err(ExplorerError::malformed(
            "SaveFs",
            format!("save region is {} bytes, SAVE header needs {SAVE_HEADER_LEN}", region.size),
        ));
    }

    let save = container.slice(region.offset, region.size)?;
    let mut cursor = Cursor::new(save);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != SAVE_MAGIC {
        return Err(ExplorerError::malformed(
            "SaveFs",
            format!("invalid magic: {:?}", String::from_utf8_lossy(&magic)),
        ));
    }

    let header = SaveHeader {
        version: cursor.read_u32::<LittleEndian>()?,
        dir_table_offset: cursor.read_u32::<LittleEndian>()?,
        dir_count: cursor.read_u32::<LittleEndian>()?,
        file_table_offset: cursor.read_u32::<LittleEndian>()?,
        file_count: cursor.read_u32::<LittleEndian>()?,
        data_offset: cursor.read_u32::<LittleEndian>()?,
        reserved: cursor.read_u32::<LittleEndian>()?,
    };

    if header.dir_count == 0 {
        return Err(ExplorerError::malformed("SaveFs", "directory table is empty"));
    }

    let dir_end = header.dir_table_offset as u64 + header.dir_count as u64 * DIR_ENTRY_LEN;
    let file_end = header.file_table_offset as u64 + header.file_count as u64 * FILE_ENTRY_LEN;
    for (what, end) in [("directory table", dir_end), ("file table", file_end)] {
        if end > region.size {
            return Err(ExplorerError::malformed(
                "SaveFs",
                format!("{what} ends at {end}, save region is {} bytes", region.size),
            ));
        }
    }
    if header.data_offset as u64 > region.size {
        return Err(ExplorerError::malformed(
            "SaveFs",
            format!(
                "data region offset {} outside save region of {} bytes",
                header.data_offset, region.size
            ),
        ));
    }

    let mut dirs = Vec::with_capacity(header.dir_count as usize);
    let mut cursor = Cursor::new(&save[header.dir_table_offset as usize..]);
    for _ in 0..header.dir_count {
        let parent = cursor.read_u32::<LittleEndian>()?;
        let mut name = [0u8; 16];
        cursor.read_exact(&mut name)?;
        let next_sibling = cursor.read_u32::<LittleEndian>()?;
        let first_dir = cursor.read_u32::<LittleEndian>()?;
        let first_file = cursor.read_u32::<LittleEndian>()?;
        dirs.push(DirEntry {
            parent,
            name,
            next_sibling,
            first_dir,
            first_file,
        });
    }

    let mut files = Vec::with_capacity(header.file_count as usize);
    let mut cursor = Cursor::new(&save[header.file_table_offset as usize..]);
    for _ in 0..header.file_count {
        let parent = cursor.read_u32::<LittleEndian>()?;
        let mut name = [0u8; 16];
        cursor.read_exact(&mut name)?;
        let next_sibling = cursor.read_u32::<LittleEndian>()?;
        let data_offset = cursor.read_u32::<LittleEndian>()?;
        let size = cursor.read_u64::<LittleEndian>()?;
        let mut reserved = [0u8; 12];
        cursor.read_exact(&mut reserved)?;
        files.push(FileEntry {
            parent,
            name,
            next_sibling,
            data_offset,
            size,
            reserved,
        });
    }

    for (i, file) in files.iter().enumerate() {
        let end = header.data_offset as u64 + file.data_offset as u64 + file.size;
        if end > region.size {
            return Err(ExplorerError::malformed(
                "SaveFs",
                format!("file {i} data ends at {end}, save region is {} bytes", region.size),
            ));
        }
    }

    let children = resolve_children(&dirs, &files)?;

    Ok(SaveFs {
        header,
        dirs,
        files,
        children,
    })
}

/// Walk the sibling chains once, validating indices and rejecting cycles.
fn resolve_children(dirs: &[DirEntry], files: &[FileEntry]) -> Result<Vec<(Vec<u32>, Vec<u32>)>> {
    let mut children = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let mut child_dirs = Vec::new();
        let mut next = dir.first_dir;
        while next != NO_ENTRY {
            if next == 0 || next as usize >= dirs.len() {
                return Err(ExplorerError::malformed(
                    "SaveFs",
                    format!("directory chain references entry {next}"),
                ));
            }
            child_dirs.push(next);
            if child_dirs.len() > dirs.len() {
                return Err(ExplorerError::malformed("SaveFs", "directory chain cycle"));
            }
            next = dirs[next as usize].next_sibling;
        }

        let mut child_files = Vec::new();
        let mut next = dir.first_file;
        while next != NO_ENTRY {
            if next as usize >= files.len() {
                return Err(ExplorerError::malformed(
                    "SaveFs",
                    format!("file chain references entry {next}"),
                ));
            }
            child_files.push(next);
            if child_files.len() > files.len() {
                return Err(ExplorerError::malformed("SaveFs", "file chain cycle"));
            }
            next = files[next as usize].next_sibling;
        }

        children.push((child_dirs, child_files));
    }
    Ok(children)
}

/// Test helper: assemble a valid save image holding `files` under the
/// root directory, digests included.
#[cfg(test)]
pub(crate) fn build_save(files: &[(&str, &[u8])]) -> Vec<u8> {
    const TABLE_SIZE: u64 = 0x40;
    let primary_off = DISA_HEADER_LEN;
    let secondary_off = primary_off + TABLE_SIZE;
    let save_off = secondary_off + TABLE_SIZE;

    let data_offset = SAVE_HEADER_LEN + DIR_ENTRY_LEN + files.len() as u64 * FILE_ENTRY_LEN;
    let data_len: u64 = files.iter().map(|(_, d)| d.len() as u64).sum();
    let save_size = data_offset + data_len;

    let mut out = vec![0u8; (save_off + save_size) as usize];

    // Partition tables: arbitrary journal bytes, hashed below.
    for b in &mut out[primary_off as usize..(primary_off + TABLE_SIZE) as usize] {
        *b = 0xAA;
    }
    for b in &mut out[secondary_off as usize..(secondary_off + TABLE_SIZE) as usize] {
        *b = 0xBB;
    }

    // DISA header.
    out[0x100..0x104].copy_from_slice(DISA_MAGIC);
    out[0x104..0x108].copy_from_slice(&DISA_VERSION.to_le_bytes());
    out[0x108..0x110].copy_from_slice(&1u64.to_le_bytes());
    out[0x110..0x118].copy_from_slice(&secondary_off.to_le_bytes());
    out[0x118..0x120].copy_from_slice(&primary_off.to_le_bytes());
    out[0x120..0x128].copy_from_slice(&TABLE_SIZE.to_le_bytes());
    out[0x148..0x150].copy_from_slice(&save_off.to_le_bytes());
    out[0x150..0x158].copy_from_slice(&save_size.to_le_bytes());

    let digest: [u8; 0x20] =
        Sha256::digest(&out[primary_off as usize..(primary_off + TABLE_SIZE) as usize]).into();
    out[0x170..0x190].copy_from_slice(&digest);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&out[primary_off as usize..(primary_off + TABLE_SIZE) as usize]);
    hasher.update(&out[secondary_off as usize..(secondary_off + TABLE_SIZE) as usize]);
    out[0x190..0x194].copy_from_slice(&hasher.finalize().to_le_bytes());

    // SAVE header.
    let base = save_off as usize;
    out[base..base + 4].copy_from_slice(SAVE_MAGIC);
    out[base + 4..base + 8].copy_from_slice(&1u32.to_le_bytes());
    out[base + 8..base + 12].copy_from_slice(&(SAVE_HEADER_LEN as u32).to_le_bytes());
    out[base + 12..base + 16].copy_from_slice(&1u32.to_le_bytes());
    out[base + 16..base + 20]
        .copy_from_slice(&((SAVE_HEADER_LEN + DIR_ENTRY_LEN) as u32).to_le_bytes());
    out[base + 20..base + 24].copy_from_slice(&(files.len() as u32).to_le_bytes());
    out[base + 24..base + 28].copy_from_slice(&(data_offset as u32).to_le_bytes());

    // Root directory.
    let root = base + SAVE_HEADER_LEN as usize;
    out[root..root + 4].copy_from_slice(&NO_ENTRY.to_le_bytes());
    out[root + 4..root + 8].copy_from_slice(b"ROOT");
    out[root + 20..root + 24].copy_from_slice(&NO_ENTRY.to_le_bytes());
    out[root + 24..root + 28].copy_from_slice(&NO_ENTRY.to_le_bytes());
    let first_file = if files.is_empty() { NO_ENTRY } else { 0 };
    out[root + 28..root + 32].copy_from_slice(&first_file.to_le_bytes());

    // File entries and data.
    let mut cursor = 0u32;
    for (i, (name, data)) in files.iter().enumerate() {
        let entry = base + (SAVE_HEADER_LEN + DIR_ENTRY_LEN) as usize + i * FILE_ENTRY_LEN as usize;
        out[entry..entry + 4].copy_from_slice(&0u32.to_le_bytes());
        let name_bytes = name.as_bytes();
        out[entry + 4..entry + 4 + name_bytes.len()].copy_from_slice(name_bytes);
        let next = if i + 1 < files.len() {
            (i + 1) as u32
        } else {
            NO_ENTRY
        };
        out[entry + 20..entry + 24].copy_from_slice(&next.to_le_bytes());
        out[entry + 24..entry + 28].copy_from_slice(&cursor.to_le_bytes());
        out[entry + 28..entry + 36].copy_from_slice(&(data.len() as u64).to_le_bytes());

        let data_start = base + data_offset as usize + cursor as usize;
        out[data_start..data_start + data.len()].copy_from_slice(data);
        cursor += data.len() as u32;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_save() {
        let bytes = build_save(&[("game.dat", b"progress"), ("config", b"cfg")]);
        let model = parse(&Container::from_bytes(bytes, "test")).unwrap();
        assert_eq!(model.disa.partition_count, 1);
        assert_eq!(model.fs.dirs.len(), 1);
        assert_eq!(model.fs.files.len(), 2);
        assert_eq!(model.fs.dirs[0].name_string(), "ROOT");
        assert_eq!(model.fs.children[0].1, vec![0, 1]);
        assert_eq!(model.fs.files[0].name_string(), "game.dat");
        assert_eq!(model.fs.files[1].size, 3);
    }

    #[test]
    fn test_parse_empty_save() {
        let bytes = build_save(&[]);
        let model = parse(&Container::from_bytes(bytes, "test")).unwrap();
        assert!(model.fs.files.is_empty());
        assert_eq!(model.fs.children[0].1.len(), 0);
    }

    #[test]
    fn test_reject_bad_magic() {
        let mut bytes = build_save(&[]);
        bytes[0x100] = b'X';
        assert!(parse(&Container::from_bytes(bytes, "test")).is_err());
    }

    #[test]
    fn test_reject_corrupt_table_hash() {
        let mut bytes = build_save(&[("f", b"x")]);
        // Corrupt one byte of the primary (active) table.
        bytes[DISA_HEADER_LEN as usize] ^= 1;
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(matches!(err, ExplorerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_reject_corrupt_journal_crc() {
        let mut bytes = build_save(&[("f", b"x")]);
        // Corrupt the secondary table: the SHA-256 (over the primary)
        // still matches, the journal CRC does not.
        bytes[(DISA_HEADER_LEN + 0x40) as usize] ^= 1;
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        match err {
            ExplorerError::ChecksumMismatch { region, .. } => {
                assert_eq!(region, "save journal")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reject_file_chain_cycle() {
        let mut bytes = build_save(&[("a", b"1"), ("b", b"2")]);
        // Point file 1's next-sibling back at file 0.
        let save_off = (DISA_HEADER_LEN + 0x80) as usize;
        let entry1 = save_off + (SAVE_HEADER_LEN + DIR_ENTRY_LEN + FILE_ENTRY_LEN) as usize;
        bytes[entry1 + 20..entry1 + 24].copy_from_slice(&0u32.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_reject_file_outside_region() {
        let mut bytes = build_save(&[("a", b"1234")]);
        let save_off = (DISA_HEADER_LEN + 0x80) as usize;
        let entry0 = save_off + (SAVE_HEADER_LEN + DIR_ENTRY_LEN) as usize;
        bytes[entry0 + 28..entry0 + 36].copy_from_slice(&0x10000u64.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("data ends"));
    }

    #[test]
    fn test_reject_overlapping_regions() {
        let mut bytes = build_save(&[]);
        // Secondary table on top of the primary.
        bytes[0x110..0x118].copy_from_slice(&DISA_HEADER_LEN.to_le_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }
}
