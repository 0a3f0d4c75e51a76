// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format detection using fixed-offset signatures.
//!
//! Each supported format publishes its signature offset and pattern; the
//! sniffer reads only those bytes and performs no heuristic scanning.
//! Truncated or unrecognized input yields [`FormatKind::Unsupported`],
//! never an error, so "format not recognized" stays distinct from
//! "malformed container".
//!
//! # Signatures
//!
//! - **NCSD**: `"NCSD"` at offset 0x100
//! - **NCCH**: `"NCCH"` at offset 0x100
//! - **Save image**: `"DISA"` at offset 0x100
//! - **CIA**: little-endian u32 at offset 0 equal to 0x2020 (header size)
//! - **TMD**: big-endian u32 at offset 0 naming a known signature type
//!
//! The 0x100-offset magics are checked first: CIA and TMD have no magic
//! string, so their leading-word predicates only apply once the magic
//! checks have not claimed the input.

use std::io::{Read, Seek, SeekFrom};

use crate::core::{FormatKind, Result};

/// Offset of the NCSD/NCCH/DISA magic strings.
const MAGIC_OFFSET: usize = 0x100;

/// Bytes the sniffer needs to see every signature offset.
const SNIFF_LEN: usize = MAGIC_OFFSET + 4;

/// CIA archive header size, doubling as its detection word.
pub const CIA_HEADER_SIZE: u32 = 0x2020;

/// TMD signature types (big-endian leading word).
pub const TMD_SIG_TYPES: [u32; 3] = [0x0001_0003, 0x0001_0004, 0x0001_0005];

/// Detect the format of a byte slice.
///
/// Pure and total: deterministic for the same bytes, and short input is
/// simply `Unsupported`.
pub fn sniff_bytes(bytes: &[u8]) -> FormatKind {
    if has_magic(bytes, b"NCSD") {
        return FormatKind::RomCard;
    }
    if has_magic(bytes, b"NCCH") {
        return FormatKind::Ncch;
    }
    if has_magic(bytes, b"DISA") {
        return FormatKind::SaveFlash;
    }
    if is_cia_word(bytes) {
        return FormatKind::Cia;
    }
    if is_tmd_word(bytes) {
        return FormatKind::TitleMeta;
    }
    FormatKind::Unsupported
}

/// Detect the format of a readable, seekable source.
///
/// Reads only the fixed signature region and rewinds the source to
/// position zero before returning, so a subsequent full read starts
/// clean. I/O failures propagate; truncation does not.
pub fn sniff_format<R: Read + Seek>(source: &mut R) -> Result<FormatKind> {
    source.seek(SeekFrom::Start(0))?;

    let mut header = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < header.len() {
        let n = source.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    let kind = sniff_bytes(&header[..filled]);
    source.seek(SeekFrom::Start(0))?;
    Ok(kind)
}

fn has_magic(bytes: &[u8], magic: &[u8; 4]) -> bool {
    bytes.len() >= MAGIC_OFFSET + 4 && &bytes[MAGIC_OFFSET..MAGIC_OFFSET + 4] == magic
}

fn is_cia_word(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == CIA_HEADER_SIZE
}

fn is_tmd_word(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    TMD_SIG_TYPES.contains(&word)
}
