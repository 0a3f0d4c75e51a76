// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared fixtures for integration tests: synthetic container builders
//! and temp-file helpers.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use ctrscope::{FieldRecord, FieldSurface};

/// Media unit size shared by NCSD and NCCH.
pub const MEDIA_UNIT: usize = 0x200;

/// Chain terminator in SAVE directory/file links.
const NO_ENTRY: u32 = 0xFFFF_FFFF;

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

// ============================================================================
// Container Builders
// ============================================================================

/// Build an NCCH partition with the given product code and ExeFS files.
pub fn build_ncch(product_code: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    assert!(files.len() <= 10, "ExeFS has ten slots");

    let data_len: usize = files.iter().map(|(_, d)| d.len()).sum();
    let exefs_len = if files.is_empty() {
        0
    } else {
        round_up(0x200 + data_len, MEDIA_UNIT)
    };
    let total = MEDIA_UNIT + exefs_len;

    let mut bytes = vec![0u8; total];
    bytes[0x100..0x104].copy_from_slice(b"NCCH");
    bytes[0x104..0x108].copy_from_slice(&((total / MEDIA_UNIT) as u32).to_le_bytes());
    bytes[0x108..0x110].copy_from_slice(&0x000400000FF3FF00u64.to_le_bytes());
    let code = product_code.as_bytes();
    assert!(code.len() <= 0x10);
    bytes[0x150..0x150 + code.len()].copy_from_slice(code);

    if !files.is_empty() {
        bytes[0x1A0..0x1A4].copy_from_slice(&1u32.to_le_bytes());
        bytes[0x1A4..0x1A8].copy_from_slice(&((exefs_len / MEDIA_UNIT) as u32).to_le_bytes());

        let exefs = MEDIA_UNIT;
        let mut cursor = 0u32;
        for (i, (name, data)) in files.iter().enumerate() {
            let entry = exefs + i * 0x10;
            let name_bytes = name.as_bytes();
            assert!(!name_bytes.is_empty() && name_bytes.len() <= 8);
            bytes[entry..entry + name_bytes.len()].copy_from_slice(name_bytes);
            bytes[entry + 8..entry + 12].copy_from_slice(&cursor.to_le_bytes());
            bytes[entry + 12..entry + 16].copy_from_slice(&(data.len() as u32).to_le_bytes());

            let data_start = exefs + 0x200 + cursor as usize;
            bytes[data_start..data_start + data.len()].copy_from_slice(data);
            cursor += data.len() as u32;
        }
    }

    bytes
}

/// Build an NCSD ROM card image holding the given partition images.
///
/// Each partition must be a whole number of media units (the NCCH
/// builder's output always is).
pub fn build_ncsd(partitions: &[&[u8]]) -> Vec<u8> {
    assert!(!partitions.is_empty() && partitions.len() <= 8);

    let total = MEDIA_UNIT + partitions.iter().map(|p| p.len()).sum::<usize>();
    let mut bytes = vec![0u8; MEDIA_UNIT];
    bytes[0x100..0x104].copy_from_slice(b"NCSD");
    bytes[0x104..0x108].copy_from_slice(&((total / MEDIA_UNIT) as u32).to_le_bytes());
    bytes[0x108..0x110].copy_from_slice(&0x00040000000CD700u64.to_le_bytes());

    let mut cursor = MEDIA_UNIT;
    for (i, partition) in partitions.iter().enumerate() {
        assert_eq!(partition.len() % MEDIA_UNIT, 0);
        let entry = 0x120 + i * 8;
        bytes[entry..entry + 4].copy_from_slice(&((cursor / MEDIA_UNIT) as u32).to_le_bytes());
        bytes[entry + 4..entry + 8]
            .copy_from_slice(&((partition.len() / MEDIA_UNIT) as u32).to_le_bytes());
        cursor += partition.len();
    }

    for partition in partitions {
        bytes.extend_from_slice(partition);
    }
    assert_eq!(bytes.len(), total);
    bytes
}

/// Build a CIA archive from raw section bytes.
pub fn build_cia(
    cert: &[u8],
    ticket: &[u8],
    tmd: &[u8],
    content: &[u8],
    meta: &[u8],
) -> Vec<u8> {
    const HEADER_LEN: usize = 0x2020;
    let mut bytes = vec![0u8; HEADER_LEN];
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
        let aligned = round_up(bytes.len(), 0x40);
        bytes.resize(aligned, 0);
        bytes.extend_from_slice(section);
    }
    bytes
}

/// Build a TMD (RSA-2048 signature slot) with a correct digest chain.
pub fn build_tmd(chunks: &[(u32, u16, u16, u64)]) -> Vec<u8> {
    const INFO_REGION_LEN: usize = 64 * 0x24;
    const HEADER_BODY_LEN: usize = 0xC4;

    let mut chunk_buf = Vec::new();
    for (i, &(id, index, ctype, size)) in chunks.iter().enumerate() {
        chunk_buf.extend_from_slice(&id.to_be_bytes());
        chunk_buf.extend_from_slice(&index.to_be_bytes());
        chunk_buf.extend_from_slice(&ctype.to_be_bytes());
        chunk_buf.extend_from_slice(&size.to_be_bytes());
        chunk_buf.extend_from_slice(&[i as u8; 0x20]);
    }

    let mut info_buf = vec![0u8; INFO_REGION_LEN];
    if !chunks.is_empty() {
        info_buf[2..4].copy_from_slice(&(chunks.len() as u16).to_be_bytes());
        let digest: [u8; 0x20] = Sha256::digest(&chunk_buf).into();
        info_buf[4..0x24].copy_from_slice(&digest);
    }
    let info_hash: [u8; 0x20] = Sha256::digest(&info_buf).into();

    let mut header = vec![0u8; HEADER_BODY_LEN];
    let issuer = b"Root-CA00000003-CP0000000b";
    header[..issuer.len()].copy_from_slice(issuer);
    header[0x4C..0x54].copy_from_slice(&0x0004000000030700u64.to_be_bytes());
    header[0x9C..0x9E].copy_from_slice(&1u16.to_be_bytes());
    header[0x9E..0xA0].copy_from_slice(&(chunks.len() as u16).to_be_bytes());
    header[0xA4..0xC4].copy_from_slice(&info_hash);

    let mut out = Vec::new();
    out.extend_from_slice(&0x00010004u32.to_be_bytes());
    out.extend_from_slice(&[0u8; 0x100]);
    out.extend_from_slice(&[0u8; 0x3C]);
    out.extend_from_slice(&header);
    out.extend_from_slice(&info_buf);
    out.extend_from_slice(&chunk_buf);
    out
}

/// Build a save image holding `files` under the root directory, with
/// valid table digests.
pub fn build_save(files: &[(&str, &[u8])]) -> Vec<u8> {
    const TABLE_SIZE: usize = 0x40;
    const DISA_HEADER_LEN: usize = 0x200;
    const SAVE_HEADER_LEN: usize = 0x20;
    const DIR_ENTRY_LEN: usize = 0x20;
    const FILE_ENTRY_LEN: usize = 0x30;

    let primary_off = DISA_HEADER_LEN;
    let secondary_off = primary_off + TABLE_SIZE;
    let save_off = secondary_off + TABLE_SIZE;

    let data_offset = SAVE_HEADER_LEN + DIR_ENTRY_LEN + files.len() * FILE_ENTRY_LEN;
    let data_len: usize = files.iter().map(|(_, d)| d.len()).sum();
    let save_size = data_offset + data_len;

    let mut out = vec![0u8; save_off + save_size];

    for b in &mut out[primary_off..primary_off + TABLE_SIZE] {
        *b = 0xAA;
    }
    for b in &mut out[secondary_off..secondary_off + TABLE_SIZE] {
        *b = 0xBB;
    }

    out[0x100..0x104].copy_from_slice(b"DISA");
    out[0x104..0x108].copy_from_slice(&0x00040000u32.to_le_bytes());
    out[0x108..0x110].copy_from_slice(&1u64.to_le_bytes());
    out[0x110..0x118].copy_from_slice(&(secondary_off as u64).to_le_bytes());
    out[0x118..0x120].copy_from_slice(&(primary_off as u64).to_le_bytes());
    out[0x120..0x128].copy_from_slice(&(TABLE_SIZE as u64).to_le_bytes());
    out[0x148..0x150].copy_from_slice(&(save_off as u64).to_le_bytes());
    out[0x150..0x158].copy_from_slice(&(save_size as u64).to_le_bytes());

    let digest: [u8; 0x20] = Sha256::digest(&out[primary_off..primary_off + TABLE_SIZE]).into();
    out[0x170..0x190].copy_from_slice(&digest);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&out[primary_off..primary_off + TABLE_SIZE]);
    hasher.update(&out[secondary_off..secondary_off + TABLE_SIZE]);
    out[0x190..0x194].copy_from_slice(&hasher.finalize().to_le_bytes());

    let base = save_off;
    out[base..base + 4].copy_from_slice(b"SAVE");
    out[base + 4..base + 8].copy_from_slice(&1u32.to_le_bytes());
    out[base + 8..base + 12].copy_from_slice(&(SAVE_HEADER_LEN as u32).to_le_bytes());
    out[base + 12..base + 16].copy_from_slice(&1u32.to_le_bytes());
    out[base + 16..base + 20]
        .copy_from_slice(&((SAVE_HEADER_LEN + DIR_ENTRY_LEN) as u32).to_le_bytes());
    out[base + 20..base + 24].copy_from_slice(&(files.len() as u32).to_le_bytes());
    out[base + 24..base + 28].copy_from_slice(&(data_offset as u32).to_le_bytes());

    let root = base + SAVE_HEADER_LEN;
    out[root..root + 4].copy_from_slice(&NO_ENTRY.to_le_bytes());
    out[root + 4..root + 8].copy_from_slice(b"ROOT");
    out[root + 20..root + 24].copy_from_slice(&NO_ENTRY.to_le_bytes());
    out[root + 24..root + 28].copy_from_slice(&NO_ENTRY.to_le_bytes());
    let first_file = if files.is_empty() { NO_ENTRY } else { 0 };
    out[root + 28..root + 32].copy_from_slice(&first_file.to_le_bytes());

    let mut cursor = 0u32;
    for (i, (name, data)) in files.iter().enumerate() {
        let entry = base + SAVE_HEADER_LEN + DIR_ENTRY_LEN + i * FILE_ENTRY_LEN;
        let name_bytes = name.as_bytes();
        assert!(!name_bytes.is_empty() && name_bytes.len() <= 16);
        out[entry + 4..entry + 4 + name_bytes.len()].copy_from_slice(name_bytes);
        let next = if i + 1 < files.len() {
            (i + 1) as u32
        } else {
            NO_ENTRY
        };
        out[entry + 20..entry + 24].copy_from_slice(&next.to_le_bytes());
        out[entry + 24..entry + 28].copy_from_slice(&cursor.to_le_bytes());
        out[entry + 28..entry + 36].copy_from_slice(&(data.len() as u64).to_le_bytes());

        let data_start = base + data_offset + cursor as usize;
        out[data_start..data_start + data.len()].copy_from_slice(data);
        cursor += data.len() as u32;
    }

    out
}

// ============================================================================
// Test Harness Helpers
// ============================================================================

/// Field surface that records everything pushed into it.
#[derive(Default)]
pub struct Recorder {
    pub headers: Vec<&'static str>,
    pub records: Vec<FieldRecord>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }
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

/// Cleanup guard for test temporary files.
pub struct CleanupGuard(pub PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Create a temporary file holding `data`, with a cleanup guard.
pub fn temp_file(name: &str, data: &[u8]) -> (PathBuf, CleanupGuard) {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let dir = std::env::temp_dir().join(format!(
        "ctrscope_test_{}_{}_{}",
        std::process::id(),
        name,
        random
    ));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    (path, CleanupGuard(dir))
}
