// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Title metadata (TMD) parsing and digest validation.
//!
//! TMD is the one big-endian format in this library: every integer,
//! including the leading signature type word, is stored most significant
//! byte first.
//!
//! # TMD Layout (big-endian)
//!
//! ```text
//! [0x00]     Signature type (u32): 0x10003 RSA-4096 (sig 0x200, pad 0x3C)
//!                                  0x10004 RSA-2048 (sig 0x100, pad 0x3C)
//!                                  0x10005 ECDSA    (sig 0x3C,  pad 0x40)
//! [0x04]     Signature + padding
//! [hdr+0x00] Issuer                   (char[0x40])
//! [hdr+0x40] Version                  (u8)
//! [hdr+0x41] CA CRL version           (u8)
//! [hdr+0x42] Signer CRL version       (u8)
//! [hdr+0x43] Reserved                 (u8)
//! [hdr+0x44] System version           (u64)
//! [hdr+0x4C] Title ID                 (u64)
//! [hdr+0x54] Title type               (u32)
//! [hdr+0x58] Group ID                 (u16)
//! [hdr+0x5A] Save data size           (u32)
//! [hdr+0x5E] SRL save data size       (u32)
//! [hdr+0x62] Reserved                 (4 bytes)
//! [hdr+0x66] SRL flag                 (u8)
//! [hdr+0x67] Reserved                 (0x31 bytes)
//! [hdr+0x98] Access rights            (u32)
//! [hdr+0x9C] Title version            (u16)
//! [hdr+0x9E] Content count            (u16)
//! [hdr+0xA0] Boot content             (u16)
//! [hdr+0xA2] Padding                  (2 bytes)
//! [hdr+0xA4] Info records SHA-256     (0x20 bytes)
//! [hdr+0xC4] 64 x content info record  { index offset u16, command count u16,
//!                                        chunk records SHA-256 (0x20) }
//! then       content count x chunk record { content id u32, index u16,
//!                                           type u16, size u64, SHA-256 (0x20) }
//! ```
//!
//! The header digest covers the 64 info records; each used info record's
//! digest covers its span of chunk records. Both are validated on open
//! and recomputed on rebuild.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use sha2::{Digest, Sha256};

use crate::core::{ExplorerError, Result};
use crate::io::container::Container;
use crate::render;

/// Number of content info records.
pub const INFO_RECORDS: usize = 64;

/// Size of one content info record.
pub const INFO_RECORD_LEN: usize = 0x24;

/// Size of one content chunk record.
pub const CHUNK_RECORD_LEN: usize = 0x30;

/// Size of the fixed header body (issuer through info-records digest).
pub const HEADER_BODY_LEN: usize = 0xC4;

/// Total size of the info-record region.
pub const INFO_REGION_LEN: usize = INFO_RECORDS * INFO_RECORD_LEN;

/// TMD signature types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    /// RSA-4096 with SHA-256
    Rsa4096Sha256,
    /// RSA-2048 with SHA-256
    Rsa2048Sha256,
    /// ECDSA with SHA-256
    EcdsaSha256,
}

impl SignatureType {
    /// Map the leading word to a signature type.
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0x0001_0003 => Some(SignatureType::Rsa4096Sha256),
            0x0001_0004 => Some(SignatureType::Rsa2048Sha256),
            0x0001_0005 => Some(SignatureType::EcdsaSha256),
            _ => None,
        }
    }

    /// The on-disk signature type word.
    pub fn word(&self) -> u32 {
        match self {
            SignatureType::Rsa4096Sha256 => 0x0001_0003,
            SignatureType::Rsa2048Sha256 => 0x0001_0004,
            SignatureType::EcdsaSha256 => 0x0001_0005,
        }
    }

    /// Signature length in bytes.
    pub fn signature_len(&self) -> usize {
        match self {
            SignatureType::Rsa4096Sha256 => 0x200,
            SignatureType::Rsa2048Sha256 => 0x100,
            SignatureType::EcdsaSha256 => 0x3C,
        }
    }

    /// Padding after the signature.
    pub fn padding_len(&self) -> usize {
        match self {
            SignatureType::EcdsaSha256 => 0x40,
            _ => 0x3C,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            SignatureType::Rsa4096Sha256 => "RSA-4096 SHA-256",
            SignatureType::Rsa2048Sha256 => "RSA-2048 SHA-256",
            SignatureType::EcdsaSha256 => "ECDSA SHA-256",
        }
    }
}

/// Parsed TMD header body.
#[derive(Debug, Clone)]
pub struct TmdHeader {
    /// Signature issuer
    pub issuer: [u8; 0x40],
    /// TMD version
    pub version: u8,
    /// CA CRL version
    pub ca_crl_version: u8,
    /// Signer CRL version
    pub signer_crl_version: u8,
    /// Reserved byte
    pub reserved0: u8,
    /// Minimum system version
    pub system_version: u64,
    /// Title ID
    pub title_id: u64,
    /// Title type
    pub title_type: u32,
    /// Group ID
    pub group_id: u16,
    /// Save data size
    pub save_size: u32,
    /// SRL save data size
    pub srl_save_size: u32,
    /// Reserved
    pub reserved1: [u8; 4],
    /// SRL flag
    pub srl_flag: u8,
    /// Reserved
    pub reserved2: [u8; 0x31],
    /// Access rights
    pub access_rights: u32,
    /// Title version
    pub title_version: u16,
    /// Content count
    pub content_count: u16,
    /// Boot content index
    pub boot_content: u16,
    /// Alignment padding
    pub padding: [u8; 2],
    /// SHA-256 over the 64 info records
    pub info_hash: [u8; 0x20],
}

impl TmdHeader {
    /// Issuer decoded as text.
    pub fn issuer_string(&self) -> String {
        render::ascii_text(&self.issuer)
    }
}

/// One content info record.
#[derive(Debug, Clone, Copy)]
pub struct TmdInfoRecord {
    /// First chunk record this record covers
    pub index_offset: u16,
    /// Number of chunk records covered
    pub command_count: u16,
    /// SHA-256 over the covered chunk records
    pub hash: [u8; 0x20],
}

impl TmdInfoRecord {
    /// Whether this record covers any chunks.
    pub fn is_used(&self) -> bool {
        self.command_count != 0
    }
}

/// One content chunk record.
#[derive(Debug, Clone, Copy)]
pub struct TmdChunk {
    /// Content ID
    pub content_id: u32,
    /// Content index
    pub content_index: u16,
    /// Content type flags
    pub content_type: u16,
    /// Content size in bytes
    pub size: u64,
    /// SHA-256 of the content (opaque; the content is not in the TMD)
    pub hash: [u8; 0x20],
}

/// Fully parsed TMD model.
#[derive(Debug, Clone)]
pub struct TmdModel {
    /// Signature type
    pub sig_type: SignatureType,
    /// Signature bytes (opaque)
    pub signature: Vec<u8>,
    /// Padding after the signature
    pub sig_padding: Vec<u8>,
    /// Header body
    pub header: TmdHeader,
    /// All 64 info records
    pub info_records: Vec<TmdInfoRecord>,
    /// Content chunk records
    pub chunks: Vec<TmdChunk>,
}

impl TmdModel {
    /// Byte offset of the header body.
    pub fn header_offset(&self) -> u64 {
        4 + self.sig_type.signature_len() as u64 + self.sig_type.padding_len() as u64
    }

    /// Byte offset of the info-record region.
    pub fn info_offset(&self) -> u64 {
        self.header_offset() + HEADER_BODY_LEN as u64
    }

    /// Byte offset of the chunk-record region.
    pub fn chunks_offset(&self) -> u64 {
        self.info_offset() + INFO_REGION_LEN as u64
    }
}

/// Parse and validate a TMD.
pub fn parse(container: &Container) -> Result<TmdModel> {
    let bytes = container.bytes();
    if bytes.len() < 4 {
        return Err(ExplorerError::malformed(
            "TmdHeader",
            format!("container is {} bytes, TMD needs a signature word", bytes.len()),
        ));
    }

    let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let sig_type = SignatureType::from_word(word).ok_or_else(|| {
        ExplorerError::malformed("TmdHeader", format!("unknown signature type 0x{word:08X}"))
    })?;

    let header_off = 4 + sig_type.signature_len() + sig_type.padding_len();
    let info_off = header_off + HEADER_BODY_LEN;
    let chunks_off = info_off + INFO_REGION_LEN;
    if bytes.len() < chunks_off {
        return Err(ExplorerError::malformed(
            "TmdHeader",
            format!(
                "container is {} bytes, {} signature needs {chunks_off} before chunk records",
                bytes.len(),
                sig_type.label()
            ),
        ));
    }

    let signature = bytes[4..4 + sig_type.signature_len()].to_vec();
    let sig_padding =
        bytes[4 + sig_type.signature_len()..header_off].to_vec();

    let header = read_header(&bytes[header_off..info_off])?;

    let expected = chunks_off + header.content_count as usize * CHUNK_RECORD_LEN;
    if expected != bytes.len() {
        return Err(ExplorerError::malformed(
            "TmdHeader",
            format!(
                "{} content records need {expected} bytes, container is {}",
                header.content_count,
                bytes.len()
            ),
        ));
    }

    let info_region = &bytes[info_off..chunks_off];
    verify_digest(info_region, &header.info_hash, "TMD content info records")?;

    let info_records = read_info_records(info_region)?;
    let chunk_region = &bytes[chunks_off..];
    let chunks = read_chunks(chunk_region, header.content_count as usize)?;

    for record in info_records.iter().filter(|r| r.is_used()) {
        let start = record.index_offset as usize;
        let end = start + record.command_count as usize;
        if end > chunks.len() {
            return Err(ExplorerError::malformed(
                "TmdInfoRecord",
                format!(
                    "info record covers chunks {start}..{end}, only {} exist",
                    chunks.len()
                ),
            ));
        }
        let span = &chunk_region[start * CHUNK_RECORD_LEN..end * CHUNK_RECORD_LEN];
        verify_digest(
            span,
            &record.hash,
            &format!("TMD content chunk records {start}..{end}"),
        )?;
    }

    tracing::debug!(
        "TMD parsed: title {:016X}, {} content records",
        header.title_id,
        chunks.len()
    );

    Ok(TmdModel {
        sig_type,
        signature,
        sig_padding,
        header,
        info_records,
        chunks,
    })
}

fn verify_digest(region: &[u8], stored: &[u8; 0x20], what: &str) -> Result<()> {
    let computed: [u8; 0x20] = Sha256::digest(region).into();
    if &computed != stored {
        return Err(ExplorerError::checksum_mismatch(
            what,
            hex::encode_upper(stored),
            hex::encode_upper(computed),
        ));
    }
    Ok(())
}

fn read_header(body: &[u8]) -> Result<TmdHeader> {
    let mut cursor = Cursor::new(body);

    let mut issuer = [0u8; 0x40];
    cursor.read_exact(&mut issuer)?;
    let version = cursor.read_u8()?;
    let ca_crl_version = cursor.read_u8()?;
    let signer_crl_version = cursor.read_u8()?;
    let reserved0 = cursor.read_u8()?;
    let system_version = cursor.read_u64::<BigEndian>()?;
    let title_id = cursor.read_u64::<BigEndian>()?;
    let title_type = cursor.read_u32::<BigEndian>()?;
    let group_id = cursor.read_u16::<BigEndian>()?;
    let save_size = cursor.read_u32::<BigEndian>()?;
    let srl_save_size = cursor.read_u32::<BigEndian>()?;
    let mut reserved1 = [0u8; 4];
    cursor.read_exact(&mut reserved1)?;
    let srl_flag = cursor.read_u8()?;
    let mut reserved2 = [0u8; 0x31];
    cursor.read_exact(&mut reserved2)?;
    let access_rights = cursor.read_u32::<BigEndian>()?;
    let title_version = cursor.read_u16::<BigEndian>()?;
    let content_count = cursor.read_u16::<BigEndian>()?;
    let boot_content = cursor.read_u16::<BigEndian>()?;
    let mut padding = [0u8; 2];
    cursor.read_exact(&mut padding)?;
    let mut info_hash = [0u8; 0x20];
    cursor.read_exact(&mut info_hash)?;

    Ok(TmdHeader {
        issuer,
        version,
        ca_crl_version,
        signer_crl_version,
        reserved0,
        system_version,
        title_id,
        title_type,
        group_id,
        save_size,
        srl_save_size,
        reserved1,
        srl_flag,
        reserved2,
        access_rights,
        title_version,
        content_count,
        boot_content,
        padding,
        info_hash,
    })
}

fn read_info_records(region: &[u8]) -> Result<Vec<TmdInfoRecord>> {
    let mut cursor = Cursor::new(region);
    let mut records = Vec::with_capacity(INFO_RECORDS);
    for _ in 0..INFO_RECORDS {
        let index_offset = cursor.read_u16::<BigEndian>()?;
        let command_count = cursor.read_u16::<BigEndian>()?;
        let mut hash = [0u8; 0x20];
        cursor.read_exact(&mut hash)?;
        records.push(TmdInfoRecord {
            index_offset,
            command_count,
            hash,
        });
    }
    Ok(records)
}

fn read_chunks(region: &[u8], count: usize) -> Result<Vec<TmdChunk>> {
    let mut cursor = Cursor::new(region);
    let mut chunks = Vec::with_capacity(count);
    for _ in 0..count {
        let content_id = cursor.read_u32::<BigEndian>()?;
        let content_index = cursor.read_u16::<BigEndian>()?;
        let content_type = cursor.read_u16::<BigEndian>()?;
        let size = cursor.read_u64::<BigEndian>()?;
        let mut hash = [0u8; 0x20];
        cursor.read_exact(&mut hash)?;
        chunks.push(TmdChunk {
            content_id,
            content_index,
            content_type,
            size,
            hash,
        });
    }
    Ok(chunks)
}

/// Test helper: assemble a valid TMD with a correct digest chain.
#[cfg(test)]
pub(crate) fn build_tmd(chunks: &[(u32, u16, u16, u64)]) -> Vec<u8> {
    let sig_type = SignatureType::Rsa2048Sha256;

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
    out.extend_from_slice(&sig_type.word().to_be_bytes());
    out.extend_from_slice(&vec![0u8; sig_type.signature_len()]);
    out.extend_from_slice(&vec![0u8; sig_type.padding_len()]);
    out.extend_from_slice(&header);
    out.extend_from_slice(&info_buf);
    out.extend_from_slice(&chunk_buf);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tmd() {
        let bytes = build_tmd(&[(0x100, 0, 1, 0x4000), (0x101, 1, 1, 0x200)]);
        let model = parse(&Container::from_bytes(bytes, "test")).unwrap();
        assert_eq!(model.sig_type, SignatureType::Rsa2048Sha256);
        assert_eq!(model.header.content_count, 2);
        assert_eq!(model.chunks.len(), 2);
        assert_eq!(model.chunks[0].content_id, 0x100);
        assert_eq!(model.chunks[1].size, 0x200);
        assert_eq!(model.header_offset(), 4 + 0x100 + 0x3C);
        assert!(model.header.issuer_string().starts_with("Root-CA"));
    }

    #[test]
    fn test_parse_zero_contents() {
        let bytes = build_tmd(&[]);
        let model = parse(&Container::from_bytes(bytes, "test")).unwrap();
        assert!(model.chunks.is_empty());
        assert!(model.info_records.iter().all(|r| !r.is_used()));
    }

    #[test]
    fn test_reject_unknown_signature_type() {
        let mut bytes = build_tmd(&[]);
        bytes[..4].copy_from_slice(&0x00010001u32.to_be_bytes());
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("signature type"));
    }

    #[test]
    fn test_reject_truncated() {
        let bytes = build_tmd(&[(0x100, 0, 1, 0x4000)]);
        let short = bytes[..bytes.len() - 8].to_vec();
        let err = parse(&Container::from_bytes(short, "test")).unwrap_err();
        assert!(matches!(err, ExplorerError::Malformed { .. }));
    }

    #[test]
    fn test_reject_corrupt_info_hash() {
        let mut bytes = build_tmd(&[(0x100, 0, 1, 0x4000)]);
        let len = bytes.len();
        // Flip a bit in the chunk record region: the per-record digest
        // breaks first.
        bytes[len - 1] ^= 1;
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(matches!(err, ExplorerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_reject_corrupt_header_digest() {
        let mut bytes = build_tmd(&[(0x100, 0, 1, 0x4000)]);
        // Flip a bit in the stored info-records digest itself.
        let hash_off = 4 + 0x100 + 0x3C + 0xA4;
        bytes[hash_off] ^= 1;
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(matches!(err, ExplorerError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_reject_info_record_out_of_range() {
        let mut bytes = build_tmd(&[(0x100, 0, 1, 0x4000)]);
        let info_off = 4 + 0x100 + 0x3C + HEADER_BODY_LEN;
        // Claim the record covers two chunks; only one exists. The info
        // region digest must be refreshed so validation reaches the span
        // check.
        bytes[info_off + 2..info_off + 4].copy_from_slice(&2u16.to_be_bytes());
        let digest: [u8; 0x20] =
            Sha256::digest(&bytes[info_off..info_off + INFO_REGION_LEN]).into();
        let hash_off = 4 + 0x100 + 0x3C + 0xA4;
        bytes[hash_off..hash_off + 0x20].copy_from_slice(&digest);
        let err = parse(&Container::from_bytes(bytes, "test")).unwrap_err();
        assert!(err.to_string().contains("covers chunks"));
    }

    #[test]
    fn test_signature_type_table() {
        assert_eq!(
            SignatureType::from_word(0x10003),
            Some(SignatureType::Rsa4096Sha256)
        );
        assert_eq!(SignatureType::from_word(0xDEAD), None);
        assert_eq!(SignatureType::Rsa4096Sha256.signature_len(), 0x200);
        assert_eq!(SignatureType::EcdsaSha256.padding_len(), 0x40);
        assert_eq!(
            SignatureType::Rsa2048Sha256.word(),
            0x10004
        );
    }
}
