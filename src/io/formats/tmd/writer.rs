// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! TMD rebuild.
//!
//! Serializes the full record big-endian and recomputes the digest chain
//! bottom-up: chunk records first, then each used info record's digest
//! over its chunk span, then the header digest over the finalized info
//! region. A valid, unedited TMD rebuilds to its exact input bytes.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use sha2::{Digest, Sha256};

use crate::core::Result;

use super::parser::{TmdModel, CHUNK_RECORD_LEN};

/// Rebuild a complete TMD into `sink`, returning bytes written.
pub fn write(model: &TmdModel, sink: &mut dyn Write) -> Result<u64> {
    let mut chunk_buf: Vec<u8> = Vec::with_capacity(model.chunks.len() * CHUNK_RECORD_LEN);
    for chunk in &model.chunks {
        chunk_buf.write_u32::<BigEndian>(chunk.content_id)?;
        chunk_buf.write_u16::<BigEndian>(chunk.content_index)?;
        chunk_buf.write_u16::<BigEndian>(chunk.content_type)?;
        chunk_buf.write_u64::<BigEndian>(chunk.size)?;
        chunk_buf.extend_from_slice(&chunk.hash);
    }

    let mut info_buf: Vec<u8> = Vec::new();
    for record in &model.info_records {
        info_buf.write_u16::<BigEndian>(record.index_offset)?;
        info_buf.write_u16::<BigEndian>(record.command_count)?;
        if record.is_used() {
            let start = record.index_offset as usize * CHUNK_RECORD_LEN;
            let end = start + record.command_count as usize * CHUNK_RECORD_LEN;
            let digest: [u8; 0x20] = Sha256::digest(&chunk_buf[start..end]).into();
            info_buf.extend_from_slice(&digest);
        } else {
            info_buf.extend_from_slice(&record.hash);
        }
    }
    let info_hash: [u8; 0x20] = Sha256::digest(&info_buf).into();

    let h = &model.header;
    let mut out: Vec<u8> = Vec::new();
    out.write_u32::<BigEndian>(model.sig_type.word())?;
    out.extend_from_slice(&model.signature);
    out.extend_from_slice(&model.sig_padding);

    out.extend_from_slice(&h.issuer);
    out.write_u8(h.version)?;
    out.write_u8(h.ca_crl_version)?;
    out.write_u8(h.signer_crl_version)?;
    out.write_u8(h.reserved0)?;
    out.write_u64::<BigEndian>(h.system_version)?;
    out.write_u64::<BigEndian>(h.title_id)?;
    out.write_u32::<BigEndian>(h.title_type)?;
    out.write_u16::<BigEndian>(h.group_id)?;
    out.write_u32::<BigEndian>(h.save_size)?;
    out.write_u32::<BigEndian>(h.srl_save_size)?;
    out.extend_from_slice(&h.reserved1);
    out.write_u8(h.srl_flag)?;
    out.extend_from_slice(&h.reserved2);
    out.write_u32::<BigEndian>(h.access_rights)?;
    out.write_u16::<BigEndian>(h.title_version)?;
    out.write_u16::<BigEndian>(h.content_count)?;
    out.write_u16::<BigEndian>(h.boot_content)?;
    out.extend_from_slice(&h.padding);
    out.extend_from_slice(&info_hash);

    out.extend_from_slice(&info_buf);
    out.extend_from_slice(&chunk_buf);

    sink.write_all(&out)?;

    tracing::debug!(
        "TMD rebuilt: {} content records, {} bytes",
        model.chunks.len(),
        out.len()
    );

    Ok(out.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::super::parser::{self, build_tmd};
    use super::*;
    use crate::io::container::Container;

    #[test]
    fn test_round_trip() {
        let bytes = build_tmd(&[(0x100, 0, 1, 0x4000), (0x101, 1, 1, 0x200)]);
        let container = Container::from_bytes(bytes.clone(), "test");
        let model = parser::parse(&container).unwrap();

        let mut out = Vec::new();
        let written = write(&model, &mut out).unwrap();
        assert_eq!(written, bytes.len() as u64);
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_round_trip_zero_contents() {
        let bytes = build_tmd(&[]);
        let container = Container::from_bytes(bytes.clone(), "test");
        let model = parser::parse(&container).unwrap();

        let mut out = Vec::new();
        write(&model, &mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_edit_recomputes_digest_chain() {
        let bytes = build_tmd(&[(0x100, 0, 1, 0x4000)]);
        let container = Container::from_bytes(bytes, "test");
        let mut model = parser::parse(&container).unwrap();

        // Logical edit: bump a content size. The rebuilt TMD must still
        // validate, with both digests recomputed.
        model.chunks[0].size = 0x8000;
        let mut out = Vec::new();
        write(&model, &mut out).unwrap();

        let reparsed = parser::parse(&Container::from_bytes(out, "edited")).unwrap();
        assert_eq!(reparsed.chunks[0].size, 0x8000);
    }
}
