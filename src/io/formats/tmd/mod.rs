// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Title metadata (TMD) context.
//!
//! The library's one big-endian module: every numeric field renders most
//! significant byte first. TMDs arrive standalone (.tmd) or nested inside
//! a CIA archive.
//!
//! TMD supports rebuild, recomputing the SHA-256 digest chain.

pub mod parser;
pub mod writer;

pub use parser::{SignatureType, TmdChunk, TmdHeader, TmdInfoRecord, TmdModel};

use crate::core::{
    ActivationKey, Endianness, ExplorerError, FieldSurface, FieldTable, FormatKind, Node, Result,
    Selector,
};
use crate::io::container::Container;
use crate::io::traits::{check_key, Activation, FormatContext};

static SECTIONS: [&str; 3] = ["Signature", "TMD header", "Content records"];

/// Context for title metadata records.
#[derive(Debug, Default)]
pub struct TmdContext {
    container: Option<Container>,
    model: Option<TmdModel>,
    explorer: Option<Node>,
}

impl TmdContext {
    /// Create an unopened context.
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<&TmdModel> {
        self.model.as_ref().ok_or_else(|| {
            ExplorerError::unsupported_operation("access before open", FormatKind::TitleMeta)
        })
    }
}

fn build_explorer(model: &TmdModel) -> Node {
    let mut root = Node::new(format!("Title metadata ({:016X})", model.header.title_id))
        .with_key(ActivationKey::new(
            FormatKind::TitleMeta,
            Selector::TmdHeader,
            "TMD header",
        ));

    root.push_child(
        Node::new(format!("Signature ({})", model.sig_type.label())).with_key(
            ActivationKey::new(FormatKind::TitleMeta, Selector::TmdSignature, "Signature"),
        ),
    );

    let mut contents = Node::new(format!("Content records ({})", model.chunks.len()));
    for (i, chunk) in model.chunks.iter().enumerate() {
        contents.push_child(
            Node::new(format!(
                "Content {:04X} (id {:08X})",
                chunk.content_index, chunk.content_id
            ))
            .with_key(
                ActivationKey::new(FormatKind::TitleMeta, Selector::TmdChunk, "Chunk record")
                    .with_params(vec![i as u64]),
            ),
        );
    }
    root.push_child(contents);

    root
}

fn emit_signature(table: &mut FieldTable, model: &TmdModel) {
    table.num(0x00, 4, "Signature type", model.sig_type.word() as u64, 0);
    table.bytes(0x04, "Signature", &model.signature, 0);
    table.bytes(
        4 + model.signature.len() as u64,
        "Signature padding",
        &model.sig_padding,
        0,
    );
}

fn emit_header(table: &mut FieldTable, model: &TmdModel) {
    let h = &model.header;
    let base = model.header_offset();
    table.text(base, "Issuer", &h.issuer, 1);
    table.num(base + 0x40, 1, "Version", h.version as u64, 1);
    table.num(base + 0x41, 1, "CA CRL version", h.ca_crl_version as u64, 1);
    table.num(
        base + 0x42,
        1,
        "Signer CRL version",
        h.signer_crl_version as u64,
        1,
    );
    table.num(base + 0x44, 8, "System version", h.system_version, 1);
    table.num(base + 0x4C, 8, "Title ID", h.title_id, 1);
    table.num(base + 0x54, 4, "Title type", h.title_type as u64, 1);
    table.num(base + 0x58, 2, "Group ID", h.group_id as u64, 1);
    table.num(base + 0x5A, 4, "Save data size", h.save_size as u64, 1);
    table.num(base + 0x5E, 4, "SRL save data size", h.srl_save_size as u64, 1);
    table.num(base + 0x66, 1, "SRL flag", h.srl_flag as u64, 1);
    table.num(base + 0x98, 4, "Access rights", h.access_rights as u64, 1);
    table.num(base + 0x9C, 2, "Title version", h.title_version as u64, 1);
    table.num(base + 0x9E, 2, "Content count", h.content_count as u64, 1);
    table.num(base + 0xA0, 2, "Boot content", h.boot_content as u64, 1);
    table.bytes(base + 0xA4, "Info records SHA-256", &h.info_hash, 1);
}

fn emit_chunk(table: &mut FieldTable, model: &TmdModel, index: usize) {
    let chunk = &model.chunks[index];
    let base = model.chunks_offset() + (index * parser::CHUNK_RECORD_LEN) as u64;
    table.num(base, 4, "Content ID", chunk.content_id as u64, 2);
    table.num(base + 4, 2, "Content index", chunk.content_index as u64, 2);
    table.num(base + 6, 2, "Content type", chunk.content_type as u64, 2);
    table.num(base + 8, 8, "Content size", chunk.size, 2);
    table.bytes(base + 0x10, "Content SHA-256", &chunk.hash, 2);
}

impl FormatContext for TmdContext {
    fn format(&self) -> FormatKind {
        FormatKind::TitleMeta
    }

    fn open(&mut self, container: Container) -> Result<()> {
        let model = parser::parse(&container)?;
        let explorer = build_explorer(&model);
        self.container = Some(container);
        self.model = Some(model);
        self.explorer = Some(explorer);
        Ok(())
    }

    fn explorer_tree(&self) -> Option<&Node> {
        self.explorer.as_ref()
    }

    fn filesystem_tree(&self) -> Option<&Node> {
        None
    }

    fn section_headers(&self) -> &'static [&'static str] {
        &SECTIONS
    }

    fn can_create(&self) -> bool {
        true
    }

    fn create(&self, sink: &mut dyn std::io::Write) -> Result<u64> {
        let model = self.ready()?;
        writer::write(model, sink)
    }

    fn view(&self, surface: &mut dyn FieldSurface, key: &ActivationKey) -> Result<()> {
        check_key(self.format(), key)?;
        let model = self.ready()?;

        let mut table = FieldTable::new(Endianness::Big);
        match key.selector {
            Selector::None => {}
            Selector::TmdSignature => emit_signature(&mut table, model),
            Selector::TmdHeader => emit_header(&mut table, model),
            Selector::TmdChunk => {
                let index = key.param(0) as usize;
                if index >= model.chunks.len() {
                    return Err(ExplorerError::unsupported_operation(
                        format!("chunk {index}"),
                        self.format(),
                    ));
                }
                emit_chunk(&mut table, model, index);
            }
            other => {
                return Err(ExplorerError::unsupported_operation(
                    format!("view {other:?}"),
                    self.format(),
                ))
            }
        }
        table.emit(surface, self.section_headers());
        Ok(())
    }

    fn activate(&self, key: &ActivationKey) -> Result<Activation> {
        check_key(self.format(), key)?;
        self.ready()?;

        match key.selector {
            Selector::None => Ok(Activation::None),
            other => Err(ExplorerError::unsupported_operation(
                format!("activate {other:?}"),
                self.format(),
            )),
        }
    }

    fn save_filter(&self) -> &'static str {
        "Title Metadata (*.tmd)|*.tmd|All Files|*.*"
    }
}
