// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CTR importable archive (CIA) context.
//!
//! A CIA packages a title for installation: certificate chain, ticket,
//! title metadata, content and an optional meta section, all behind a
//! fixed-size header. The embedded TMD activates into a nested
//! [`TmdContext`](crate::io::formats::tmd::TmdContext) over resident
//! bytes; every section can also be extracted raw.
//!
//! CIA supports rebuild.

pub mod parser;
pub mod writer;

pub use parser::{CiaHeader, CiaModel, CiaSection, SectionKind};

use crate::core::{
    ActivationKey, Endianness, ExplorerError, FieldSurface, FieldTable, FormatKind, Node, Result,
    Selector,
};
use crate::io::container::Container;
use crate::io::formats::tmd::TmdContext;
use crate::io::traits::{check_key, Activation, FormatContext};

static SECTIONS: [&str; 2] = ["CIA header", "Archive sections"];

/// Context for CTR importable archives.
#[derive(Debug, Default)]
pub struct CiaContext {
    container: Option<Container>,
    model: Option<CiaModel>,
    explorer: Option<Node>,
}

impl CiaContext {
    /// Create an unopened context.
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<(&Container, &CiaModel)> {
        match (&self.container, &self.model) {
            (Some(c), Some(m)) => Ok((c, m)),
            _ => Err(ExplorerError::unsupported_operation(
                "access before open",
                FormatKind::Cia,
            )),
        }
    }

    fn section(&self, index: usize) -> Result<CiaSection> {
        let (_, model) = self.ready()?;
        model.sections.get(index).copied().ok_or_else(|| {
            ExplorerError::unsupported_operation(format!("section {index}"), FormatKind::Cia)
        })
    }
}

fn build_explorer(model: &CiaModel) -> Node {
    let mut root = Node::new("CIA archive").with_key(ActivationKey::new(
        FormatKind::Cia,
        Selector::CiaHeader,
        "CIA header",
    ));

    for (i, section) in model.sections.iter().enumerate() {
        let mut node = Node::new(format!("{} ({} bytes)", section.kind.label(), section.size))
            .with_key(
                ActivationKey::new(FormatKind::Cia, Selector::CiaSection, "Section span")
                    .with_params(vec![i as u64]),
            )
            .with_key(
                ActivationKey::new(
                    FormatKind::Cia,
                    Selector::CiaSectionExtract,
                    "Extract raw bytes",
                )
                .with_params(vec![i as u64]),
            );
        if section.kind == SectionKind::TitleMeta {
            node = node.with_key(ActivationKey::new(
                FormatKind::Cia,
                Selector::CiaTitleMetaOpen,
                "Open title metadata",
            ));
        }
        root.push_child(node);
    }

    root
}

fn emit_header(table: &mut FieldTable, h: &CiaHeader) {
    table.num(0x00, 4, "Header size", h.header_size as u64, 0);
    table.num(0x04, 2, "Type", h.archive_type as u64, 0);
    table.num(0x06, 2, "Version", h.version as u64, 0);
    table.num(0x08, 4, "Certificate chain size", h.cert_size as u64, 0);
    table.num(0x0C, 4, "Ticket size", h.ticket_size as u64, 0);
    table.num(0x10, 4, "TMD size", h.tmd_size as u64, 0);
    table.num(0x14, 4, "Meta size", h.meta_size as u64, 0);
    table.num(0x18, 8, "Content size", h.content_size, 0);
    table.bytes(0x20, "Content index", &h.content_index, 0);
}

fn emit_section(table: &mut FieldTable, section: &CiaSection) {
    table.num(
        section.kind.size_field_offset(),
        section.kind.size_field_len(),
        "Declared size",
        section.size,
        1,
    );
    table.num(section.offset, 8, "Section start offset", section.offset, 1);
}

impl FormatContext for CiaContext {
    fn format(&self) -> FormatKind {
        FormatKind::Cia
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
        let (container, model) = self.ready()?;
        writer::write(model, container, sink)
    }

    fn view(&self, surface: &mut dyn FieldSurface, key: &ActivationKey) -> Result<()> {
        check_key(self.format(), key)?;
        let (_, model) = self.ready()?;

        let mut table = FieldTable::new(Endianness::Little);
        match key.selector {
            Selector::None => {}
            Selector::CiaHeader => emit_header(&mut table, &model.header),
            Selector::CiaSection => {
                let section = self.section(key.param(0) as usize)?;
                emit_section(&mut table, &section);
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
        let (container, model) = self.ready()?;

        match key.selector {
            Selector::None => Ok(Activation::None),
            Selector::CiaSectionExtract => {
                let section = self.section(key.param(0) as usize)?;
                let data = container.slice(section.offset, section.size)?.to_vec();
                Ok(Activation::Extracted {
                    name: section.kind.file_name().to_string(),
                    data,
                })
            }
            Selector::CiaTitleMetaOpen => {
                let section = model.section(SectionKind::TitleMeta).ok_or_else(|| {
                    ExplorerError::unsupported_operation("TMD open without TMD", self.format())
                })?;
                let sub = container.sub_container(section.offset, section.size, "tmd")?;
                let mut ctx = TmdContext::new();
                ctx.open(sub)?;
                tracing::debug!("Opened embedded TMD as nested context");
                Ok(Activation::Nested(Box::new(ctx)))
            }
            other => Err(ExplorerError::unsupported_operation(
                format!("activate {other:?}"),
                self.format(),
            )),
        }
    }

    fn save_filter(&self) -> &'static str {
        "CTR Importable Archives (*.cia)|*.cia|All Files|*.*"
    }
}

#[cfg(test)]
mod tests {
    use super::parser::build_cia;
    use super::*;
    use crate::core::FieldRecord;

    struct Recorder {
        headers: Vec<&'static str>,
        records: Vec<FieldRecord>,
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

    fn opened() -> CiaContext {
        let bytes = build_cia(&[1; 4], &[2; 8], &[], &[4; 32], &[]);
        let mut ctx = CiaContext::new();
        ctx.open(Container::from_bytes(bytes, "test.cia")).unwrap();
        ctx
    }

    #[test]
    fn test_tree_lists_sections() {
        let ctx = opened();
        let tree = ctx.explorer_tree().unwrap();
        assert_eq!(tree.children.len(), 3);
        assert!(tree.children[0].label.starts_with("Certificate chain"));
        assert!(ctx.filesystem_tree().is_none());
    }

    #[test]
    fn test_can_create() {
        let ctx = opened();
        assert!(ctx.can_create());
    }

    #[test]
    fn test_create_round_trip() {
        let bytes = build_cia(&[1; 4], &[2; 8], &[], &[4; 32], &[5; 64]);
        let mut ctx = CiaContext::new();
        ctx.open(Container::from_bytes(bytes.clone(), "test.cia"))
            .unwrap();

        let mut out = Vec::new();
        let written = ctx.create(&mut out).unwrap();
        assert_eq!(written, bytes.len() as u64);
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_extract_section() {
        let ctx = opened();
        let key = ActivationKey::new(
            FormatKind::Cia,
            Selector::CiaSectionExtract,
            "Extract raw bytes",
        )
        .with_params(vec![1]);
        match ctx.activate(&key).unwrap() {
            Activation::Extracted { name, data } => {
                assert_eq!(name, "ticket.bin");
                assert_eq!(data, vec![2; 8]);
            }
            other => panic!("unexpected activation: {other:?}"),
        }
    }

    #[test]
    fn test_tmd_open_without_tmd_section() {
        let ctx = opened();
        let key = ActivationKey::new(FormatKind::Cia, Selector::CiaTitleMetaOpen, "Open TMD");
        let err = ctx.activate(&key).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_view_section_groups() {
        let ctx = opened();
        let mut surface = Recorder {
            headers: Vec::new(),
            records: Vec::new(),
        };
        let key = ActivationKey::new(FormatKind::Cia, Selector::CiaSection, "Section span")
            .with_params(vec![0]);
        ctx.view(&mut surface, &key).unwrap();
        assert_eq!(surface.records.len(), 2);
        for record in &surface.records {
            assert!(record.group < ctx.section_headers().len());
        }
    }
}
